use storefront_db::{Database, is_unique_violation};
use storefront_types::models::AggregateRating;
use tracing::info;

use crate::error::{ServiceError, ServiceResult};

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

/// Mean and count of a product's ratings, recomputed from the store on
/// every call. Unknown products simply have no ratings.
pub fn aggregate(db: &Database, product_id: i64) -> ServiceResult<AggregateRating> {
    let (rate, count) = db.rating_aggregate(product_id)?;
    Ok(AggregateRating { rate, count })
}

/// Records `user_id`'s single rating for a product and returns the new aggregate.
pub fn rate(db: &Database, product_id: i64, user_id: i64, rating: i64) -> ServiceResult<AggregateRating> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(ServiceError::validation(format!(
            "rating must be between {MIN_RATING} and {MAX_RATING}"
        )));
    }
    if !db.product_exists(product_id)? {
        return Err(ServiceError::NotFound("product"));
    }

    // The UNIQUE(product_id, user_id) constraint decides; no read-then-insert race.
    match db.insert_rating(product_id, user_id, rating as u8) {
        Ok(()) => {}
        Err(e) if is_unique_violation(&e) => return Err(ServiceError::AlreadyRated),
        Err(e) => return Err(e.into()),
    }

    info!("User {} rated product {} with {}", user_id, product_id, rating);
    aggregate(db, product_id)
}

pub fn user_rating(db: &Database, product_id: i64, user_id: i64) -> ServiceResult<Option<u8>> {
    Ok(db.get_user_rating(product_id, user_id)?)
}
