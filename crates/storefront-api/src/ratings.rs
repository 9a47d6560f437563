use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use storefront_core::ratings;
use storefront_types::api::{RateRequest, RateResponse, UserRatingResponse};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::run_blocking;

/// Responds with the product's new aggregate so the client can redraw its stars.
pub async fn rate_product(
    State(state): State<AppState>,
    WithRejection(Path(product_id), _): WithRejection<Path<i64>, ApiError>,
    CurrentUser(user): CurrentUser,
    WithRejection(Json(req), _): WithRejection<Json<RateRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let rating = run_blocking(&state, move |db| {
        ratings::rate(db, product_id, user.id, req.rating)
    })
    .await?;
    Ok(Json(RateResponse { rating }))
}

pub async fn user_rating(
    State(state): State<AppState>,
    WithRejection(Path(product_id), _): WithRejection<Path<i64>, ApiError>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let rating = run_blocking(&state, move |db| ratings::user_rating(db, product_id, user.id)).await?;
    Ok(Json(UserRatingResponse { rating }))
}
