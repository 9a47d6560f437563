use storefront_db::Database;
use storefront_db::models::ProductRow;
use storefront_types::models::{NewProduct, Product, ProductFilter, ProductUpdate};
use tracing::info;

use crate::error::{ServiceError, ServiceResult};
use crate::ratings;

/// Products matching `filter`, each carrying its freshly aggregated rating.
///
/// Text, category and price bounds narrow the listing query itself.
/// `min_rating` is checked afterwards against the aggregate computed here,
/// since no rating column exists to push it into the query.
pub fn list_products(db: &Database, filter: &ProductFilter) -> ServiceResult<Vec<Product>> {
    let rows = db.list_products(filter)?;

    let mut products = rows
        .into_iter()
        .map(|row| with_rating(db, row))
        .collect::<ServiceResult<Vec<_>>>()?;

    if let Some(min_rating) = filter.min_rating {
        products.retain(|p| p.rating.rate >= min_rating);
    }

    Ok(products)
}

pub fn get_product(db: &Database, id: i64) -> ServiceResult<Product> {
    let row = db.get_product(id)?.ok_or(ServiceError::NotFound("product"))?;
    with_rating(db, row)
}

pub fn list_categories(db: &Database) -> ServiceResult<Vec<String>> {
    Ok(db.list_categories()?)
}

pub fn create_product(db: &Database, product: NewProduct) -> ServiceResult<Product> {
    let product = NewProduct {
        name: required("name", &product.name)?,
        category: required("category", &product.category)?,
        ..product
    };

    let id = db.insert_product(&product)?;
    info!("Created product {} ({})", id, product.name);
    get_product(db, id)
}

pub fn update_product(db: &Database, id: i64, update: ProductUpdate) -> ServiceResult<Product> {
    let update = ProductUpdate {
        name: update.name.as_deref().map(|n| required("name", n)).transpose()?,
        category: update.category.as_deref().map(|c| required("category", c)).transpose()?,
        ..update
    };

    if !db.update_product(id, &update)? {
        return Err(ServiceError::NotFound("product"));
    }
    info!("Updated product {}", id);
    get_product(db, id)
}

/// Returns false when there was no such product.
pub fn delete_product(db: &Database, id: i64) -> ServiceResult<bool> {
    let deleted = db.delete_product(id)?;
    if deleted {
        info!("Deleted product {}", id);
    }
    Ok(deleted)
}

fn with_rating(db: &Database, row: ProductRow) -> ServiceResult<Product> {
    let rating = ratings::aggregate(db, row.id)?;
    Ok(row.into_product(rating))
}

fn required(field: &str, value: &str) -> ServiceResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ServiceError::validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}
