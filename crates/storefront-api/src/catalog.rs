use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use storefront_core::catalog;
use storefront_types::Price;
use storefront_types::api::{ProductListQuery, SuccessResponse};
use storefront_types::models::{NewProduct, ProductFilter, ProductUpdate};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::AdminUser;
use crate::run_blocking;

/// Blank parameters count as absent; anything else must parse.
fn parse_filter(query: ProductListQuery) -> Result<ProductFilter, ApiError> {
    fn present(value: Option<String>) -> Option<String> {
        value.filter(|v| !v.trim().is_empty())
    }

    fn price(name: &str, value: Option<String>) -> Result<Option<Price>, ApiError> {
        present(value)
            .map(|v| v.parse::<Price>())
            .transpose()
            .map_err(|e| ApiError::bad_request(format!("{name}: {e}")))
    }

    let min_rating = present(query.min_rating)
        .map(|v| {
            v.trim()
                .parse::<f64>()
                .ok()
                .filter(|r| (0.0..=5.0).contains(r))
                .ok_or_else(|| ApiError::bad_request("minRating must be a number between 0 and 5"))
        })
        .transpose()?;

    Ok(ProductFilter {
        text: present(query.query),
        category: present(query.category),
        min_price: price("minPrice", query.min_price)?,
        max_price: price("maxPrice", query.max_price)?,
        min_rating,
    })
}

pub async fn list_products(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<ProductListQuery>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = parse_filter(query)?;
    let products = run_blocking(&state, move |db| catalog::list_products(db, &filter)).await?;
    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let product = run_blocking(&state, move |db| catalog::get_product(db, id)).await?;
    Ok(Json(product))
}

pub async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let categories = run_blocking(&state, catalog::list_categories).await?;
    Ok(Json(categories))
}

pub async fn create_product(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    WithRejection(Json(req), _): WithRejection<Json<NewProduct>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let product = run_blocking(&state, move |db| catalog::create_product(db, req)).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
    AdminUser(_admin): AdminUser,
    WithRejection(Json(req), _): WithRejection<Json<ProductUpdate>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let product = run_blocking(&state, move |db| catalog::update_product(db, id, req)).await?;
    Ok(Json(product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
    AdminUser(_admin): AdminUser,
) -> Result<impl IntoResponse, ApiError> {
    if !run_blocking(&state, move |db| catalog::delete_product(db, id)).await? {
        return Err(ApiError::not_found("product not found"));
    }
    Ok(Json(SuccessResponse::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> ProductListQuery {
        let mut q = ProductListQuery::default();
        for (key, value) in pairs {
            let value = Some(value.to_string());
            match *key {
                "query" => q.query = value,
                "category" => q.category = value,
                "minPrice" => q.min_price = value,
                "maxPrice" => q.max_price = value,
                "minRating" => q.min_rating = value,
                other => panic!("unexpected key {other}"),
            }
        }
        q
    }

    #[test]
    fn blank_parameters_are_ignored() {
        let filter = parse_filter(query(&[("query", ""), ("category", "  "), ("minPrice", "")])).unwrap();
        assert_eq!(filter, ProductFilter::default());
    }

    #[test]
    fn parses_every_filter() {
        let filter = parse_filter(query(&[
            ("query", "lamp"),
            ("category", "home"),
            ("minPrice", "10"),
            ("maxPrice", "20.50"),
            ("minRating", "3.5"),
        ]))
        .unwrap();
        assert_eq!(filter.text.as_deref(), Some("lamp"));
        assert_eq!(filter.category.as_deref(), Some("home"));
        assert_eq!(filter.min_price, Price::from_cents(1000));
        assert_eq!(filter.max_price, Price::from_cents(2050));
        assert_eq!(filter.min_rating, Some(3.5));
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        assert!(parse_filter(query(&[("minPrice", "ten")])).is_err());
        assert!(parse_filter(query(&[("maxPrice", "-1")])).is_err());
        assert!(parse_filter(query(&[("minRating", "6")])).is_err());
        assert!(parse_filter(query(&[("minRating", "NaN")])).is_err());
        assert!(parse_filter(query(&[("minRating", "high")])).is_err());
    }
}
