use axum::{
    Router,
    routing::{get, post, put},
};

use crate::auth::{self, AppState};
use crate::{catalog, comments, ratings, users};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        // Auth
        .route("/api/auth/signup", post(auth::sign_up))
        .route("/api/auth/signin", post(auth::sign_in))
        .route("/api/auth/signout", post(auth::sign_out))
        .route("/api/auth/me", get(auth::me))
        // Catalog
        .route(
            "/api/products",
            get(catalog::list_products).post(catalog::create_product),
        )
        .route(
            "/api/products/{id}",
            get(catalog::get_product)
                .put(catalog::update_product)
                .delete(catalog::delete_product),
        )
        .route("/api/categories", get(catalog::list_categories))
        // Comments
        .route(
            "/api/products/{id}/comments",
            get(comments::list_comments).post(comments::add_comment),
        )
        .route(
            "/api/comments/{id}",
            put(comments::edit_comment).delete(comments::delete_comment),
        )
        // Ratings
        .route("/api/products/{id}/rate", post(ratings::rate_product))
        .route("/api/products/{id}/user-rating", get(ratings::user_rating))
        // Users
        .route("/api/users/{id}", get(users::get_user))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
