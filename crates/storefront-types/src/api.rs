use serde::{Deserialize, Serialize};

use crate::models::{AggregateRating, PublicUser};

// -- Auth --

/// Missing fields deserialize as empty strings so the handler can answer
/// with a 400 and a readable message instead of a body rejection.
#[derive(Debug, Default, Deserialize)]
pub struct SignUpRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SignInRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub user: PublicUser,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CurrentUserResponse {
    pub user: Option<PublicUser>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

// -- Products --

/// Raw listing query string. Numbers stay strings here so malformed input
/// can be reported as a validation error rather than a generic rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListQuery {
    pub query: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub min_rating: Option<String>,
}

// -- Comments --

#[derive(Debug, Default, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub content: String,
}

// -- Ratings --

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub rating: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RateResponse {
    pub rating: AggregateRating,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserRatingResponse {
    pub rating: Option<u8>,
}
