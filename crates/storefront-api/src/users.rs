use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use storefront_core::auth;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::run_blocking;

/// Public profile; never includes the password hash.
pub async fn get_user(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let user = run_blocking(&state, move |db| auth::get_user(db, id)).await?;
    Ok(Json(user))
}
