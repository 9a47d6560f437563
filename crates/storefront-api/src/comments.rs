use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use storefront_core::{ServiceError, comments};
use storefront_types::api::{CommentRequest, SuccessResponse};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::run_blocking;

pub async fn list_comments(
    State(state): State<AppState>,
    WithRejection(Path(product_id), _): WithRejection<Path<i64>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let comments = run_blocking(&state, move |db| comments::list_by_product(db, product_id)).await?;
    Ok(Json(comments))
}

pub async fn add_comment(
    State(state): State<AppState>,
    WithRejection(Path(product_id), _): WithRejection<Path<i64>, ApiError>,
    CurrentUser(user): CurrentUser,
    WithRejection(Json(req), _): WithRejection<Json<CommentRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = run_blocking(&state, move |db| {
        comments::add(db, product_id, user.id, &req.content)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn edit_comment(
    State(state): State<AppState>,
    WithRejection(Path(comment_id), _): WithRejection<Path<i64>, ApiError>,
    CurrentUser(user): CurrentUser,
    WithRejection(Json(req), _): WithRejection<Json<CommentRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = run_blocking(&state, move |db| {
        comments::edit(db, comment_id, user.id, &req.content)
    })
    .await?;
    Ok(Json(comment))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    WithRejection(Path(comment_id), _): WithRejection<Path<i64>, ApiError>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = run_blocking(&state, move |db| comments::delete(db, comment_id, user.id)).await?;
    if !deleted {
        return Err(ServiceError::NotFoundOrForbidden.into());
    }
    Ok(Json(SuccessResponse::ok()))
}
