use std::sync::{Arc, LazyLock};

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::{WithRejection, cookie::CookieJar};
use regex::Regex;
use storefront_core::auth;
use storefront_db::Database;
use storefront_types::api::{
    CurrentUserResponse, SignInRequest, SignUpRequest, SuccessResponse, UserResponse,
};

use crate::error::ApiError;
use crate::middleware::{cleared_session_cookie, resolve_user, session_cookie, session_id};
use crate::run_blocking;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    /// Adds `Secure` to the session cookie. Off for plain-HTTP development.
    pub secure_cookies: bool,
}

pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid"));

fn validate_sign_up(req: &SignUpRequest) -> Result<(), ApiError> {
    if req.email.is_empty() || req.password.is_empty() || req.name.trim().is_empty() {
        return Err(ApiError::bad_request("Email, password, and name are required"));
    }
    if !EMAIL_RE.is_match(&req.email) {
        return Err(ApiError::bad_request("Invalid email format"));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    Ok(())
}

pub async fn sign_up(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<SignUpRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    validate_sign_up(&req)?;

    let user = run_blocking(&state, move |db| {
        auth::sign_up(db, &req.email, &req.password, req.name.trim())
    })
    .await?;

    Ok((StatusCode::CREATED, Json(UserResponse { user })))
}

pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(req), _): WithRejection<Json<SignInRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let signed_in = run_blocking(&state, move |db| auth::sign_in(db, &req.email, &req.password)).await?;

    let jar = jar.add(session_cookie(signed_in.session_id, state.secure_cookies));
    Ok((jar, Json(UserResponse { user: signed_in.user })))
}

/// Always succeeds for the caller, signed in or not, and clears the cookie.
pub async fn sign_out(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(session_id) = session_id(&jar) {
        run_blocking(&state, move |db| auth::sign_out(db, &session_id)).await?;
    }

    let jar = jar.remove(cleared_session_cookie());
    Ok((jar, Json(SuccessResponse::ok())))
}

pub async fn me(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let user = resolve_user(&state, &headers).await?;
    Ok(Json(CurrentUserResponse { user }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str, password: &str, name: &str) -> SignUpRequest {
        SignUpRequest {
            email: email.into(),
            password: password.into(),
            name: name.into(),
        }
    }

    #[test]
    fn sign_up_validation() {
        assert!(validate_sign_up(&request("ada@example.com", "hunter22", "Ada")).is_ok());
        assert!(validate_sign_up(&request("", "hunter22", "Ada")).is_err());
        assert!(validate_sign_up(&request("ada@example.com", "hunter22", "  ")).is_err());
        assert!(validate_sign_up(&request("not-an-email", "hunter22", "Ada")).is_err());
        assert!(validate_sign_up(&request("ada@example", "hunter22", "Ada")).is_err());
        assert!(validate_sign_up(&request("ada @example.com", "hunter22", "Ada")).is_err());
        assert!(validate_sign_up(&request("ada@example.com", "12345", "Ada")).is_err());
        assert!(validate_sign_up(&request("ada@example.com", "123456", "Ada")).is_ok());
    }
}
