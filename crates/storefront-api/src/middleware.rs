//! Session cookie handling and caller identity.
//!
//! Handlers that need a signed-in caller take [`CurrentUser`] (or
//! [`AdminUser`]) as an argument. The extractor resolves the `session_id`
//! cookie against the store and hands the user to the handler, which passes
//! the id on to the services explicitly.

use axum::{extract::FromRequestParts, http::HeaderMap, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use storefront_core::auth::{self, SESSION_TTL_DAYS};
use storefront_types::models::PublicUser;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::run_blocking;

pub const SESSION_COOKIE: &str = "session_id";

/// A caller with a valid, unexpired session.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub PublicUser);

/// A signed-in caller whose role is admin.
#[derive(Debug, Clone)]
pub struct AdminUser(pub PublicUser);

pub fn session_id(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE).map(|c| c.value().to_string())
}

pub fn session_cookie(session_id: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::days(SESSION_TTL_DAYS))
        .build()
}

/// Path must match the one used when setting, or browsers keep the cookie.
pub fn cleared_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}

/// `None` for anonymous callers; store failures still surface as errors.
pub async fn resolve_user(state: &AppState, headers: &HeaderMap) -> Result<Option<PublicUser>, ApiError> {
    let jar = CookieJar::from_headers(headers);
    let Some(session_id) = session_id(&jar) else {
        return Ok(None);
    };
    run_blocking(state, move |db| auth::current_user(db, Some(&session_id))).await
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        resolve_user(state, &parts.headers)
            .await?
            .map(CurrentUser)
            .ok_or_else(ApiError::unauthorized)
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(ApiError::forbidden());
        }
        Ok(AdminUser(user))
    }
}
