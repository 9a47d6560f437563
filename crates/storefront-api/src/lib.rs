pub mod auth;
pub mod catalog;
pub mod comments;
pub mod error;
pub mod middleware;
pub mod ratings;
pub mod routes;
pub mod users;

use storefront_core::ServiceResult;
use storefront_db::Database;
use tracing::error;

use crate::auth::AppState;
use crate::error::ApiError;

pub use routes::router;

/// Run store work off the async runtime. rusqlite and Argon2 both block.
pub(crate) async fn run_blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> ServiceResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::internal()
        })?
        .map_err(ApiError::from)
}
