pub mod auth;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod password;
pub mod posts;
pub mod profile;
pub mod reactions;
pub mod routes;

pub use auth::{AppState, AppStateInner};
pub use error::ApiError;
pub use routes::router;

use lions_db::Database;
use tracing::error;

/// Run a blocking store call off the async runtime.
///
/// Closures that use `?` need their error type pinned, e.g.
/// `Ok::<_, ApiError>(value)`.
pub(crate) async fn db_call<F, T, E>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<ApiError> + Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Join(e)
        })?
        .map_err(Into::into)
}
