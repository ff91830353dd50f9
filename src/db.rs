use actix_web::web;
use posse_models::DatabaseError;

use crate::errors::HttpError;

/// Runs a synchronous rusqlite call on actix's blocking thread pool, per
/// spec §5's note that SQLite access from the async HTTP surface should not
/// run on the reactor thread.
pub async fn blocking<F, T>(f: F) -> Result<T, HttpError>
where
    F: FnOnce() -> Result<T, DatabaseError> + Send + 'static,
    T: Send + 'static,
{
    web::block(f)
        .await
        .map_err(|error| HttpError::InternalError(error.to_string()))?
        .map_err(HttpError::from)
}
