use thiserror::Error;

/// Mirrors the shape of a typical connection-pool-plus-query error
/// taxonomy, adapted to the synchronous `rusqlite`/`r2d2` stack used here
/// in place of an async postgres client.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error(transparent)]
    PoolError(#[from] r2d2::Error),

    #[error(transparent)]
    QueryError(#[from] rusqlite::Error),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error("{0} not found")]
    NotFound(&'static str),
}
