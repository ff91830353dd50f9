use thiserror::Error;

/// Errors raised by the outbound service clients. Every variant maps to
/// an "upstream transient" condition per spec §7 — callers log and
/// degrade rather than propagate a hard failure to the dispatcher.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("client is disabled: {0}")]
    Disabled(&'static str),

    #[error("{0}")]
    Other(String),
}
