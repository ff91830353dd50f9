pub mod errors;
pub mod ghost_content_api;
pub mod image_cache;
pub mod llm;
pub mod notifications;
pub mod social;
pub mod turnstile;
pub mod webmention;
pub mod webmention_receiver;

pub use errors::ServiceError;
pub use image_cache::ImageCache;
