mod bluesky;
mod facets;
mod image_compress;
mod mastodon;

pub use bluesky::Bluesky;
pub use mastodon::Mastodon;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

/// Request to post new content to a platform client, per spec §4.D.
pub struct PostRequest<'a> {
    pub content: &'a str,
    pub media_urls: &'a [String],
    pub alt_texts: &'a [String],
}

/// Result of a successful `post` call: both the platform-native identifier
/// and a browser-navigable URL must be surfaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostResult {
    pub post_url: String,
    /// Mastodon status id, or Bluesky AT-URI.
    pub status_id_or_uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: String,
    pub url: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InteractionCounts {
    pub favorites: u64,
    pub reblogs: u64,
    pub replies: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyPreview {
    pub author_handle: String,
    pub author_url: String,
    pub author_avatar: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusInteractions {
    pub counts: InteractionCounts,
    pub reply_previews: Vec<ReplyPreview>,
}

/// Shared capability set implemented by every platform client (spec
/// §4.D). Modeled as a trait object rather than an enum with inherited
/// behavior, since each platform's auth and wire format are unrelated
/// beyond this interface.
#[async_trait]
pub trait SocialClient: Send + Sync {
    fn platform(&self) -> &'static str;

    fn account_name(&self) -> &str;

    /// Configured tag allowlist; empty means the account matches every
    /// post (spec §4.F tag filtering, §3 "Platform account").
    fn tags(&self) -> &[String];

    fn max_post_length(&self) -> usize;

    fn split_multi_image_posts(&self) -> bool;

    /// True once the client has passed its startup credential check.
    fn is_enabled(&self) -> bool;

    async fn verify_credentials(&self) -> Result<(), ServiceError>;

    async fn post(&self, request: PostRequest<'_>) -> Result<PostResult, ServiceError>;

    async fn fetch_recent_posts(&self, limit: usize) -> Result<Vec<PostSummary>, ServiceError>;

    async fn fetch_status_interactions(
        &self,
        identifier: &str,
    ) -> Result<StatusInteractions, ServiceError>;

    /// Per-post media item cap (Mastodon: instance-dependent, assumed 4;
    /// Bluesky: hard-capped at 4).
    fn max_media_per_post(&self) -> usize {
        4
    }
}
