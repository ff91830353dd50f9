use std::time::Duration;

use serde::Deserialize;

use crate::errors::ServiceError;

/// Read-only client for the Ghost Content API, used only by the
/// discovery path to resolve a Ghost post id to its canonical URL (spec
/// §6 "CMS Content API").
pub struct GhostContentApiClient {
    base_url: String,
    key: String,
    version: String,
    http: reqwest::Client,
}

impl GhostContentApiClient {
    pub fn new(base_url: impl Into<String>, key: impl Into<String>, version: impl Into<String>, timeout_seconds: u64) -> Self {
        Self {
            base_url: base_url.into(),
            key: key.into(),
            version: version.into(),
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout_seconds))
                .build()
                .expect("reqwest client builds with static config"),
        }
    }

    pub async fn resolve_post_url(&self, post_id: &str) -> Result<String, ServiceError> {
        let url = format!(
            "{}/ghost/api/content/posts/{post_id}",
            self.base_url.trim_end_matches('/')
        );
        let response = self
            .http
            .get(url)
            .query(&[("key", self.key.as_str())])
            .header("Accept-Version", &self.version)
            .send()
            .await?
            .error_for_status()?;
        let body: ContentApiResponse = response.json().await?;
        body.posts
            .into_iter()
            .next()
            .map(|p| p.url)
            .ok_or_else(|| ServiceError::Other(format!("post {post_id} not found via content api")))
    }
}

#[derive(Debug, Deserialize)]
struct ContentApiResponse {
    posts: Vec<ContentApiPost>,
}

#[derive(Debug, Deserialize)]
struct ContentApiPost {
    url: String,
}
