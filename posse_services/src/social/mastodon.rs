use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use posse_utils::html::strip_html;

use crate::errors::ServiceError;

use super::{InteractionCounts, PostRequest, PostResult, PostSummary, ReplyPreview, SocialClient, StatusInteractions};

const FAVOURITES_LIMIT: usize = 80;
const CONTEXT_REPLY_LIMIT: usize = 10;
const RECENT_POSTS_CAP: usize = 40;

/// A single configured Mastodon account (spec §4.D). Verifies credentials
/// once on startup and disables itself on failure, per spec.
pub struct Mastodon {
    name: String,
    instance_url: String,
    access_token: String,
    tags: Vec<String>,
    max_post_length: usize,
    split_multi_image_posts: bool,
    enabled: AtomicBool,
    http: reqwest::Client,
}

impl Mastodon {
    pub fn new(
        name: impl Into<String>,
        instance_url: impl Into<String>,
        access_token: impl Into<String>,
        tags: Vec<String>,
        max_post_length: usize,
        split_multi_image_posts: bool,
    ) -> Self {
        Self {
            name: name.into(),
            instance_url: instance_url.into(),
            access_token: access_token.into(),
            tags,
            max_post_length,
            split_multi_image_posts,
            enabled: AtomicBool::new(false),
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("reqwest client builds with static config"),
        }
    }

    /// Performs the startup credential check. Must be called once before
    /// the client participates in dispatch.
    pub async fn initialize(&self) {
        match self.verify_credentials().await {
            Ok(()) => self.enabled.store(true, Ordering::SeqCst),
            Err(err) => {
                log::warn!("mastodon account {} failed credential check: {err}", self.name);
                self.enabled.store(false, Ordering::SeqCst);
            }
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.instance_url.trim_end_matches('/'), path)
    }

    fn auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.bearer_auth(&self.access_token)
    }

    async fn upload_media(&self, url: &str, local_path: &std::path::Path, alt_text: &str) -> Result<String, ServiceError> {
        let bytes = tokio::fs::read(local_path).await?;
        let part = reqwest::multipart::Part::bytes(bytes).file_name(
            local_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image.jpg".to_owned()),
        );
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("description", alt_text.to_owned());
        let response = self
            .auth(self.http.post(self.api_url("/api/v2/media")).multipart(form))
            .send()
            .await?;
        let body: serde_json::Value = response.json().await?;
        body.get("id")
            .and_then(|v| v.as_str())
            .map(str::to_owned)
            .ok_or_else(|| ServiceError::Other(format!("media upload for {url} returned no id")))
    }
}

#[async_trait]
impl SocialClient for Mastodon {
    fn platform(&self) -> &'static str {
        "mastodon"
    }

    fn account_name(&self) -> &str {
        &self.name
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn max_post_length(&self) -> usize {
        self.max_post_length
    }

    fn split_multi_image_posts(&self) -> bool {
        self.split_multi_image_posts
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    async fn verify_credentials(&self) -> Result<(), ServiceError> {
        let response = self
            .auth(self.http.get(self.api_url("/api/v1/accounts/verify_credentials")))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ServiceError::UnexpectedStatus {
                status: response.status().as_u16(),
                body: self.api_url("/api/v1/accounts/verify_credentials"),
            });
        }
        Ok(())
    }

    async fn post(&self, request: PostRequest<'_>) -> Result<PostResult, ServiceError> {
        // Media is fetched by the dispatcher through the shared image
        // cache; here we expect already-cached local paths passed in via
        // media_urls and resolve them again for upload, mirroring the
        // Python client's "fetch then attach" order.
        let mut media_ids = Vec::with_capacity(request.media_urls.len());
        for (i, url) in request.media_urls.iter().enumerate() {
            let alt = request.alt_texts.get(i).map(String::as_str).unwrap_or("");
            let path = std::path::Path::new(url);
            match self.upload_media(url, path, alt).await {
                Ok(id) => media_ids.push(id),
                Err(err) => log::warn!("mastodon media upload failed for {url}: {err}"),
            }
        }

        let mut payload = json!({ "status": request.content });
        if !media_ids.is_empty() {
            payload["media_ids"] = json!(media_ids);
        }

        let response = self
            .auth(self.http.post(self.api_url("/api/v1/statuses")).json(&payload))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ServiceError::UnexpectedStatus {
                status: response.status().as_u16(),
                body: "statuses".to_owned(),
            });
        }
        let body: serde_json::Value = response.json().await?;
        let status_id = body["id"].as_str().unwrap_or_default().to_owned();
        let post_url = body["url"].as_str().unwrap_or_default().to_owned();
        Ok(PostResult {
            post_url,
            status_id_or_uri: status_id,
        })
    }

    async fn fetch_recent_posts(&self, limit: usize) -> Result<Vec<PostSummary>, ServiceError> {
        let effective_limit = limit.min(RECENT_POSTS_CAP);
        let account_id = self.fetch_account_id().await?;
        let response = self
            .auth(self.http.get(self.api_url(&format!("/api/v1/accounts/{account_id}/statuses"))))
            .query(&[("limit", effective_limit.to_string()), ("exclude_reblogs", "true".to_owned())])
            .send()
            .await?
            .error_for_status()?;
        let body: Vec<MastodonStatus> = response.json().await?;
        Ok(body
            .into_iter()
            .filter(|status| status.reblog.is_none())
            .map(|status| PostSummary {
                id: status.id,
                url: status.url,
                text: status.content,
                created_at: status.created_at,
            })
            .collect())
    }

    async fn fetch_status_interactions(&self, identifier: &str) -> Result<StatusInteractions, ServiceError> {
        let status = self
            .auth(self.http.get(self.api_url(&format!("/api/v1/statuses/{identifier}"))))
            .send()
            .await?
            .error_for_status()?
            .json::<MastodonStatus>()
            .await?;

        let favourited_by = self
            .fetch_accounts(&format!("/api/v1/statuses/{identifier}/favourited_by"), FAVOURITES_LIMIT)
            .await
            .unwrap_or_default();
        let reblogged_by = self
            .fetch_accounts(&format!("/api/v1/statuses/{identifier}/reblogged_by"), FAVOURITES_LIMIT)
            .await
            .unwrap_or_default();

        let context = self
            .auth(self.http.get(self.api_url(&format!("/api/v1/statuses/{identifier}/context"))))
            .send()
            .await?
            .error_for_status()?
            .json::<MastodonContext>()
            .await
            .unwrap_or(MastodonContext { descendants: vec![] });

        let reply_previews = context
            .descendants
            .into_iter()
            .filter(|d| d.in_reply_to_id.as_deref() == Some(identifier))
            .take(CONTEXT_REPLY_LIMIT)
            .map(|d| ReplyPreview {
                author_handle: format!("@{}", d.account.acct),
                author_url: d.account.url,
                author_avatar: Some(d.account.avatar),
                content: strip_html(&d.content),
                created_at: d.created_at,
                url: d.url,
            })
            .collect();

        Ok(StatusInteractions {
            counts: InteractionCounts {
                favorites: favourited_by.len() as u64,
                reblogs: reblogged_by.len() as u64,
                replies: status.replies_count.unwrap_or(0),
            },
            reply_previews,
        })
    }
}

impl Mastodon {
    async fn fetch_account_id(&self) -> Result<String, ServiceError> {
        let response = self
            .auth(self.http.get(self.api_url("/api/v1/accounts/verify_credentials")))
            .send()
            .await?
            .error_for_status()?;
        let body: serde_json::Value = response.json().await?;
        body["id"]
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| ServiceError::Other("verify_credentials returned no account id".to_owned()))
    }

    async fn fetch_accounts(&self, path: &str, limit: usize) -> Result<Vec<serde_json::Value>, ServiceError> {
        let response = self
            .auth(self.http.get(self.api_url(path)))
            .query(&[("limit", limit.to_string())])
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

#[derive(Debug, Deserialize)]
struct MastodonStatus {
    id: String,
    url: String,
    content: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    reblog: Option<serde_json::Value>,
    #[serde(default)]
    replies_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct MastodonContext {
    descendants: Vec<MastodonStatusNode>,
}

#[derive(Debug, Deserialize)]
struct MastodonStatusNode {
    url: String,
    content: String,
    created_at: DateTime<Utc>,
    in_reply_to_id: Option<String>,
    account: MastodonAccountRef,
}

#[derive(Debug, Deserialize)]
struct MastodonAccountRef {
    acct: String,
    url: String,
    avatar: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_strips_trailing_slash() {
        let client = Mastodon::new("a", "https://example.social/", "token", vec![], 500, false);
        assert_eq!(client.api_url("/api/v1/statuses"), "https://example.social/api/v1/statuses");
    }

    #[test]
    fn test_disabled_until_initialized() {
        let client = Mastodon::new("a", "https://example.social", "token", vec![], 500, false);
        assert!(!client.is_enabled());
    }
}
