use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::errors::ServiceError;

use super::facets::{build_facets, FacetFeature};
use super::image_compress::compress_for_bluesky;
use super::{InteractionCounts, PostRequest, PostResult, PostSummary, ReplyPreview, SocialClient, StatusInteractions};

const LIKES_LIMIT: usize = 100;
const REPOSTS_LIMIT: usize = 100;
const THREAD_REPLY_LIMIT: usize = 10;
const RECENT_POSTS_CAP: usize = 100;
const MAX_MEDIA: usize = 4;

/// A single configured Bluesky account (spec §4.D). Re-authenticates
/// before every post via `com.atproto.server.createSession`, matching the
/// platform's short-lived session tokens.
pub struct Bluesky {
    name: String,
    pds_url: String,
    handle: String,
    app_password: String,
    tags: Vec<String>,
    max_post_length: usize,
    split_multi_image_posts: bool,
    enabled: AtomicBool,
    http: reqwest::Client,
}

struct Session {
    access_jwt: String,
    did: String,
}

impl Bluesky {
    pub fn new(
        name: impl Into<String>,
        pds_url: impl Into<String>,
        handle: impl Into<String>,
        app_password: impl Into<String>,
        tags: Vec<String>,
        max_post_length: usize,
        split_multi_image_posts: bool,
    ) -> Self {
        Self {
            name: name.into(),
            pds_url: pds_url.into(),
            handle: handle.into(),
            app_password: app_password.into(),
            tags,
            max_post_length,
            split_multi_image_posts,
            enabled: AtomicBool::new(true),
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("reqwest client builds with static config"),
        }
    }

    pub async fn initialize(&self) {
        match self.verify_credentials().await {
            Ok(()) => self.enabled.store(true, Ordering::SeqCst),
            Err(err) => {
                log::warn!("bluesky account {} failed credential check: {err}", self.name);
                self.enabled.store(false, Ordering::SeqCst);
            }
        }
    }

    fn xrpc(&self, method: &str) -> String {
        format!("{}/xrpc/{method}", self.pds_url.trim_end_matches('/'))
    }

    async fn authenticate(&self) -> Result<Session, ServiceError> {
        let response = self
            .http
            .post(self.xrpc("com.atproto.server.createSession"))
            .json(&json!({ "identifier": self.handle, "password": self.app_password }))
            .send()
            .await?
            .error_for_status()?;
        let body: CreateSessionResponse = response.json().await?;
        Ok(Session {
            access_jwt: body.access_jwt,
            did: body.did,
        })
    }

    async fn upload_blob(&self, session: &Session, bytes: Vec<u8>) -> Result<serde_json::Value, ServiceError> {
        let compressed = compress_for_bluesky(&bytes)?;
        let response = self
            .http
            .post(self.xrpc("com.atproto.repo.uploadBlob"))
            .bearer_auth(&session.access_jwt)
            .header("Content-Type", "image/jpeg")
            .body(compressed)
            .send()
            .await?
            .error_for_status()?;
        let body: serde_json::Value = response.json().await?;
        Ok(body["blob"].clone())
    }
}

#[async_trait]
impl SocialClient for Bluesky {
    fn platform(&self) -> &'static str {
        "bluesky"
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

    fn max_media_per_post(&self) -> usize {
        MAX_MEDIA
    }

    async fn verify_credentials(&self) -> Result<(), ServiceError> {
        self.authenticate().await.map(|_| ())
    }

    async fn post(&self, request: PostRequest<'_>) -> Result<PostResult, ServiceError> {
        let session = self.authenticate().await?;

        let mut images = Vec::with_capacity(request.media_urls.len().min(MAX_MEDIA));
        for (i, url) in request.media_urls.iter().take(MAX_MEDIA).enumerate() {
            let bytes = match tokio::fs::read(url).await {
                Ok(b) => b,
                Err(err) => {
                    log::warn!("bluesky could not read cached image {url}: {err}");
                    continue;
                }
            };
            match self.upload_blob(&session, bytes).await {
                Ok(blob) => {
                    let alt = request.alt_texts.get(i).cloned().unwrap_or_default();
                    images.push(json!({ "image": blob, "alt": alt }));
                }
                Err(err) => log::warn!("bluesky blob upload failed for {url}: {err}"),
            }
        }

        let facets: Vec<serde_json::Value> = build_facets(request.content)
            .into_iter()
            .map(|f| {
                let feature = match f.feature {
                    FacetFeature::Link { uri } => json!({ "$type": "app.bsky.richtext.facet#link", "uri": uri }),
                    FacetFeature::Tag { tag } => json!({ "$type": "app.bsky.richtext.facet#tag", "tag": tag }),
                };
                json!({
                    "index": { "byteStart": f.byte_start, "byteEnd": f.byte_end },
                    "features": [feature],
                })
            })
            .collect();

        let mut record = json!({
            "$type": "app.bsky.feed.post",
            "text": request.content,
            "createdAt": Utc::now().to_rfc3339(),
        });
        if !facets.is_empty() {
            record["facets"] = json!(facets);
        }
        if !images.is_empty() {
            record["embed"] = json!({ "$type": "app.bsky.embed.images", "images": images });
        }

        let response = self
            .http
            .post(self.xrpc("com.atproto.repo.createRecord"))
            .bearer_auth(&session.access_jwt)
            .json(&json!({
                "repo": session.did,
                "collection": "app.bsky.feed.post",
                "record": record,
            }))
            .send()
            .await?
            .error_for_status()?;
        let body: serde_json::Value = response.json().await?;
        let uri = body["uri"].as_str().unwrap_or_default().to_owned();
        let post_url = at_uri_to_web_url(&uri, &self.handle);
        Ok(PostResult {
            post_url,
            status_id_or_uri: uri,
        })
    }

    async fn fetch_recent_posts(&self, limit: usize) -> Result<Vec<PostSummary>, ServiceError> {
        let session = self.authenticate().await?;
        let effective_limit = limit.min(RECENT_POSTS_CAP);
        let response = self
            .http
            .get(self.xrpc("app.bsky.feed.getAuthorFeed"))
            .bearer_auth(&session.access_jwt)
            .query(&[("actor", session.did.as_str()), ("limit", &effective_limit.to_string())])
            .send()
            .await?
            .error_for_status()?;
        let body: AuthorFeedResponse = response.json().await?;
        Ok(body
            .feed
            .into_iter()
            .filter(|item| item.reason.is_none())
            .map(|item| PostSummary {
                id: item.post.uri.clone(),
                url: at_uri_to_web_url(&item.post.uri, &self.handle),
                text: item.post.record.text,
                created_at: item.post.record.created_at,
            })
            .collect())
    }

    async fn fetch_status_interactions(&self, identifier: &str) -> Result<StatusInteractions, ServiceError> {
        let session = self.authenticate().await?;

        let thread = self
            .http
            .get(self.xrpc("app.bsky.feed.getPostThread"))
            .bearer_auth(&session.access_jwt)
            .query(&[("uri", identifier)])
            .send()
            .await?
            .error_for_status()?
            .json::<ThreadResponse>()
            .await?;

        let likes = self
            .http
            .get(self.xrpc("app.bsky.feed.getLikes"))
            .bearer_auth(&session.access_jwt)
            .query(&[("uri", identifier), ("limit", &LIKES_LIMIT.to_string())])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .ok();
        let likes_count = match likes {
            Some(resp) => resp
                .json::<LikesResponse>()
                .await
                .map(|b| b.likes.len())
                .unwrap_or(0),
            None => 0,
        };

        let reposts = self
            .http
            .get(self.xrpc("app.bsky.feed.getRepostedBy"))
            .bearer_auth(&session.access_jwt)
            .query(&[("uri", identifier), ("limit", &REPOSTS_LIMIT.to_string())])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .ok();
        let reposts_count = match reposts {
            Some(resp) => resp
                .json::<RepostedByResponse>()
                .await
                .map(|b| b.reposted_by.len())
                .unwrap_or(0),
            None => 0,
        };

        let replies: Vec<ReplyPreview> = thread
            .thread
            .replies
            .into_iter()
            .take(THREAD_REPLY_LIMIT)
            .map(|reply| ReplyPreview {
                author_handle: format!("@{}", reply.post.author.handle),
                author_url: format!("https://bsky.app/profile/{}", reply.post.author.handle),
                author_avatar: reply.post.author.avatar,
                content: reply.post.record.text,
                created_at: reply.post.record.created_at,
                url: at_uri_to_web_url(&reply.post.uri, &reply.post.author.handle),
            })
            .collect();

        Ok(StatusInteractions {
            counts: InteractionCounts {
                favorites: likes_count as u64,
                reblogs: reposts_count as u64,
                replies: replies.len() as u64,
            },
            reply_previews: replies,
        })
    }
}

fn at_uri_to_web_url(at_uri: &str, handle: &str) -> String {
    match at_uri.rsplit_once('/') {
        Some((_, rkey)) => format!("https://bsky.app/profile/{handle}/post/{rkey}"),
        None => format!("https://bsky.app/profile/{handle}"),
    }
}

#[derive(Debug, Deserialize)]
struct CreateSessionResponse {
    #[serde(rename = "accessJwt")]
    access_jwt: String,
    did: String,
}

#[derive(Debug, Deserialize)]
struct AuthorFeedResponse {
    feed: Vec<FeedItem>,
}

#[derive(Debug, Deserialize)]
struct FeedItem {
    post: FeedPost,
    #[serde(default)]
    reason: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct FeedPost {
    uri: String,
    record: FeedPostRecord,
}

#[derive(Debug, Deserialize)]
struct FeedPostRecord {
    text: String,
    #[serde(rename = "createdAt")]
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ThreadResponse {
    thread: ThreadNode,
}

#[derive(Debug, Deserialize)]
struct ThreadNode {
    #[serde(default)]
    replies: Vec<ThreadNode>,
    post: ReplyPost,
}

#[derive(Debug, Deserialize)]
struct ReplyPost {
    uri: String,
    author: ReplyAuthor,
    record: FeedPostRecord,
}

#[derive(Debug, Deserialize)]
struct ReplyAuthor {
    handle: String,
    avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LikesResponse {
    likes: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RepostedByResponse {
    #[serde(rename = "repostedBy")]
    reposted_by: Vec<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xrpc_url() {
        let client = Bluesky::new("a", "https://bsky.social/", "h", "p", vec![], 300, true);
        assert_eq!(client.xrpc("com.atproto.server.createSession"), "https://bsky.social/xrpc/com.atproto.server.createSession");
    }

    #[test]
    fn test_at_uri_to_web_url() {
        let url = at_uri_to_web_url("at://did:plc:abc/app.bsky.feed.post/xyz123", "alice.bsky.social");
        assert_eq!(url, "https://bsky.app/profile/alice.bsky.social/post/xyz123");
    }
}
