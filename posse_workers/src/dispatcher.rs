use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::Semaphore;

use posse_models::mappings::MappingStore;
use posse_services::image_cache::ImageCache;
use posse_services::llm::LlmClient;
use posse_services::social::{PostRequest, SocialClient};

use crate::content::format_content;
use crate::extractor::ExtractedPost;

/// Upper bound on the number of syndication posts dispatched concurrently
/// (spec §4.F "Worker pool").
const DISPATCH_CONCURRENCY: usize = 10;

/// Cap on how long the dispatcher waits for the whole fan-out before
/// returning to the webhook caller (spec §4.F "Fan-out").
const FAN_OUT_TIMEOUT: Duration = Duration::from_secs(60);

/// Drives the per-post syndication fan-out across every configured
/// platform client, per spec §4.F.
pub struct Dispatcher {
    clients: Vec<Arc<dyn SocialClient>>,
    image_cache: Arc<ImageCache>,
    llm: Option<Arc<LlmClient>>,
    mappings: Arc<MappingStore>,
}

/// Outcome of dispatching to a single `(platform, account)`.
pub struct DispatchOutcome {
    pub platform: String,
    pub account: String,
    pub result: Result<(), String>,
}

impl Dispatcher {
    pub fn new(
        clients: Vec<Arc<dyn SocialClient>>,
        image_cache: Arc<ImageCache>,
        llm: Option<Arc<LlmClient>>,
        mappings: Arc<MappingStore>,
    ) -> Self {
        Self {
            clients,
            image_cache,
            llm,
            mappings,
        }
    }

    /// Dispatches `post` to every matching, enabled client, per spec §4.F
    /// steps 1-9. `target_accounts` is the optional `__target_accounts`
    /// override from the webhook payload (step 3).
    pub async fn dispatch_event(
        &self,
        post: &ExtractedPost,
        body_source: &str,
        target_accounts: Option<&[String]>,
    ) -> Vec<DispatchOutcome> {
        let post_tags = post.tag_slugs();
        let target_set: Option<HashSet<&str>> =
            target_accounts.map(|accounts| accounts.iter().map(String::as_str).collect());

        let matching: Vec<&Arc<dyn SocialClient>> = self
            .clients
            .iter()
            .filter(|client| client.is_enabled())
            .filter(|client| {
                let tags = client.tags();
                tags.is_empty() || tags.iter().any(|t| post_tags.contains(&t.to_lowercase()))
            })
            .filter(|client| match &target_set {
                Some(targets) => targets.contains(client.account_name()),
                None => true,
            })
            .collect();

        if matching.is_empty() {
            return Vec::new();
        }

        let local_images = self.localize_images(post).await;
        let alt_texts = self.backfill_alt_text(&local_images, &post.alt_texts).await;

        let semaphore = Arc::new(Semaphore::new(DISPATCH_CONCURRENCY));
        let tasks = matching.into_iter().map(|client| {
            let client = Arc::clone(client);
            let semaphore = Arc::clone(&semaphore);
            let local_images = local_images.clone();
            let alt_texts = alt_texts.clone();
            let post = post.clone();
            async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
                self.dispatch_to_client(&client, &post, body_source, &local_images, &alt_texts)
                    .await
            }
        });

        let outcomes = tokio::time::timeout(FAN_OUT_TIMEOUT, futures::future::join_all(tasks)).await;
        let outcomes = match outcomes {
            Ok(outcomes) => outcomes,
            Err(_) => {
                log::warn!("dispatch fan-out for {} exceeded its time budget", post.post_url);
                Vec::new()
            }
        };

        self.image_cache.release(&post.image_urls).await;
        outcomes
    }

    async fn localize_images(&self, post: &ExtractedPost) -> Vec<PathBuf> {
        let mut paths = Vec::with_capacity(post.image_urls.len());
        for url in &post.image_urls {
            match self.image_cache.fetch(url).await {
                Ok(path) => paths.push(path),
                Err(err) => log::warn!("failed to cache image {url}: {err}"),
            }
        }
        paths
    }

    /// Fills in alt text for images Ghost left blank, via the LLM sidecar
    /// when configured (spec §4.F step 5).
    async fn backfill_alt_text(&self, local_images: &[PathBuf], source_alt: &[String]) -> Vec<String> {
        let mut alt_texts: Vec<String> = source_alt.to_vec();
        alt_texts.resize(local_images.len(), String::new());

        let Some(llm) = &self.llm else {
            return alt_texts;
        };
        for (path, alt) in local_images.iter().zip(alt_texts.iter_mut()) {
            if !alt.trim().is_empty() {
                continue;
            }
            match llm.generate_alt_text(path).await {
                Ok(generated) => *alt = generated,
                Err(err) => log::warn!("alt text generation failed for {path:?}: {err}"),
            }
        }
        alt_texts
    }

    async fn dispatch_to_client(
        &self,
        client: &Arc<dyn SocialClient>,
        post: &ExtractedPost,
        body_source: &str,
        local_images: &[PathBuf],
        alt_texts: &[String],
    ) -> DispatchOutcome {
        let platform = client.platform().to_owned();
        let account = client.account_name().to_owned();

        let content = format_content(
            body_source,
            &post.tags.iter().map(|t| t.slug.clone()).collect::<Vec<_>>(),
            &post.post_url,
            client.max_post_length(),
        );

        let should_split = post.image_urls.len() > 1 && client.split_multi_image_posts() && !post.suppress_split;

        let result = if should_split {
            self.dispatch_split(client, post, &content, local_images, alt_texts).await
        } else {
            self.dispatch_single(client, post, &content, local_images, alt_texts).await
        };

        DispatchOutcome {
            platform,
            account,
            result,
        }
    }

    async fn dispatch_single(
        &self,
        client: &Arc<dyn SocialClient>,
        post: &ExtractedPost,
        content: &str,
        local_images: &[PathBuf],
        alt_texts: &[String],
    ) -> Result<(), String> {
        let media_cap = client.max_media_per_post();
        let media_urls: Vec<String> = local_images
            .iter()
            .take(media_cap)
            .map(|p| p.display().to_string())
            .collect();
        let alt: Vec<String> = alt_texts.iter().take(media_cap).cloned().collect();

        let request = PostRequest {
            content,
            media_urls: &media_urls,
            alt_texts: &alt,
        };
        let post_result = client.post(request).await.map_err(|err| err.to_string())?;

        let post_data = json!({
            "status_id": post_result.status_id_or_uri,
            "post_uri": post_result.status_id_or_uri,
            "post_url": post_result.post_url,
        });
        self.record_mapping(post, client, post_data, false)
    }

    async fn dispatch_split(
        &self,
        client: &Arc<dyn SocialClient>,
        post: &ExtractedPost,
        content: &str,
        local_images: &[PathBuf],
        alt_texts: &[String],
    ) -> Result<(), String> {
        let total_splits = local_images.len();
        for (i, (path, alt)) in local_images.iter().zip(alt_texts.iter()).enumerate() {
            let media_urls = vec![path.display().to_string()];
            let alt_texts = vec![alt.clone()];
            let request = PostRequest {
                content,
                media_urls: &media_urls,
                alt_texts: &alt_texts,
            };
            let post_result = client.post(request).await.map_err(|err| err.to_string())?;
            let post_data = json!({
                "status_id": post_result.status_id_or_uri,
                "post_uri": post_result.status_id_or_uri,
                "post_url": post_result.post_url,
                "is_split": true,
                "split_index": i,
                "total_splits": total_splits,
            });
            self.record_mapping(post, client, post_data, true)?;
        }
        Ok(())
    }

    fn record_mapping(
        &self,
        post: &ExtractedPost,
        client: &Arc<dyn SocialClient>,
        post_data: Value,
        is_split: bool,
    ) -> Result<(), String> {
        self.mappings
            .put_mapping_entry(
                &post.post_id,
                &post.post_url,
                client.platform(),
                client.account_name(),
                post_data,
                is_split,
            )
            .map(|_| ())
            .map_err(|err| err.to_string())
    }
}
