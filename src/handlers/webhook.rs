use std::collections::HashSet;
use std::sync::Arc;

use actix_web::{post, web, HttpRequest, HttpResponse, Scope};
use serde_json::{json, Value};

use posse_validators::schema::validate_ghost_webhook;
use posse_workers::extract_post;

use crate::db::blocking;
use crate::errors::HttpError;
use crate::state::AppState;

pub fn webhook_scope() -> Scope {
    web::scope("/webhook/ghost")
        .service(ghost_webhook)
        .service(ghost_post_updated_webhook)
}

/// `X-Webhook-Secret` check: allowed through when no secret is configured
/// (spec §4.N "default: allow when not set").
fn check_webhook_secret(request: &HttpRequest, state: &AppState) -> Result<(), HttpError> {
    let Some(expected) = state.config.security.webhook_secret.as_deref() else {
        return Ok(());
    };
    let provided = request
        .headers()
        .get("X-Webhook-Secret")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if provided == expected {
        Ok(())
    } else {
        Err(HttpError::AuthError("invalid webhook secret"))
    }
}

fn body_source(post: &posse_workers::ExtractedPost) -> String {
    post.excerpt.clone().unwrap_or_else(|| post.title.clone())
}

/// New-post webhook (spec §4.N). Validates the payload and, when
/// `status == "published"`, kicks off the syndication fan-out in the
/// background so the webhook call itself returns promptly.
#[post("")]
async fn ghost_webhook(
    request: HttpRequest,
    state: web::Data<AppState>,
    payload: web::Json<Value>,
) -> Result<HttpResponse, HttpError> {
    check_webhook_secret(&request, &state)?;
    validate_ghost_webhook(&payload)?;

    let current = &payload["post"]["current"];
    let post = extract_post(current);
    if post.status != "published" {
        return Ok(HttpResponse::Ok().json(json!({"status": "skipped"})));
    }

    let raw_html = current["html"].as_str().unwrap_or_default().to_owned();
    notify_webmention_targets(state.get_ref(), &post, Vec::new(), raw_html);
    spawn_dispatch(state.get_ref(), post, None);

    Ok(HttpResponse::Ok().json(json!({"status": "accepted"})))
}

/// Post-update webhook (spec §4.N). Only dispatches to the
/// `(platform, account)` pairs the post would now match but is not yet
/// syndicated to.
#[post("/post-updated")]
async fn ghost_post_updated_webhook(
    request: HttpRequest,
    state: web::Data<AppState>,
    payload: web::Json<Value>,
) -> Result<HttpResponse, HttpError> {
    check_webhook_secret(&request, &state)?;
    validate_ghost_webhook(&payload)?;

    let current = &payload["post"]["current"];
    let post = extract_post(current);

    let mappings = Arc::clone(&state.mappings);
    let lookup_id = post.post_id.clone();
    let existing = blocking(move || mappings.get_mapping(&lookup_id)).await?;
    let previously_sent = existing
        .as_ref()
        .map(|mapping| mapping.webmention_links_sent.clone())
        .unwrap_or_default();

    if post.status != "published" {
        // Treated as a delete/unpublish for webmention purposes (spec
        // §4.K "On delete, notify every previously notified URL"): no
        // current links, so every previously-sent link is re-notified and
        // the stored set is cleared. No syndication dispatch happens.
        if !previously_sent.is_empty() {
            notify_webmention_targets(state.get_ref(), &post, previously_sent, Vec::new());
        }
        return Ok(HttpResponse::Ok().json(json!({"status": "skipped"})));
    }

    let post_tags = post.tag_slugs();
    let already_mapped: HashSet<String> = existing
        .as_ref()
        .map(|mapping| {
            mapping
                .platforms
                .values()
                .flat_map(|accounts| accounts.keys().cloned())
                .collect()
        })
        .unwrap_or_default();

    let target_accounts: Vec<String> = state
        .clients
        .iter()
        .filter(|client| client.is_enabled())
        .filter(|client| {
            let tags = client.tags();
            tags.is_empty() || tags.iter().any(|t| post_tags.contains(&t.to_lowercase()))
        })
        .filter(|client| !already_mapped.contains(client.account_name()))
        .map(|client| client.account_name().to_owned())
        .collect();

    let raw_html = current["html"].as_str().unwrap_or_default().to_owned();
    notify_webmention_targets(state.get_ref(), &post, previously_sent, raw_html.clone());

    if target_accounts.is_empty() {
        return Ok(HttpResponse::Ok().json(json!({"status": "already fully syndicated"})));
    }

    spawn_dispatch(state.get_ref(), post, Some(target_accounts));

    Ok(HttpResponse::Ok().json(json!({"status": "accepted"})))
}

/// Runs the dispatcher in the background, then enqueues an immediate
/// interaction sync (spec §4.F step 11). Errors are logged; the webhook
/// caller already got its 200.
fn spawn_dispatch(state: &AppState, post: posse_workers::ExtractedPost, target_accounts: Option<Vec<String>>) {
    let dispatcher = Arc::clone(&state.dispatcher);
    let scheduler = Arc::clone(&state.scheduler);
    let post_id = post.post_id.clone();

    tokio::spawn(async move {
        let body = body_source(&post);
        let outcomes = dispatcher
            .dispatch_event(&post, &body, target_accounts.as_deref())
            .await;
        for outcome in &outcomes {
            if let Err(err) = &outcome.result {
                log::warn!(
                    "syndication to {}/{} failed for post {}: {err}",
                    outcome.platform,
                    outcome.account,
                    post.post_url
                );
            }
        }

        scheduler.trigger_manual_sync(post_id).await;
    });
}

/// Sends webmentions to every tag-matching target for the link-diff set
/// (spec §4.K, §8 testable property #8: `current ∪ (previous − current)`),
/// then persists the new current set as `webmention_links_sent` so the
/// next update/delete can diff against it. `raw_html` of `None`-equivalent
/// (empty string) means "no current links" — the delete case.
fn notify_webmention_targets(
    state: &AppState,
    post: &posse_workers::ExtractedPost,
    previously_sent: Vec<String>,
    raw_html: String,
) {
    let webmention_targets = state.config.webmention.targets.clone();
    if webmention_targets.is_empty() && previously_sent.is_empty() {
        return;
    }
    let webmention_sender = Arc::clone(&state.webmention_sender);
    let mappings = Arc::clone(&state.mappings);
    let post = post.clone();

    tokio::spawn(async move {
        let current_links = if raw_html.is_empty() {
            Vec::new()
        } else {
            posse_services::webmention::extract_outbound_links(&raw_html, &post.post_url)
        };
        let targets = posse_services::webmention::diff_targets_on_update(&current_links, &previously_sent);
        let post_tags = post.tag_slugs();
        for target in &webmention_targets {
            let tag_matches = target
                .tag
                .as_deref()
                .map(|tag| post_tags.contains(&tag.to_lowercase()))
                .unwrap_or(true);
            if !tag_matches {
                continue;
            }
            for link in &targets {
                if let Err(err) = webmention_sender.send(&target.endpoint, &post.post_url, link).await {
                    log::warn!("webmention send to {} failed: {err}", target.endpoint);
                }
            }
        }

        let post_id = post.post_id.clone();
        let ghost_post_url = post.post_url.clone();
        let result = blocking(move || mappings.set_webmention_links_sent(&post_id, &ghost_post_url, current_links)).await;
        if let Err(err) = result {
            log::warn!("failed to persist webmention_links_sent for {}: {err}", post.post_url);
        }
    });
}
