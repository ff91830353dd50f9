use actix_web::{get, post, web, HttpResponse, Scope};
use serde::Deserialize;
use serde_json::json;

use posse_models::webmentions::ReceivedWebmention;
use posse_services::webmention_receiver::{verify_source, SourceVerification};
use posse_validators::webmention::validate_webmention;

use crate::db::blocking;
use crate::errors::HttpError;
use crate::http::{form_or_json_into_inner, FormOrJson};
use crate::state::AppState;

pub fn webmention_scope() -> Scope {
    web::scope("/webmention").service(receive_webmention).service(webmention_info)
}

#[derive(Debug, Deserialize)]
pub struct WebmentionSubmission {
    pub source: String,
    pub target: String,
}

/// `GET /webmention` returns discovery information; actual submissions
/// are POSTed (spec §4.L).
#[get("")]
async fn webmention_info() -> HttpResponse {
    HttpResponse::Ok().json(json!({"accepts": "POST source=&target="}))
}

/// `POST /webmention` (spec §4.L). Stores a pending record and verifies
/// it inline before responding, which is acceptable for this service's
/// scale (spec §4.L "may also be invoked inline in small deployments").
#[post("")]
async fn receive_webmention(
    state: web::Data<AppState>,
    body: FormOrJson<WebmentionSubmission>,
) -> Result<HttpResponse, HttpError> {
    let submission = form_or_json_into_inner(body);
    let blog_url = state
        .config
        .ghost
        .blog_url
        .as_deref()
        .ok_or(HttpError::NotConfigured("ghost.blog_url"))?;

    validate_webmention(&submission.source, &submission.target, blog_url)?;

    let pending = ReceivedWebmention::pending(submission.source.clone(), submission.target.clone());
    let webmentions = std::sync::Arc::clone(&state.webmentions);
    let stored = pending.clone();
    blocking(move || webmentions.add(&stored)).await?;

    let mut body = json!({"verified": false});
    match verify_source(&state.http, &submission.source, &submission.target).await {
        Ok(SourceVerification::Verified(mention)) => {
            let mut verified = pending.clone();
            verified.status = posse_models::webmentions::WebmentionStatus::Verified;
            verified.verified_at = Some(chrono::Utc::now());
            verified.mention_type = mention_kind_to_type(mention.mention_type);
            verified.author_name = mention.author_name;
            verified.author_url = mention.author_url;
            verified.author_photo = mention.author_photo;
            verified.content = mention.content_text;
            let webmentions = std::sync::Arc::clone(&state.webmentions);
            let stored = verified;
            blocking(move || webmentions.add(&stored)).await?;
            body = json!({"verified": true});
        }
        Ok(SourceVerification::Gone) => {
            let webmentions = std::sync::Arc::clone(&state.webmentions);
            let (source, target) = (submission.source.clone(), submission.target.clone());
            blocking(move || webmentions.remove(&source, &target)).await?;
        }
        Ok(SourceVerification::Rejected(reason)) => {
            let mut rejected = pending.clone();
            rejected.status = posse_models::webmentions::WebmentionStatus::Rejected;
            let webmentions = std::sync::Arc::clone(&state.webmentions);
            let stored = rejected;
            blocking(move || webmentions.add(&stored)).await?;
            body = json!({"verified": false, "verification_error": reason});
        }
        Err(err) => {
            log::warn!("webmention verification failed for {}: {err}", submission.source);
        }
    }

    Ok(HttpResponse::Accepted().json(body))
}

fn mention_kind_to_type(
    kind: Option<posse_services::webmention_receiver::MentionKind>,
) -> posse_models::webmentions::MentionType {
    use posse_models::webmentions::MentionType;
    use posse_services::webmention_receiver::MentionKind;
    match kind {
        Some(MentionKind::Reply) => MentionType::Reply,
        Some(MentionKind::Like) => MentionType::Like,
        Some(MentionKind::Repost) => MentionType::Repost,
        Some(MentionKind::Bookmark) => MentionType::Bookmark,
        Some(MentionKind::Mention) | None => MentionType::Mention,
    }
}

/// `GET /api/webmentions/{path}` (spec §4.N): verified webmentions for a
/// blog post, addressed by its path relative to the configured blog URL.
#[get("/api/webmentions/{path:.*}")]
pub async fn list_for_target(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, HttpError> {
    let blog_url = state
        .config
        .ghost
        .blog_url
        .as_deref()
        .ok_or(HttpError::NotConfigured("ghost.blog_url"))?;
    let target = format!("{}/{}", blog_url.trim_end_matches('/'), path.into_inner().trim_start_matches('/'));
    let webmentions = std::sync::Arc::clone(&state.webmentions);
    let mentions = blocking(move || webmentions.get_for_target(&target)).await?;
    Ok(HttpResponse::Ok().json(mentions))
}
