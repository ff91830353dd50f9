use actix_web::{get, post, web, HttpRequest, HttpResponse, Scope};
use serde::Deserialize;
use serde_json::json;

use posse_models::replies::Reply;
use posse_services::turnstile::verify_turnstile;
use posse_validators::reply::{validate_reply, ReplySubmission};
use posse_utils::hashing::hash_ip;
use posse_utils::ids::generate_reply_id;

use crate::db::blocking;
use crate::errors::HttpError;
use crate::h_entry::render_reply_page;
use crate::http::{form_or_json_into_inner, real_ip, FormOrJson};
use crate::state::AppState;

pub fn reply_scope() -> Scope {
    web::scope("/api/webmention").service(submit_reply)
}

pub fn reply_page_scope() -> Scope {
    web::scope("/reply").service(get_reply_page)
}

#[derive(Debug, Deserialize)]
pub struct ReplyForm {
    pub author_name: String,
    #[serde(default)]
    pub author_url: Option<String>,
    pub content: String,
    pub target: String,
    /// Honeypot field: real clients never fill this in.
    #[serde(default)]
    pub website: String,
    #[serde(default, rename = "cf-turnstile-response")]
    pub turnstile_token: Option<String>,
}

/// `POST /api/webmention/reply` (spec §4.M).
#[post("/reply")]
async fn submit_reply(
    request: HttpRequest,
    state: web::Data<AppState>,
    body: FormOrJson<ReplyForm>,
) -> Result<HttpResponse, HttpError> {
    if !state.config.webmention_reply.enabled {
        return Err(HttpError::NotConfigured("webmention_reply"));
    }

    let form = form_or_json_into_inner(body);
    if !form.website.is_empty() {
        return Ok(HttpResponse::Ok().finish());
    }

    let ip = real_ip(&request);
    if !state
        .rate_limiter
        .allow_request(&ip, state.config.webmention_reply.rate_limit)
    {
        return Err(HttpError::RateLimited);
    }

    let submission = ReplySubmission {
        author_name: &form.author_name,
        author_url: form.author_url.as_deref(),
        content: &form.content,
        target: &form.target,
    };
    validate_reply(&submission, &state.config.webmention_reply.allowed_target_origins)?;

    if let Some(secret) = &state.config.webmention_reply.turnstile_secret_key {
        let token = form.turnstile_token.as_deref().unwrap_or_default();
        if !verify_turnstile(&state.http, token, &ip, secret).await {
            return Err(HttpError::ValidationError("turnstile verification failed".to_owned()));
        }
    }

    let salt = state.config.security.ip_hash_salt.as_deref().unwrap_or("posse-default-salt");
    let reply = Reply {
        id: generate_reply_id(),
        author_name: form.author_name,
        author_url: form.author_url,
        content: form.content,
        target: form.target.clone(),
        ip_hash: hash_ip(&ip, salt),
        created_at: chrono::Utc::now(),
    };
    let replies = std::sync::Arc::clone(&state.replies);
    let stored = reply.clone();
    blocking(move || replies.add(&stored)).await?;

    let blog_url = state.config.ghost.blog_url.as_deref().unwrap_or_default();
    let source = format!("{blog_url}/reply/{}", reply.id);
    let endpoint = format!("{blog_url}/webmention");
    if let Err(err) = state.webmention_sender.send(&endpoint, &source, &form.target).await {
        log::warn!("failed sending reply webmention for {}: {err}", reply.id);
    }

    Ok(HttpResponse::Ok().json(json!({"id": reply.id, "url": format!("/reply/{}", reply.id)})))
}

/// `GET /reply/{id}` (spec §4.M / §4.N): the stored h-entry page.
#[get("/{id}")]
async fn get_reply_page(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, HttpError> {
    let id = path.into_inner();
    let replies = std::sync::Arc::clone(&state.replies);
    let lookup_id = id.clone();
    let reply = blocking(move || replies.get(&lookup_id))
        .await?
        .ok_or(HttpError::NotFoundError("reply"))?;
    let blog_name = state.config.webmention_reply.blog_name.as_deref().unwrap_or("this blog");
    let page = render_reply_page(&reply, blog_name, &state.config.timezone);
    Ok(HttpResponse::Ok().content_type("text/html; charset=utf-8").body(page))
}
