use std::sync::Arc;

use actix_web::{get, post, web, HttpRequest, HttpResponse, Scope};
use serde_json::json;

use posse_models::mappings::{MappingEntry, SyndicationMapping};
use posse_validators::post_id::validate_post_id;
use posse_workers::{discovery::discover_mapping, interactions::sync_post_interactions};

use crate::db::blocking;
use crate::errors::HttpError;
use crate::http::real_ip;
use crate::state::AppState;

pub fn interactions_scope() -> Scope {
    web::scope("/api/interactions/{id}")
        .service(get_interactions)
        .service(trigger_sync)
}

fn check_referrer(request: &HttpRequest, state: &AppState) -> Result<(), HttpError> {
    if state.config.security.allowed_referrers.is_empty() {
        return Ok(());
    }
    let referrer = request
        .headers()
        .get("Referer")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let allowed = state
        .config
        .security
        .allowed_referrers
        .iter()
        .any(|prefix| referrer.starts_with(prefix.as_str()));
    if allowed {
        Ok(())
    } else {
        Err(HttpError::ForbiddenReferrer)
    }
}

fn empty_skeleton() -> serde_json::Value {
    json!({"syndication_links": {}, "reply_previews": []})
}

fn syndication_links(mapping: &SyndicationMapping) -> serde_json::Value {
    let mut links = serde_json::Map::new();
    for (platform, accounts) in &mapping.platforms {
        let mut platform_links = serde_json::Map::new();
        for (account, entry) in accounts {
            let values: Vec<&serde_json::Value> = match entry {
                MappingEntry::Single(value) => vec![value],
                MappingEntry::Split(values) => values.iter().collect(),
            };
            let urls: Vec<serde_json::Value> = values.into_iter().map(|value| value["post_url"].clone()).collect();
            platform_links.insert(
                account.clone(),
                if urls.len() == 1 { urls.into_iter().next().expect("just checked len") } else { serde_json::Value::Array(urls) },
            );
        }
        links.insert(platform.clone(), serde_json::Value::Object(platform_links));
    }
    json!({"syndication_links": links})
}

/// `GET /api/interactions/{id}` (spec §4.N).
#[get("")]
async fn get_interactions(
    request: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, HttpError> {
    let id = path.into_inner();
    validate_post_id(&id)?;
    check_referrer(&request, &state)?;

    let ip = real_ip(&request);
    if !state.rate_limiter.allow_request(&ip, state.config.security.rate_limit_per_minute) {
        return Err(HttpError::RateLimited);
    }

    let interactions = Arc::clone(&state.interactions);
    let lookup_id = id.clone();
    if let Some(record) = blocking(move || interactions.get_interactions(&lookup_id)).await? {
        return Ok(HttpResponse::Ok().json(record));
    }

    let mappings = Arc::clone(&state.mappings);
    let lookup_id = id.clone();
    if let Some(mapping) = blocking(move || mappings.get_mapping(&lookup_id)).await? {
        return Ok(HttpResponse::Ok().json(syndication_links(&mapping)));
    }

    let allowed = state.rate_limiter.allow_discovery(
        &id,
        state.config.security.discovery_cooldown_seconds,
        state.config.security.discovery_rate_limit_per_minute,
    );
    if !allowed {
        return Ok(HttpResponse::NotFound().json(empty_skeleton()));
    }

    let Some(ghost) = &state.ghost_content_api else {
        return Ok(HttpResponse::NotFound().json(empty_skeleton()));
    };
    let Ok(post_url) = ghost.resolve_post_url(&id).await else {
        return Ok(HttpResponse::NotFound().json(empty_skeleton()));
    };

    let found = discover_mapping(&state.clients, &state.mappings, &id, &post_url).await;
    if !found {
        return Ok(HttpResponse::NotFound().json(empty_skeleton()));
    }

    let mappings = Arc::clone(&state.mappings);
    let lookup_id = id.clone();
    let title = blocking(move || mappings.get_mapping(&lookup_id))
        .await
        .ok()
        .flatten()
        .map(|m| m.ghost_post_url)
        .unwrap_or_default();
    let record = sync_post_interactions(
        &state.clients,
        &state.mappings,
        &state.interactions,
        state.notifier.as_deref(),
        &id,
        &title,
    )
    .await?;
    Ok(HttpResponse::Ok().json(record))
}

/// `POST /api/interactions/{id}/sync` (spec §4.N): protected by
/// `X-Internal-Token`, enqueues a manual sync.
#[post("/sync")]
async fn trigger_sync(
    request: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, HttpError> {
    let id = path.into_inner();
    validate_post_id(&id)?;

    let Some(expected) = state.config.security.internal_api_token.as_deref() else {
        return Err(HttpError::NotConfigured("internal_api_token"));
    };
    let provided = request
        .headers()
        .get("X-Internal-Token")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if provided != expected {
        return Err(HttpError::AuthError("invalid internal token"));
    }

    state.scheduler.trigger_manual_sync(id).await;
    Ok(HttpResponse::Accepted().json(json!({"status": "enqueued"})))
}
