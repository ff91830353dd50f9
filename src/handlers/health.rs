use actix_web::{get, post, web, HttpRequest, HttpResponse, Scope};
use serde::Serialize;
use serde_json::json;

use crate::errors::HttpError;
use crate::state::AppState;

pub fn health_scope() -> Scope {
    web::scope("").service(health).service(healthcheck)
}

#[get("/health")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({"status": "healthy"}))
}

#[derive(Serialize)]
struct ServiceStatus {
    healthy: bool,
    detail: Option<String>,
}

/// Internal deep healthcheck (spec §4.N). Fails closed with 503 when no
/// internal API token is configured, same as the manual-sync endpoint.
#[post("/healthcheck")]
async fn healthcheck(request: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, HttpError> {
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

    let mut services = serde_json::Map::new();
    let mut overall_healthy = true;

    for client in &state.clients {
        if !client.is_enabled() {
            continue;
        }
        let key = format!("{}:{}", client.platform(), client.account_name());
        let status = match client.verify_credentials().await {
            Ok(()) => ServiceStatus { healthy: true, detail: None },
            Err(err) => {
                overall_healthy = false;
                ServiceStatus { healthy: false, detail: Some(err.to_string()) }
            }
        };
        services.insert(key, serde_json::to_value(status).unwrap_or(serde_json::Value::Null));
    }

    if let Some(notifier) = &state.notifier {
        let status = match notifier.test_ping().await {
            Ok(()) => ServiceStatus { healthy: true, detail: None },
            Err(err) => {
                overall_healthy = false;
                ServiceStatus { healthy: false, detail: Some(err.to_string()) }
            }
        };
        services.insert("pushover".to_owned(), serde_json::to_value(status).unwrap_or(serde_json::Value::Null));
    }

    Ok(HttpResponse::Ok().json(json!({
        "status": if overall_healthy { "healthy" } else { "degraded" },
        "services": services,
    })))
}
