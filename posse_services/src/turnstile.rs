use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

const VERIFY_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";
const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Deserialize)]
struct TurnstileResponse {
    success: bool,
}

/// Verifies a Cloudflare Turnstile token against the siteverify endpoint,
/// per spec §4.M. Any transport or parse failure counts as a failed
/// verification rather than propagating an error, matching the original
/// fail-closed behavior.
pub async fn verify_turnstile(http: &reqwest::Client, token: &str, client_ip: &str, secret_key: &str) -> bool {
    let body = json!({
        "secret": secret_key,
        "response": token,
        "remoteip": client_ip,
    });

    let result = http
        .post(VERIFY_URL)
        .timeout(VERIFY_TIMEOUT)
        .json(&body)
        .send()
        .await;

    match result {
        Ok(response) => response
            .json::<TurnstileResponse>()
            .await
            .map(|parsed| parsed.success)
            .unwrap_or(false),
        Err(err) => {
            log::error!("turnstile verification request failed: {err}");
            false
        }
    }
}
