use std::path::Path;
use std::time::Duration;

use base64::Engine;
use serde::Deserialize;
use serde_json::json;

use crate::errors::ServiceError;

const ALT_TEXT_PROMPT: &str =
    "Describe this image in one concise sentence, suitable as alt text for accessibility.";

/// Client for the alt-text-generation LLM sidecar (spec §6 "LLM": `GET
/// /health`, `POST /infer`).
pub struct LlmClient {
    base_url: String,
    http: reqwest::Client,
}

impl LlmClient {
    pub fn new(base_url: impl Into<String>, timeout_seconds: u64) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout_seconds))
                .build()
                .expect("reqwest client builds with static config"),
        }
    }

    pub async fn health(&self) -> Result<(), ServiceError> {
        let response = self
            .http
            .get(format!("{}/health", self.base_url.trim_end_matches('/')))
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ServiceError::UnexpectedStatus {
                status: response.status().as_u16(),
                body: "llm health".to_owned(),
            })
        }
    }

    /// Generates a one-sentence alt-text description for the image at
    /// `local_path`, used to backfill empty alt text (spec §4.F step 5).
    pub async fn generate_alt_text(&self, local_path: &Path) -> Result<String, ServiceError> {
        let bytes = tokio::fs::read(local_path).await?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        let response = self
            .http
            .post(format!("{}/infer", self.base_url.trim_end_matches('/')))
            .json(&json!({ "image": encoded, "prompt": ALT_TEXT_PROMPT }))
            .send()
            .await?
            .error_for_status()?;
        let body: InferResponse = response.json().await?;
        Ok(body.text.trim().to_owned())
    }
}

#[derive(Debug, Deserialize)]
struct InferResponse {
    text: String,
}
