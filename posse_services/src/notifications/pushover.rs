use std::time::Duration;

use crate::errors::ServiceError;

const PUSHOVER_API_URL: &str = "https://api.pushover.net/1/messages.json";
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Pushover push-notification client. Used to notify the operator of new
/// replies (spec §4.H step 6) and to answer the `/healthcheck` endpoint's
/// low-priority test ping (spec §4.N).
pub struct PushoverNotifier {
    app_token: String,
    user_key: String,
    http: reqwest::Client,
}

impl PushoverNotifier {
    pub fn new(app_token: impl Into<String>, user_key: impl Into<String>) -> Self {
        Self {
            app_token: app_token.into(),
            user_key: user_key.into(),
            http: reqwest::Client::builder()
                .timeout(SEND_TIMEOUT)
                .build()
                .expect("reqwest client builds with static config"),
        }
    }

    pub async fn send(&self, title: &str, message: &str, priority: i8) -> Result<(), ServiceError> {
        let response = self
            .http
            .post(PUSHOVER_API_URL)
            .form(&[
                ("token", self.app_token.as_str()),
                ("user", self.user_key.as_str()),
                ("title", title),
                ("message", message),
                ("priority", &priority.to_string()),
            ])
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ServiceError::UnexpectedStatus {
                status: response.status().as_u16(),
                body: "pushover".to_owned(),
            })
        }
    }

    /// Notifies about a new reply discovered during interaction sync
    /// (spec §4.H).
    pub async fn notify_new_reply(&self, post_title: &str, author: &str, url: &str) -> Result<(), ServiceError> {
        self.send(
            "New reply",
            &format!("{author} replied to \"{post_title}\": {url}"),
            0,
        )
        .await
    }

    /// Low-priority test ping for the `/healthcheck` endpoint.
    pub async fn test_ping(&self) -> Result<(), ServiceError> {
        self.send("Health check", "posse healthcheck ping", -2).await
    }
}
