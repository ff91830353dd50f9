use std::path::PathBuf;

use log::Level as LogLevel;
use serde::Deserialize;

use crate::sections::{
    BlueskyAccountConfig,
    CorsConfig,
    GhostConfig,
    InteractionsConfig,
    LlmConfig,
    MastodonAccountConfig,
    PushoverConfig,
    SecurityConfig,
    WebmentionConfig,
    WebmentionReplyConfig,
};

fn default_log_level() -> LogLevel { LogLevel::Info }
fn default_timezone() -> String { "UTC".to_owned() }
fn default_http_host() -> String { "127.0.0.1".to_owned() }
fn default_http_port() -> u16 { 8080 }

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(skip)]
    pub config_path: String,

    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,

    #[serde(default = "default_timezone")]
    pub timezone: String,

    pub storage_dir: PathBuf,

    #[serde(default = "default_http_host")]
    pub http_host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub pushover: PushoverConfig,

    #[serde(default)]
    pub mastodon: MastodonSection,
    #[serde(default)]
    pub bluesky: BlueskySection,

    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub interactions: InteractionsConfig,
    #[serde(default)]
    pub webmention: WebmentionConfig,
    #[serde(default)]
    pub webmention_reply: WebmentionReplyConfig,
    #[serde(default)]
    pub ghost: GhostConfig,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct MastodonSection {
    #[serde(default)]
    pub accounts: Vec<MastodonAccountConfig>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct BlueskySection {
    #[serde(default)]
    pub accounts: Vec<BlueskyAccountConfig>,
}

impl Config {
    pub fn http_socket_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    pub fn interactions_db_path(&self) -> PathBuf {
        self.storage_dir.join("interactions.db")
    }
}
