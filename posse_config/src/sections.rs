use serde::Deserialize;

fn default_true() -> bool { true }

#[derive(Clone, Debug, Deserialize, Default)]
pub struct CorsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub origins: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct SecurityConfig {
    pub webhook_secret: Option<String>,
    pub internal_api_token: Option<String>,
    #[serde(default)]
    pub allowed_referrers: Vec<String>,
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,
    #[serde(default = "default_discovery_rate_limit_per_minute")]
    pub discovery_rate_limit_per_minute: u32,
    #[serde(default = "default_discovery_cooldown_seconds")]
    pub discovery_cooldown_seconds: i64,
    /// Salt mixed into `sha256(ip + ":" + salt)` when pseudonymizing reply
    /// submitter IPs (spec §3 Reply.ip_hash). Unset falls back to a fixed
    /// default with a startup warning, since an unhashed/unsalted IP is
    /// never stored either way.
    pub ip_hash_salt: Option<String>,
}

fn default_rate_limit_per_minute() -> u32 { 60 }
fn default_discovery_rate_limit_per_minute() -> u32 { 10 }
fn default_discovery_cooldown_seconds() -> i64 { 300 }

#[derive(Clone, Debug, Deserialize, Default)]
pub struct PushoverConfig {
    #[serde(default)]
    pub enabled: bool,
    pub app_token: Option<String>,
    pub user_key: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct MastodonAccountConfig {
    pub name: String,
    pub instance_url: String,
    pub access_token: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_max_post_length_mastodon")]
    pub max_post_length: usize,
    #[serde(default)]
    pub split_multi_image_posts: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_max_post_length_mastodon() -> usize { 500 }

#[derive(Clone, Debug, Deserialize, Default)]
pub struct BlueskyAccountConfig {
    pub name: String,
    pub instance_url: String,
    pub handle: String,
    pub app_password: Option<String>,
    pub access_token: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_max_post_length_bluesky")]
    pub max_post_length: usize,
    #[serde(default)]
    pub split_multi_image_posts: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_max_post_length_bluesky() -> usize { 300 }

#[derive(Clone, Debug, Deserialize, Default)]
pub struct LlmConfig {
    #[serde(default)]
    pub enabled: bool,
    pub url: Option<String>,
    pub port: Option<u16>,
    #[serde(default = "default_llm_timeout")]
    pub timeout: u64,
}

fn default_llm_timeout() -> u64 { 30 }

#[derive(Clone, Debug, Deserialize)]
pub struct InteractionsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_sync_interval_minutes")]
    pub sync_interval_minutes: u64,
    #[serde(default = "default_max_post_age_days")]
    pub max_post_age_days: i64,
    #[serde(default = "default_cache_directory")]
    pub cache_directory: String,
}

fn default_sync_interval_minutes() -> u64 { 30 }
fn default_max_post_age_days() -> i64 { 30 }
fn default_cache_directory() -> String { "./data".to_owned() }

impl Default for InteractionsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sync_interval_minutes: default_sync_interval_minutes(),
            max_post_age_days: default_max_post_age_days(),
            cache_directory: default_cache_directory(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct WebmentionTargetConfig {
    pub name: String,
    pub endpoint: String,
    pub target: String,
    pub tag: Option<String>,
    #[serde(default = "default_webmention_timeout")]
    pub timeout: u64,
}

fn default_webmention_timeout() -> u64 { 15 }

#[derive(Clone, Debug, Deserialize, Default)]
pub struct WebmentionConfig {
    #[serde(default)]
    pub receiver_enabled: bool,
    #[serde(default)]
    pub targets: Vec<WebmentionTargetConfig>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct WebmentionReplyConfig {
    #[serde(default)]
    pub enabled: bool,
    pub blog_name: Option<String>,
    #[serde(default)]
    pub allowed_target_origins: Vec<String>,
    #[serde(default = "default_reply_rate_limit")]
    pub rate_limit: u32,
    #[serde(default = "default_reply_rate_limit_window")]
    pub rate_limit_window_seconds: i64,
    pub turnstile_site_key: Option<String>,
    pub turnstile_secret_key: Option<String>,
}

fn default_reply_rate_limit() -> u32 { 5 }
fn default_reply_rate_limit_window() -> i64 { 3600 }

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ContentApiConfig {
    pub url: Option<String>,
    pub key: Option<String>,
    #[serde(default = "default_content_api_version")]
    pub version: String,
    #[serde(default = "default_content_api_timeout")]
    pub timeout: u64,
}

fn default_content_api_version() -> String { "v5.0".to_owned() }
fn default_content_api_timeout() -> u64 { 10 }

#[derive(Clone, Debug, Deserialize, Default)]
pub struct GhostConfig {
    /// The blog's public origin, e.g. `https://blog.example.com`. Required
    /// for the webmention receiver to validate that an incoming `target`
    /// actually belongs to this blog (spec §4.L).
    pub blog_url: Option<String>,
    #[serde(default)]
    pub content_api: ContentApiConfig,
}
