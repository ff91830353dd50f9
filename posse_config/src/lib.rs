mod config;
mod loader;
mod secrets;
mod sections;

pub use config::Config;
pub use loader::{load_config, ConfigError};
pub use sections::{
    BlueskyAccountConfig,
    ContentApiConfig,
    CorsConfig,
    GhostConfig,
    InteractionsConfig,
    LlmConfig,
    MastodonAccountConfig,
    PushoverConfig,
    SecurityConfig,
    WebmentionConfig,
    WebmentionReplyConfig,
    WebmentionTargetConfig,
};

pub const SOFTWARE_NAME: &str = "posse";
pub const SOFTWARE_VERSION: &str = env!("CARGO_PKG_VERSION");
