use std::sync::Arc;

use posse_adapters::RateLimiter;
use posse_config::Config;
use posse_models::interactions::InteractionStore;
use posse_models::mappings::MappingStore;
use posse_models::replies::ReplyStore;
use posse_models::webmentions::WebmentionStore;
use posse_services::ghost_content_api::GhostContentApiClient;
use posse_services::notifications::PushoverNotifier;
use posse_services::social::SocialClient;
use posse_services::webmention::WebmentionSender;
use posse_workers::{Dispatcher, Scheduler};

/// Everything a request handler needs, assembled once at startup and
/// shared behind `web::Data` across every worker thread.
pub struct AppState {
    pub config: Config,
    pub mappings: Arc<MappingStore>,
    pub interactions: Arc<InteractionStore>,
    pub webmentions: Arc<WebmentionStore>,
    pub replies: Arc<ReplyStore>,
    pub clients: Vec<Arc<dyn SocialClient>>,
    pub dispatcher: Arc<Dispatcher>,
    pub scheduler: Arc<Scheduler>,
    pub rate_limiter: Arc<RateLimiter>,
    pub notifier: Option<Arc<PushoverNotifier>>,
    pub webmention_sender: Arc<WebmentionSender>,
    pub ghost_content_api: Option<Arc<GhostContentApiClient>>,
    pub http: reqwest::Client,
}
