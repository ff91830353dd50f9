mod db;
mod errors;
mod h_entry;
mod handlers;
mod http;
mod server;
mod state;

use std::sync::Arc;

use posse_adapters::{initialize_app, RateLimiter};
use posse_models::interactions::InteractionStore;
use posse_models::mappings::MappingStore;
use posse_models::replies::ReplyStore;
use posse_models::webmentions::WebmentionStore;
use posse_services::ghost_content_api::GhostContentApiClient;
use posse_services::image_cache::ImageCache;
use posse_services::llm::LlmClient;
use posse_services::notifications::PushoverNotifier;
use posse_services::social::{Bluesky, Mastodon, SocialClient};
use posse_services::webmention::WebmentionSender;
use posse_workers::scheduler::SchedulerConfig;
use posse_workers::{Dispatcher, Scheduler};

use crate::state::AppState;

/// Builds every enabled `Mastodon`/`Bluesky` client and verifies
/// credentials up front, per spec §4.D.
async fn build_social_clients(config: &posse_config::Config) -> Vec<Arc<dyn SocialClient>> {
    let mut clients: Vec<Arc<dyn SocialClient>> = Vec::new();

    for account in &config.mastodon.accounts {
        if !account.enabled {
            continue;
        }
        let client = Arc::new(Mastodon::new(
            account.name.clone(),
            account.instance_url.clone(),
            account.access_token.clone().unwrap_or_default(),
            account.tags.clone(),
            account.max_post_length,
            account.split_multi_image_posts,
        ));
        client.initialize().await;
        clients.push(client);
    }

    for account in &config.bluesky.accounts {
        if !account.enabled {
            continue;
        }
        let credential = account
            .app_password
            .clone()
            .or_else(|| account.access_token.clone())
            .unwrap_or_default();
        let client = Arc::new(Bluesky::new(
            account.name.clone(),
            account.instance_url.clone(),
            account.handle.clone(),
            credential,
            account.tags.clone(),
            account.max_post_length,
            account.split_multi_image_posts,
        ));
        client.initialize().await;
        clients.push(client);
    }

    clients
}

fn build_notifier(config: &posse_config::Config) -> Option<Arc<PushoverNotifier>> {
    if !config.pushover.enabled {
        return None;
    }
    let app_token = config.pushover.app_token.clone()?;
    let user_key = config.pushover.user_key.clone()?;
    Some(Arc::new(PushoverNotifier::new(app_token, user_key)))
}

fn build_llm_client(config: &posse_config::Config) -> Option<Arc<LlmClient>> {
    if !config.llm.enabled {
        return None;
    }
    let url = config.llm.url.clone()?;
    let base_url = match config.llm.port {
        Some(port) => format!("{url}:{port}"),
        None => url,
    };
    Some(Arc::new(LlmClient::new(base_url, config.llm.timeout)))
}

fn build_ghost_content_api(config: &posse_config::Config) -> Option<Arc<GhostContentApiClient>> {
    let api = &config.ghost.content_api;
    let url = api.url.clone()?;
    let key = api.key.clone().unwrap_or_default();
    Some(Arc::new(GhostContentApiClient::new(url, key, api.version.clone(), api.timeout)))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = initialize_app().expect("failed to load configuration");

    let pool = posse_models::init_pool(&config.interactions_db_path()).expect("failed to open interactions database");
    let storage_root = config.storage_dir.clone();

    let mappings = Arc::new(MappingStore::new(pool.clone(), storage_root.clone()));
    let interactions = Arc::new(InteractionStore::new(pool.clone(), storage_root));
    let webmentions = Arc::new(WebmentionStore::new(pool.clone()));
    let replies = Arc::new(ReplyStore::new(pool));

    let image_cache = Arc::new(ImageCache::new(std::env::temp_dir().join("posse_image_cache")));
    let llm = build_llm_client(&config);
    let notifier = build_notifier(&config);
    let ghost_content_api = build_ghost_content_api(&config);

    let clients = build_social_clients(&config).await;

    let dispatcher = Arc::new(Dispatcher::new(clients.clone(), Arc::clone(&image_cache), llm.clone(), Arc::clone(&mappings)));

    let heartbeat_interval_minutes = if config.interactions.enabled {
        config.interactions.sync_interval_minutes
    } else {
        0
    };
    let scheduler = Scheduler::new(
        clients.clone(),
        Arc::clone(&mappings),
        Arc::clone(&interactions),
        notifier.clone(),
        SchedulerConfig {
            max_post_age_days: config.interactions.max_post_age_days,
            heartbeat_interval_minutes,
        },
    );
    let handles = scheduler.start();
    log::info!("interaction scheduler started ({} workers)", handles.workers.len());

    let state = AppState {
        config,
        mappings,
        interactions,
        webmentions,
        replies,
        clients,
        dispatcher,
        scheduler,
        rate_limiter: Arc::new(RateLimiter::new()),
        notifier,
        webmention_sender: Arc::new(WebmentionSender::new()),
        ghost_content_api,
        http: reqwest::Client::new(),
    };

    server::run_server(state).await
}
