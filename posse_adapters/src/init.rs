use posse_config::{load_config, Config, ConfigError};

use crate::logger::configure_logger;

/// Loads the config and brings up logging, mirroring the teacher's
/// single startup entry point. Database/service wiring stays in the
/// binary crate, which owns the async runtime.
pub fn initialize_app() -> Result<Config, ConfigError> {
    let config = load_config()?;
    configure_logger(config.log_level);
    log::info!("config loaded from {}", config.config_path);
    Ok(config)
}
