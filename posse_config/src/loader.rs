use thiserror::Error;

use crate::config::Config;
use crate::secrets::resolve_file_secrets;
use posse_utils::datetime::resolve_timezone;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Read(String, std::io::Error),
    #[error("invalid YAML in config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("storage directory does not exist: {0}")]
    StorageDirMissing(String),
}

/// Loads and validates the single YAML config document, resolving any
/// `*_file` secret references first. Missing optional sections fall back to
/// their defaults; only a handful of structural problems (unreadable file,
/// invalid YAML, missing storage directory) are treated as fatal, matching
/// the reference config loader's fail-fast startup style.
pub fn load_config() -> Result<Config, ConfigError> {
    dotenvy::from_filename(".env.local").ok();
    dotenvy::dotenv().ok();
    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned());
    load_config_from_path(&config_path)
}

pub fn load_config_from_path(config_path: &str) -> Result<Config, ConfigError> {
    let raw = std::fs::read_to_string(config_path)
        .map_err(|e| ConfigError::Read(config_path.to_owned(), e))?;

    let mut document: serde_yaml::Value = serde_yaml::from_str(&raw)?;
    resolve_file_secrets(&mut document);

    let mut config: Config = serde_yaml::from_value(document)?;
    config.config_path = config_path.to_owned();

    if !config.storage_dir.exists() {
        return Err(ConfigError::StorageDirMissing(
            config.storage_dir.display().to_string(),
        ));
    }

    // Validated once at startup; an invalid zone just warns and the
    // service proceeds on UTC (spec §4.A).
    let resolved = resolve_timezone(&config.timezone);
    config.timezone = resolved.name().to_owned();

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_from_path_missing_file() {
        let err = load_config_from_path("/no/such/config.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Read(_, _)));
    }

    #[test]
    fn test_load_config_invalid_timezone_falls_back() {
        let dir = std::env::temp_dir().join(format!("posse-cfg-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let config_path = dir.join("config.yaml");
        std::fs::write(
            &config_path,
            format!(
                "storage_dir: {}\ntimezone: Not/AZone\n",
                dir.display(),
            ),
        )
        .unwrap();

        let config = load_config_from_path(config_path.to_str().unwrap()).unwrap();
        assert_eq!(config.timezone, "UTC");

        std::fs::remove_dir_all(&dir).ok();
    }
}
