use crate::config::types::{Config, ControlConfig};
use crate::config::validation::validate;
use crate::session::ControlAuth;
use crate::{ConfigError, ConfigResult};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use darkline::config::load_config;
///
/// let config = load_config(Path::new("darkline.toml")).unwrap();
/// println!("Crawl delay: {}ms", config.crawler.crawl_delay_ms);
/// ```
pub fn load_config(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at start-up so stored records can be traced back to the
/// keyword table that produced them.
pub fn compute_config_hash(path: &Path) -> ConfigResult<String> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> ConfigResult<(Config, String)> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Resolves the control-port credential described by the configuration
///
/// Cookie files are read here so the session layer only ever sees the
/// credential bytes.
pub fn read_control_auth(control: &ControlConfig) -> ConfigResult<ControlAuth> {
    match (&control.password, &control.cookie_path) {
        (Some(_), Some(_)) => Err(ConfigError::Validation(
            "control section accepts either password or cookie-path, not both".to_string(),
        )),
        (Some(password), None) => Ok(ControlAuth::Password(password.clone())),
        (None, Some(path)) => {
            let cookie = std::fs::read(path)?;
            if cookie.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "control cookie file '{}' is empty",
                    path
                )));
            }
            Ok(ControlAuth::Cookie(cookie))
        }
        (None, None) => Ok(ControlAuth::None),
    }
}
