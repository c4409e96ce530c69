//! Configuration file loading and saving.
//!
//! Resolution order for the config path: explicit path, then
//! `RELAYGATE_CONFIG`, then `~/.relaygate/config.json`. A missing file at the
//! default location yields defaults; a missing file that was asked for
//! explicitly is an error.

use std::fs;
use std::path::{Path, PathBuf};

use relaygate_types::{ConfigError, RelayConfig};

use crate::error::{AppError, AppResult};

const DATA_DIR: &str = ".relaygate";
const CONFIG_FILE: &str = "config.json";

/// Env var naming an explicit config file.
pub const CONFIG_ENV: &str = "RELAYGATE_CONFIG";

/// `~/.relaygate`, created on first use.
pub fn get_data_dir() -> AppResult<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| {
        AppError::Config(ConfigError::NotFound { path: "<home directory>".to_string() })
    })?;
    let data_dir = home.join(DATA_DIR);
    if !data_dir.exists() {
        fs::create_dir_all(&data_dir)?;
    }
    Ok(data_dir)
}

/// Path that `load_config(None)` reads from.
pub fn default_config_path() -> AppResult<PathBuf> {
    if let Ok(custom) = std::env::var(CONFIG_ENV) {
        if !custom.trim().is_empty() {
            return Ok(PathBuf::from(custom));
        }
    }
    Ok(get_data_dir()?.join(CONFIG_FILE))
}

/// Load and validate the relay config.
pub fn load_config(explicit: Option<&Path>) -> AppResult<RelayConfig> {
    let (path, required) = match explicit {
        Some(p) => (p.to_path_buf(), true),
        None => {
            let from_env = std::env::var(CONFIG_ENV).map(|v| !v.trim().is_empty()).unwrap_or(false);
            (default_config_path()?, from_env)
        },
    };

    if !path.exists() {
        if required {
            return Err(ConfigError::NotFound { path: path.display().to_string() }.into());
        }
        tracing::debug!("No config at {}, using defaults", path.display());
        let config = RelayConfig::default();
        config.check()?;
        return Ok(config);
    }

    load_config_from(&path)
}

/// Parse and validate a specific file.
pub fn load_config_from(path: &Path) -> AppResult<RelayConfig> {
    let content = fs::read_to_string(path)?;
    let config: RelayConfig =
        serde_json::from_str(&content).map_err(|e| ConfigError::from_json_error(&e))?;
    config.check()?;
    tracing::debug!(
        "Loaded config from {} ({} credentials, max_attempts={})",
        path.display(),
        config.pool.credentials.len(),
        config.retry.max_attempts
    );
    Ok(config)
}

/// Write the config atomically (temp file + rename).
pub fn save_config(path: &Path, config: &RelayConfig) -> AppResult<()> {
    config.check()?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::from_io_error(&e))?;
        }
    }

    let temp_path = path.with_extension("json.tmp");
    let json_str = serde_json::to_string_pretty(config)?;
    fs::write(&temp_path, json_str).map_err(|e| ConfigError::from_io_error(&e))?;
    fs::rename(&temp_path, path).map_err(|e| ConfigError::from_io_error(&e))?;
    Ok(())
}
