//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports TOML and JSON formats
//!
//! ## Environment Variables
//! Required:
//! - `CASEBRIDGE_DB_PATH`: database file path
//! - `CASEBRIDGE_REGISTRY_BASE_URL`: registry API base URL
//! - `CASEBRIDGE_TOKEN_URL`: OAuth2 token endpoint
//! - `CASEBRIDGE_CLIENT_ID` / `CASEBRIDGE_CLIENT_SECRET`: OAuth2 client
//! - `CASEBRIDGE_CALLBACK_BASE_URL`: externally reachable callback base
//!
//! Optional (defaults in parentheses):
//! - `CASEBRIDGE_DB_POOL_SIZE` (8)
//! - `CASEBRIDGE_TIMEOUT_SECONDS` (60)
//! - `CASEBRIDGE_BIND_ADDR` (127.0.0.1:3000)
//! - `CASEBRIDGE_PUBLIC_BASE_URL` (callback base URL)
//! - `CASEBRIDGE_DOWNLOAD_TOKEN` (empty, downloads disabled)
//! - `CASEBRIDGE_SCHEDULER_ENABLED` (false)
//! - `CASEBRIDGE_SCHEDULER_CRON` (every 30 minutes)
//! - `CASEBRIDGE_SCHEDULER_ITEM_LIMIT` (50)
//! - `CASEBRIDGE_STAGED_PAYMENTS` (false)

use std::path::{Path, PathBuf};

use casebridge_domain::{
    BridgeError, Config, DatabaseConfig, PaymentsConfig, RegistryConfig, Result,
    SchedulerSettings, ServerConfig,
};
use casebridge_domain::constants::DEFAULT_REQUEST_TIMEOUT_SECS;

/// Load configuration with automatic fallback strategy.
///
/// # Errors
/// Returns `BridgeError::Config` if configuration cannot be loaded from
/// either source.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "environment incomplete, trying config file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables.
///
/// # Errors
/// Returns `BridgeError::Config` if required variables are missing or
/// have invalid values.
pub fn load_from_env() -> Result<Config> {
    let defaults = Config::default();

    let db_path = env_var("CASEBRIDGE_DB_PATH")?;
    let pool_size = env_parse("CASEBRIDGE_DB_POOL_SIZE", defaults.database.pool_size)?;

    let base_url = env_var("CASEBRIDGE_REGISTRY_BASE_URL")?;
    let token_url = env_var("CASEBRIDGE_TOKEN_URL")?;
    let client_id = env_var("CASEBRIDGE_CLIENT_ID")?;
    let client_secret = env_var("CASEBRIDGE_CLIENT_SECRET")?;
    let callback_base_url = env_var("CASEBRIDGE_CALLBACK_BASE_URL")?;
    let timeout_seconds =
        env_parse("CASEBRIDGE_TIMEOUT_SECONDS", DEFAULT_REQUEST_TIMEOUT_SECS)?;

    let bind_addr = env_or("CASEBRIDGE_BIND_ADDR", &defaults.server.bind_addr);
    let public_base_url = env_or("CASEBRIDGE_PUBLIC_BASE_URL", &callback_base_url);
    let download_token = env_or("CASEBRIDGE_DOWNLOAD_TOKEN", "");

    let scheduler_enabled = env_bool("CASEBRIDGE_SCHEDULER_ENABLED", false);
    let cron_expression =
        env_or("CASEBRIDGE_SCHEDULER_CRON", &defaults.scheduler.cron_expression);
    let item_limit = env_parse("CASEBRIDGE_SCHEDULER_ITEM_LIMIT", defaults.scheduler.item_limit)?;

    let staged_payments_enabled = env_bool("CASEBRIDGE_STAGED_PAYMENTS", false);

    Ok(Config {
        database: DatabaseConfig { path: db_path, pool_size },
        registry: RegistryConfig {
            base_url,
            token_url,
            client_id,
            client_secret,
            callback_base_url,
            timeout_seconds,
        },
        server: ServerConfig { bind_addr, public_base_url, download_token },
        scheduler: SchedulerSettings {
            enabled: scheduler_enabled,
            cron_expression,
            item_limit,
        },
        payments: PaymentsConfig { staged_payments_enabled },
    })
}

/// Load configuration from a file.
///
/// If `path` is `None`, probes `config.toml`, `casebridge.toml`,
/// `config.json` and `casebridge.json` in the working directory and its
/// parent. Format is detected by extension.
///
/// # Errors
/// Returns `BridgeError::Config` when no file is found or parsing fails.
pub fn load_from_file(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => probe_config_paths().ok_or_else(|| {
            BridgeError::Config("no configuration file found".to_string())
        })?,
    };

    let raw = std::fs::read_to_string(&path).map_err(|err| {
        BridgeError::Config(format!("cannot read {}: {err}", path.display()))
    })?;

    let config = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&raw)
            .map_err(|err| BridgeError::Config(format!("invalid TOML: {err}")))?,
        Some("json") => serde_json::from_str(&raw)
            .map_err(|err| BridgeError::Config(format!("invalid JSON: {err}")))?,
        other => {
            return Err(BridgeError::Config(format!(
                "unsupported config extension: {other:?}"
            )))
        }
    };

    tracing::info!(path = %path.display(), "configuration loaded from file");
    Ok(config)
}

fn probe_config_paths() -> Option<PathBuf> {
    const NAMES: [&str; 4] = ["config.toml", "casebridge.toml", "config.json", "casebridge.json"];

    for dir in [".", ".."] {
        for name in NAMES {
            let candidate = Path::new(dir).join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

fn env_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| BridgeError::Config(format!("missing environment variable {name}")))
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|raw| matches!(raw.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| BridgeError::Config(format!("invalid value for {name}: {err}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn loads_a_complete_toml_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file created");
        write!(
            file,
            r#"
[database]
path = "bridge.db"
pool_size = 4

[registry]
base_url = "https://registry.example.com"
token_url = "https://registry.example.com/oauth/token"
client_id = "client"
client_secret = "secret"
callback_base_url = "https://bridge.example.com"
timeout_seconds = 30

[server]
bind_addr = "0.0.0.0:3000"
public_base_url = "https://bridge.example.com"
download_token = "download-secret"

[scheduler]
enabled = true
cron_expression = "0 */15 * * * *"
item_limit = 25

[payments]
staged_payments_enabled = true
"#
        )
        .expect("config written");

        let config = load_from_file(Some(file.path())).expect("config loads");
        assert_eq!(config.database.pool_size, 4);
        assert_eq!(config.registry.base_url, "https://registry.example.com");
        assert_eq!(config.scheduler.item_limit, 25);
        assert!(config.payments.staged_payments_enabled);
    }

    #[test]
    fn secrets_may_be_omitted_from_the_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file created");
        write!(
            file,
            r#"
[database]
path = "bridge.db"
pool_size = 4

[registry]
base_url = "https://registry.example.com"
token_url = "https://registry.example.com/oauth/token"
client_id = "client"
callback_base_url = "https://bridge.example.com"
timeout_seconds = 30

[server]
bind_addr = "0.0.0.0:3000"
public_base_url = "https://bridge.example.com"

[scheduler]
enabled = false
cron_expression = "0 */30 * * * *"
item_limit = 50

[payments]
staged_payments_enabled = false
"#
        )
        .expect("config written");

        let config = load_from_file(Some(file.path())).expect("config loads");
        assert!(config.registry.client_secret.is_empty());
        assert!(config.server.download_token.is_empty());
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let mut file = NamedTempFile::new().expect("temp file created");
        write!(file, "not a config").expect("written");

        let err = load_from_file(Some(file.path())).expect_err("load fails");
        assert!(matches!(err, BridgeError::Config(_)));
    }
}
