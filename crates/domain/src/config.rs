//! Configuration management

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_REQUEST_TIMEOUT_SECS;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub registry: RegistryConfig,
    pub server: ServerConfig,
    pub scheduler: SchedulerSettings,
    pub payments: PaymentsConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

/// Outbound registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base URL of the case registry API, without the `/cases` suffix.
    pub base_url: String,
    /// OAuth2 token endpoint.
    pub token_url: String,
    pub client_id: String,
    /// Usually supplied via environment, so absent from config files.
    #[serde(default, skip_serializing)]
    pub client_secret: String,
    /// Externally reachable base URL the registry posts callbacks to.
    pub callback_base_url: String,
    /// Fixed timeout for every outbound call, in seconds.
    pub timeout_seconds: u64,
}

/// Inbound HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Base URL under which attachment download links are built.
    pub public_base_url: String,
    /// Bearer token the registry must present to download attachments.
    /// Usually supplied via environment, so absent from config files.
    #[serde(default, skip_serializing)]
    pub download_token: String,
}

/// Scheduled reconciliation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    pub enabled: bool,
    pub cron_expression: String,
    /// Maximum number of candidates processed per request type per run.
    pub item_limit: usize,
}

/// Payment handling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentsConfig {
    /// When enabled, accepted decisions promote due pending installments.
    pub staged_payments_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig { path: "casebridge.db".to_string(), pool_size: 8 },
            registry: RegistryConfig {
                base_url: "http://localhost:8080".to_string(),
                token_url: "http://localhost:8080/oauth/token".to_string(),
                client_id: String::new(),
                client_secret: String::new(),
                callback_base_url: "http://localhost:3000".to_string(),
                timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECS,
            },
            server: ServerConfig {
                bind_addr: "127.0.0.1:3000".to_string(),
                public_base_url: "http://localhost:3000".to_string(),
                download_token: String::new(),
            },
            scheduler: SchedulerSettings {
                enabled: false,
                cron_expression: "0 */30 * * * *".to_string(), // every 30 minutes
                item_limit: 50,
            },
            payments: PaymentsConfig { staged_payments_enabled: false },
        }
    }
}
