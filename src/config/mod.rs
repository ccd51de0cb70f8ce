use std::time::Duration;

use crate::cache::{CacheSettings, DEFAULT_FETCH_TIMEOUT, DEFAULT_FRESHNESS_WINDOW};
use crate::error::{AppError, Result};
use crate::fetch::binance::DEFAULT_BASE_URL;
use crate::fetch::Credentials;
use crate::services::NetworkPolicy;

pub mod loader;
pub mod validator;

pub use loader::{load_network_tables, NetworkTables, DEFAULT_NETWORKS_FILE};
pub use validator::validate_config;

pub const API_KEY_VAR: &str = "BINANCE_API_KEY";
pub const API_SECRET_VAR: &str = "BINANCE_API_SECRET";
pub const BASE_URL_VAR: &str = "BINANCE_BASE_URL";
pub const HOST_VAR: &str = "HOST";
pub const PORT_VAR: &str = "PORT";
pub const CACHE_TTL_VAR: &str = "FEE_CACHE_TTL_SECS";
pub const FETCH_TIMEOUT_VAR: &str = "FEE_FETCH_TIMEOUT_SECS";
pub const REFRESH_INTERVAL_VAR: &str = "FEE_REFRESH_INTERVAL_SECS";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Runtime configuration for the proxy.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub base_url: String,
    pub credentials: Option<Credentials>,
    pub cache: CacheSettings,
    pub refresh_interval: Duration,
    pub networks: NetworkTables,
}

impl Config {
    /// Defaults with the builtin network tables and no credentials.
    pub fn builtin() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            base_url: DEFAULT_BASE_URL.to_string(),
            credentials: None,
            cache: CacheSettings {
                freshness_window: DEFAULT_FRESHNESS_WINDOW,
                fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            },
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            networks: NetworkTables::builtin(),
        }
    }

    pub fn from_env(networks: NetworkTables) -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok(), networks)
    }

    /// Build the config from any variable source; unset or blank variables keep their defaults.
    pub fn from_lookup<F>(lookup: F, networks: NetworkTables) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::builtin();
        config.networks = networks;

        if let Some(host) = var(HOST_VAR) {
            config.host = host;
        }
        if let Some(port) = var(PORT_VAR) {
            config.port = parse_var(PORT_VAR, &port)?;
        }
        if let Some(base_url) = var(BASE_URL_VAR) {
            config.base_url = base_url;
        }
        if let Some(secs) = var(CACHE_TTL_VAR) {
            config.cache.freshness_window = Duration::from_secs(parse_var(CACHE_TTL_VAR, &secs)?);
        }
        if let Some(secs) = var(FETCH_TIMEOUT_VAR) {
            config.cache.fetch_timeout = Duration::from_secs(parse_var(FETCH_TIMEOUT_VAR, &secs)?);
        }
        if let Some(secs) = var(REFRESH_INTERVAL_VAR) {
            config.refresh_interval = Duration::from_secs(parse_var(REFRESH_INTERVAL_VAR, &secs)?);
        }

        config.credentials = match (var(API_KEY_VAR), var(API_SECRET_VAR)) {
            (Some(key), Some(secret)) => Some(Credentials::new(key, secret)),
            _ => None,
        };

        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn network_policy(&self) -> NetworkPolicy {
        NetworkPolicy::new(
            &self.networks.allowed_networks,
            self.networks.display_names.clone(),
        )
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        AppError::message(format!(
            "Environment variable {name} has invalid value `{value}`"
        ))
    })
}
