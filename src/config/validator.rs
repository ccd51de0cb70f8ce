use std::collections::HashSet;
use std::time::Duration;

use log::warn;

use crate::error::{AppError, Result};

use super::{Config, API_KEY_VAR, API_SECRET_VAR};

const RECOMMENDED_TIMEOUT: (Duration, Duration) = (Duration::from_secs(8), Duration::from_secs(15));

/// Validate the runtime configuration and surface every problem at once.
pub fn validate_config(config: &Config) -> Result<()> {
    let mut issues = Vec::new();

    validate_credentials(config, &mut issues);
    validate_durations(config, &mut issues);
    validate_upstream(config, &mut issues);
    validate_networks(config, &mut issues);

    if issues.is_empty() {
        Ok(())
    } else {
        Err(AppError::message(format!(
            "configuration invalid:\n  - {}",
            issues.join("\n  - ")
        )))
    }
}

fn validate_credentials(config: &Config, issues: &mut Vec<String>) {
    if config.credentials.is_none() {
        issues.push(format!(
            "{API_KEY_VAR} and {API_SECRET_VAR} must both be set"
        ));
    }
}

fn validate_durations(config: &Config, issues: &mut Vec<String>) {
    let cache = &config.cache;
    if cache.freshness_window.is_zero() {
        issues.push("cache freshness window must be greater than zero".to_string());
    }
    if cache.fetch_timeout.is_zero() {
        issues.push("fetch timeout must be greater than zero".to_string());
    }
    if config.refresh_interval.is_zero() {
        issues.push("refresh interval must be greater than zero".to_string());
    }

    let (low, high) = RECOMMENDED_TIMEOUT;
    if !cache.fetch_timeout.is_zero() && (cache.fetch_timeout < low || cache.fetch_timeout > high) {
        warn!(
            "Fetch timeout {:?} is outside the recommended {:?}..={:?}",
            cache.fetch_timeout, low, high
        );
    }
}

fn validate_upstream(config: &Config, issues: &mut Vec<String>) {
    let base_url = config.base_url.trim();
    if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
        issues.push(format!(
            "upstream base URL `{base_url}` must start with http:// or https://"
        ));
    }
}

fn validate_networks(config: &Config, issues: &mut Vec<String>) {
    let tables = &config.networks;
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();

    for network in &tables.allowed_networks {
        let id = network.trim().to_uppercase();
        if id.is_empty() {
            issues.push("allowedNetworks contains a blank entry".to_string());
            continue;
        }
        if !seen.insert(id.clone()) {
            duplicates.push(id);
        }
    }

    if !duplicates.is_empty() {
        duplicates.sort();
        issues.push(format!(
            "allowedNetworks contains duplicates: {}",
            duplicates.join(", ")
        ));
    }

    if tables.allowed_networks.is_empty() {
        warn!("allowedNetworks is empty, every network will be exposed");
    }

    for (network, label) in &tables.display_names {
        if label.trim().is_empty() {
            issues.push(format!("display name for `{network}` must not be empty"));
        }
        if !seen.is_empty() && !seen.contains(&network.trim().to_uppercase()) {
            warn!("Display name configured for `{network}`, which is not an allowed network");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkTables;
    use crate::fetch::Credentials;

    fn valid_config() -> Config {
        let mut config = Config::builtin();
        config.credentials = Some(Credentials::new("key", "secret"));
        config
    }

    #[test]
    fn accepts_builtin_config_with_credentials() {
        validate_config(&valid_config()).expect("config should be valid");
    }

    #[test]
    fn rejects_missing_credentials() {
        let err = validate_config(&Config::builtin()).expect_err("validation should fail");
        assert!(
            err.to_string().contains(API_KEY_VAR),
            "unexpected error message: {err}"
        );
    }

    #[test]
    fn rejects_zero_durations() {
        let mut config = valid_config();
        config.cache.freshness_window = Duration::ZERO;
        config.refresh_interval = Duration::ZERO;

        let message = validate_config(&config).unwrap_err().to_string();
        assert!(message.contains("freshness window"), "unexpected error message: {message}");
        assert!(message.contains("refresh interval"), "unexpected error message: {message}");
    }

    #[test]
    fn rejects_duplicate_networks() {
        let mut config = valid_config();
        config.networks = NetworkTables {
            allowed_networks: vec!["trx".to_string(), "TRX".to_string(), "ETH".to_string()],
            display_names: Default::default(),
        };

        let message = validate_config(&config).unwrap_err().to_string();
        assert!(message.contains("duplicates: TRX"), "unexpected error message: {message}");
    }

    #[test]
    fn rejects_non_http_base_url() {
        let mut config = valid_config();
        config.base_url = "ftp://api.example.test".to_string();

        let message = validate_config(&config).unwrap_err().to_string();
        assert!(message.contains("base URL"), "unexpected error message: {message}");
    }
}
