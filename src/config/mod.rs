//! Configuration management for OpsGate Core

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Slack Web API configuration
    pub slack: SlackConfig,
    /// Where the structured policy is read from
    pub policy: PolicySourceConfig,
    /// Decision engine tuning
    pub engine: EngineConfig,
    /// Logging and metrics
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone)]
pub struct SlackConfig {
    /// Base URL of the Web API (e.g., https://slack.com/api)
    pub api_url: String,
    /// Bot token; without one the Slack directory and notifier are disabled
    pub bot_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PolicySourceConfig {
    /// Structured policy file (TOML, YAML or JSON by extension)
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Lifetime of handle and group-membership cache entries
    pub cache_ttl_secs: u64,
    /// Deadline applied to the directory calls of one permission check
    pub directory_timeout_ms: u64,
}

impl EngineConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn directory_timeout(&self) -> Duration {
        Duration::from_millis(self.directory_timeout_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: crate::cache::ttl::DIRECTORY_SECS,
            directory_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// "pretty" or "json"
    pub log_format: String,
    pub metrics_enabled: bool,
    /// Listen address of the Prometheus scrape endpoint
    pub metrics_addr: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_addr: "0.0.0.0:9464".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            slack: SlackConfig {
                api_url: var("SLACK_API_URL", "https://slack.com/api"),
                bot_token: lookup("SLACK_BOT_TOKEN").filter(|token| !token.trim().is_empty()),
            },
            policy: PolicySourceConfig {
                path: PathBuf::from(var("RBAC_CONFIG_PATH", "rbac.toml")),
            },
            engine: EngineConfig {
                cache_ttl_secs: var("RBAC_CACHE_TTL_SECS", "300")
                    .parse()
                    .context("Invalid RBAC_CACHE_TTL_SECS")?,
                directory_timeout_ms: var("RBAC_DIRECTORY_TIMEOUT_MS", "5000")
                    .parse()
                    .context("Invalid RBAC_DIRECTORY_TIMEOUT_MS")?,
            },
            telemetry: TelemetryConfig {
                log_format: var("LOG_FORMAT", "pretty"),
                metrics_enabled: parse_bool(lookup("METRICS_ENABLED").as_deref(), false),
                metrics_addr: var("METRICS_ADDR", "0.0.0.0:9464"),
            },
        })
    }
}

/// `true`/`false` flag parsing, case-insensitive; anything else is the default
pub fn parse_bool(value: Option<&str>, default: bool) -> bool {
    match value.map(|v| v.trim().to_lowercase()) {
        Some(v) if v == "true" => true,
        Some(v) if v == "false" => false,
        _ => default,
    }
}

/// Split a comma-separated list, dropping blanks
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(|item| item.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.slack.api_url, "https://slack.com/api");
        assert!(config.slack.bot_token.is_none());
        assert_eq!(config.policy.path, PathBuf::from("rbac.toml"));
        assert_eq!(config.engine.cache_ttl_secs, 300);
        assert_eq!(config.engine.directory_timeout(), Duration::from_secs(5));
        assert_eq!(config.telemetry.log_format, "pretty");
        assert!(!config.telemetry.metrics_enabled);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("SLACK_API_URL", "http://localhost:9000/api"),
            ("SLACK_BOT_TOKEN", "xoxb-test"),
            ("RBAC_CONFIG_PATH", "/etc/opsgate/rbac.yaml"),
            ("RBAC_CACHE_TTL_SECS", "60"),
            ("RBAC_DIRECTORY_TIMEOUT_MS", "250"),
            ("LOG_FORMAT", "json"),
            ("METRICS_ENABLED", "TRUE"),
        ]))
        .unwrap();

        assert_eq!(config.slack.api_url, "http://localhost:9000/api");
        assert_eq!(config.slack.bot_token.as_deref(), Some("xoxb-test"));
        assert_eq!(config.policy.path, PathBuf::from("/etc/opsgate/rbac.yaml"));
        assert_eq!(config.engine.cache_ttl(), Duration::from_secs(60));
        assert_eq!(config.engine.directory_timeout(), Duration::from_millis(250));
        assert_eq!(config.telemetry.log_format, "json");
        assert!(config.telemetry.metrics_enabled);
    }

    #[test]
    fn test_blank_bot_token_is_ignored() {
        let config = Config::from_lookup(lookup_from(&[("SLACK_BOT_TOKEN", "  ")])).unwrap();
        assert!(config.slack.bot_token.is_none());
    }

    #[test]
    fn test_invalid_ttl_is_an_error() {
        let result = Config::from_lookup(lookup_from(&[("RBAC_CACHE_TTL_SECS", "soon")]));
        assert!(result.is_err());
        assert!(format!("{:#}", result.unwrap_err()).contains("RBAC_CACHE_TTL_SECS"));
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool(Some("true"), false));
        assert!(parse_bool(Some(" True "), false));
        assert!(!parse_bool(Some("false"), true));
        assert!(parse_bool(Some("yes"), true));
        assert!(!parse_bool(None, false));
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(
            parse_list("dba-team, devops-team,,"),
            vec!["dba-team".to_string(), "devops-team".to_string()]
        );
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_engine_config_default() {
        let config = EngineConfig::default();
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.directory_timeout_ms, 5000);
    }
}
