use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use iotgw_core::history::DEFAULT_HISTORY_CAPACITY;
use iotgw_core::{CoreError, RuleSet};
use serde::Deserialize;

use crate::ws::KeepaliveConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address for both listeners (default: `0.0.0.0`).
    pub host: String,
    /// Port of the ingestion listener (default: `8080`).
    pub data_port: u16,
    /// Port of the live-feed listener (default: `8081`).
    pub ui_port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Shared secret required in `X-API-Key` on ingestion. Unset disables
    /// the check.
    pub api_key: Option<String>,
    /// Location of the threshold rules file.
    pub rules_path: PathBuf,
    /// Number of points kept in the history buffer.
    pub history_capacity: usize,
    pub keepalive: KeepaliveConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                 |
    /// |------------------------|-------------------------|
    /// | `HOST`                 | `0.0.0.0`               |
    /// | `DATA_PORT`            | `8080`                  |
    /// | `UI_PORT`              | `8081`                  |
    /// | `CORS_ORIGINS`         | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                    |
    /// | `GATEWAY_API_KEY`      | unset                   |
    /// | `RULES_PATH`           | `rules.json`            |
    /// | `HISTORY_CAPACITY`     | `100`                   |
    /// | `WS_WRITE_WAIT_SECS`   | `10`                    |
    /// | `WS_PONG_WAIT_SECS`    | `60`                    |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let api_key = std::env::var("GATEWAY_API_KEY")
            .ok()
            .filter(|key| !key.is_empty());

        let rules_path = std::env::var("RULES_PATH")
            .unwrap_or_else(|_| "rules.json".into())
            .into();

        let keepalive = KeepaliveConfig {
            write_wait: Duration::from_secs(env_or("WS_WRITE_WAIT_SECS", 10)),
            pong_wait: Duration::from_secs(env_or("WS_PONG_WAIT_SECS", 60)),
        };
        assert!(
            !keepalive.ping_period().is_zero(),
            "WS_PONG_WAIT_SECS must be at least 1"
        );

        Self {
            host,
            data_port: env_or("DATA_PORT", 8080),
            ui_port: env_or("UI_PORT", 8081),
            cors_origins,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30),
            api_key,
            rules_path,
            history_capacity: env_or("HISTORY_CAPACITY", DEFAULT_HISTORY_CAPACITY),
            keepalive,
        }
    }
}

/// Read `key` and parse it, falling back to `default` when unset.
///
/// Panics on a value that does not parse; misconfiguration fails at
/// startup.
fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} has invalid value '{raw}': {e}")),
        Err(_) => default,
    }
}

/// Failure to load the rules file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read rules file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("rules file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    InvalidRule(#[from] CoreError),
}

#[derive(Debug, Deserialize)]
struct RuleBounds {
    min: f64,
    max: f64,
}

/// Load threshold rules from the JSON file at `path`.
///
/// The file maps metric names to bounds:
///
/// ```json
/// { "temperature": { "min": -10.0, "max": 40.0 } }
/// ```
///
/// A missing file yields an empty rule set so the gateway can run without
/// alerting.
pub fn load_rules(path: &Path) -> Result<RuleSet, ConfigError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "Rules file not found, anomaly detection disabled");
            return Ok(RuleSet::new());
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    parse_rules(&text)
}

/// Parse the rules document; see [`load_rules`] for the format.
pub fn parse_rules(json: &str) -> Result<RuleSet, ConfigError> {
    let bounds: HashMap<String, RuleBounds> = serde_json::from_str(json)?;
    let rules = RuleSet::from_bounds(
        bounds
            .into_iter()
            .map(|(metric, bounds)| (metric, (bounds.min, bounds.max))),
    )?;
    Ok(rules)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
