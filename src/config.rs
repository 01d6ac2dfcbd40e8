//! Configuration file parser.
//!
//! The config is a small TOML file naming the receiver endpoint, the poll
//! interval, and the feed list. Unlike most knobs, the file itself is
//! required — there is nothing useful to do without an endpoint. Unknown
//! keys are ignored with a warning.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::util::validate_url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("endpoint must be set and non-empty")]
    MissingEndpoint,

    #[error("Invalid interval {0:?}: {1}")]
    InvalidInterval(String, String),
}

/// Daemon configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be
/// specified; `endpoint` is validated separately since its default (empty)
/// is not a usable value.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Receiver endpoint events are POSTed to. Required, non-empty.
    pub endpoint: String,

    /// Poll interval as a duration string ("90s", "30m", "1h30m").
    pub interval: String,

    /// Feed URLs, polled in this order each cycle.
    pub feeds: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            interval: "30m".to_string(),
            feeds: Vec::new(),
        }
    }
}

impl Config {
    /// Loads and validates configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// - Missing/unreadable file → `ConfigError::Io`
    /// - Invalid TOML → `ConfigError::Parse` with line number info
    /// - Empty `endpoint` → `ConfigError::MissingEndpoint`
    /// - Unparseable `interval` → `ConfigError::InvalidInterval`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;

        // Detect unknown keys for typo warnings; serde itself ignores them
        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = ["endpoint", "interval", "feeds"];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        config.validate()?;
        tracing::info!(
            path = %path.display(),
            endpoint = %config.endpoint,
            feeds = config.feeds.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::MissingEndpoint);
        }
        self.interval()?;

        // A bad feed URL is not fatal — it will fail at fetch time and be
        // skipped like any other fetch failure — but it is worth flagging.
        for feed_url in &self.feeds {
            if let Err(e) = validate_url(feed_url) {
                tracing::warn!(url = %feed_url, error = %e, "Feed URL looks invalid");
            }
        }
        Ok(())
    }

    /// The poll interval as a concrete duration.
    pub fn interval(&self) -> Result<Duration, ConfigError> {
        let interval = parse_duration(&self.interval)
            .map_err(|e| ConfigError::InvalidInterval(self.interval.clone(), e))?;
        if interval.is_zero() {
            return Err(ConfigError::InvalidInterval(
                self.interval.clone(),
                "interval must be positive".to_string(),
            ));
        }
        Ok(interval)
    }
}

/// Parses a Go-style duration string: one or more `<number><unit>` pairs
/// with units `s`, `m`, `h`, e.g. `"90s"`, `"30m"`, `"1h30m"`.
fn parse_duration(text: &str) -> Result<Duration, String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("empty duration".to_string());
    }

    let mut total = Duration::ZERO;
    let mut digits = String::new();

    for c in text.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let value: u64 = digits
            .parse()
            .map_err(|_| format!("missing number before {c:?}"))?;
        digits.clear();
        let secs_per_unit = match c {
            's' => 1,
            'm' => 60,
            'h' => 3600,
            _ => return Err(format!("unknown unit {c:?}")),
        };
        total += Duration::from_secs(value.saturating_mul(secs_per_unit));
    }

    if !digits.is_empty() {
        return Err(format!("missing unit after {digits:?}"));
    }
    Ok(total)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(name: &str, content: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("notifeed_config_test_{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_full_config() {
        let path = write_config(
            "full",
            r#"
endpoint = "https://receiver.example.com/events"
interval = "5m"
feeds = ["https://blog.example.com/feed.xml", "https://other.example.com/atom"]
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.endpoint, "https://receiver.example.com/events");
        assert_eq!(config.interval().unwrap(), Duration::from_secs(300));
        assert_eq!(config.feeds.len(), 2);
    }

    #[test]
    fn test_interval_defaults_to_thirty_minutes() {
        let path = write_config("default_interval", "endpoint = \"https://r/events\"\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.interval, "30m");
        assert_eq!(config.interval().unwrap(), Duration::from_secs(1800));
    }

    #[test]
    fn test_feeds_default_empty() {
        let path = write_config("default_feeds", "endpoint = \"https://r/events\"\n");
        let config = Config::load(&path).unwrap();
        assert!(config.feeds.is_empty());
    }

    #[test]
    fn test_missing_file_is_error() {
        let result = Config::load(Path::new("/tmp/notifeed_test_nonexistent.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_missing_endpoint_is_fatal() {
        let path = write_config("no_endpoint", "interval = \"10m\"\n");
        let result = Config::load(&path);
        assert!(matches!(result, Err(ConfigError::MissingEndpoint)));
    }

    #[test]
    fn test_blank_endpoint_is_fatal() {
        let path = write_config("blank_endpoint", "endpoint = \"   \"\n");
        let result = Config::load(&path);
        assert!(matches!(result, Err(ConfigError::MissingEndpoint)));
    }

    #[test]
    fn test_invalid_toml() {
        let path = write_config("bad_toml", "this is not [valid toml");
        let result = Config::load(&path);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_bad_interval_is_fatal() {
        let path = write_config(
            "bad_interval",
            "endpoint = \"https://r/events\"\ninterval = \"soon\"\n",
        );
        let result = Config::load(&path);
        assert!(matches!(result, Err(ConfigError::InvalidInterval(_, _))));
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let path = write_config(
            "unknown_keys",
            "endpoint = \"https://r/events\"\ntotally_fake_key = 42\n",
        );
        let config = Config::load(&path).unwrap();
        assert_eq!(config.endpoint, "https://r/events");
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("30m").unwrap(), Duration::from_secs(1800));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("1h30m15s").unwrap(), Duration::from_secs(5415));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("30").is_err());
        assert!(parse_duration("m").is_err());
        assert!(parse_duration("30x").is_err());
        assert!(parse_duration("half an hour").is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = Config {
            endpoint: "https://r/events".to_string(),
            interval: "0s".to_string(),
            feeds: Vec::new(),
        };
        assert!(matches!(
            config.interval(),
            Err(ConfigError::InvalidInterval(_, _))
        ));
    }
}
