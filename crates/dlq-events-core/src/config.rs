//! Runtime configuration, resolved once before any batch is accepted.

use std::fmt;
use std::time::Duration;

/// Path appended to the platform base URL for event ingestion.
pub const INGEST_PATH: &str = "/api/v2/events/ingest";

/// Settings that shape how records become monitoring events and where they go.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Platform root, e.g. `https://abc123.live.dynatrace.com` (no trailing slash)
    pub ingest_base_url: String,
    /// Sent as `Authorization: Api-Token <token>`
    pub api_token: String,
    /// Used when a message does not name an entity selector itself
    pub default_entity_selector: Option<String>,
    /// Event type for events synthesized from raw message bodies
    pub default_event_type: String,
    pub default_timeout_ms: i64,
    /// Upper bound on title characters before the ellipsis marker
    pub title_max: usize,
    /// Key looked up in both the body and the message attributes
    pub original_queue_property: String,
    pub dlq_prefix: String,
    /// Also apply `default_entity_selector` to synthesized events
    pub raw_entity_selector: bool,
    pub http_timeout: Duration,
}

#[derive(Debug, PartialEq)]
pub enum ConfigError {
    Missing(&'static str),
    InvalidInteger { key: &'static str, value: String },
    InvalidBool { key: &'static str, value: String },
    InvalidUrl(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing required env var: {}", key),
            ConfigError::InvalidInteger { key, value } => {
                write!(f, "invalid int value for {}: {}", key, value)
            }
            ConfigError::InvalidBool { key, value } => {
                write!(f, "invalid bool value for {}: {}", key, value)
            }
            ConfigError::InvalidUrl(url) => {
                write!(f, "ingest URL must start with http:// or https://: {}", url)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated the same as unset ones, so `DT_ENTITY_SELECTOR=""`
    /// falls back to "no default selector".
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let ingest_base_url = required("DT_URL")?.trim_end_matches('/').to_string();
        if !ingest_base_url.starts_with("http://") && !ingest_base_url.starts_with("https://") {
            return Err(ConfigError::InvalidUrl(ingest_base_url));
        }

        Ok(Self {
            ingest_base_url,
            api_token: required("DT_TOKEN")?,
            default_entity_selector: get("DT_ENTITY_SELECTOR"),
            default_event_type: get("DT_EVENT_TYPE")
                .unwrap_or_else(|| "AVAILABILITY_EVENT".to_string()),
            default_timeout_ms: parse_int("DT_TIMEOUT_MS", get("DT_TIMEOUT_MS"), 0)?,
            title_max: parse_int("DT_TITLE_MAX", get("DT_TITLE_MAX"), 500)?,
            original_queue_property: get("DT_ORIGINAL_QUEUE_PROP")
                .unwrap_or_else(|| "originalQueueArn".to_string()),
            dlq_prefix: get("DT_DLQ_PREFIX")
                .map(|prefix| prefix.trim().to_string())
                .filter(|prefix| !prefix.is_empty())
                .unwrap_or_else(|| "[DQL]".to_string()),
            raw_entity_selector: parse_bool(
                "DT_RAW_ENTITY_SELECTOR",
                get("DT_RAW_ENTITY_SELECTOR"),
            )?,
            http_timeout: Duration::from_millis(parse_int(
                "DT_HTTP_TIMEOUT_MS",
                get("DT_HTTP_TIMEOUT_MS"),
                10_000,
            )?),
        })
    }

    /// Full URL events are POSTed to.
    pub fn ingest_url(&self) -> String {
        format!("{}{}", self.ingest_base_url, INGEST_PATH)
    }
}

fn parse_int<T: std::str::FromStr>(
    key: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidInteger { key, value: v }),
    }
}

fn parse_bool(key: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    let Some(value) = value else {
        return Ok(false);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "0" | "false" | "no" => Ok(false),
        "1" | "true" | "yes" => Ok(true),
        _ => Err(ConfigError::InvalidBool { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn applies_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("DT_URL", "https://abc123.live.dynatrace.com/"),
            ("DT_TOKEN", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.ingest_base_url, "https://abc123.live.dynatrace.com");
        assert_eq!(
            config.ingest_url(),
            "https://abc123.live.dynatrace.com/api/v2/events/ingest"
        );
        assert_eq!(config.default_entity_selector, None);
        assert_eq!(config.default_event_type, "AVAILABILITY_EVENT");
        assert_eq!(config.default_timeout_ms, 0);
        assert_eq!(config.title_max, 500);
        assert_eq!(config.original_queue_property, "originalQueueArn");
        assert_eq!(config.dlq_prefix, "[DQL]");
        assert!(!config.raw_entity_selector);
        assert_eq!(config.http_timeout, Duration::from_secs(10));
    }

    #[test]
    fn missing_token_is_an_error() {
        let err = Config::from_lookup(lookup(&[("DT_URL", "https://x")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DT_TOKEN"));
        assert_eq!(err.to_string(), "missing required env var: DT_TOKEN");
    }

    #[test]
    fn empty_url_counts_as_missing() {
        let err = Config::from_lookup(lookup(&[("DT_URL", ""), ("DT_TOKEN", "t")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DT_URL"));
    }

    #[test]
    fn rejects_bad_numbers_and_urls() {
        let err = Config::from_lookup(lookup(&[
            ("DT_URL", "https://x"),
            ("DT_TOKEN", "t"),
            ("DT_TITLE_MAX", "lots"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidInteger {
                key: "DT_TITLE_MAX",
                ..
            }
        ));

        let err =
            Config::from_lookup(lookup(&[("DT_URL", "ftp://x"), ("DT_TOKEN", "t")])).unwrap_err();
        assert_eq!(err, ConfigError::InvalidUrl("ftp://x".to_string()));
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DT_URL", "http://localhost:8080"),
            ("DT_TOKEN", "t"),
            ("DT_ENTITY_SELECTOR", "type(SERVICE)"),
            ("DT_TIMEOUT_MS", "15000"),
            ("DT_DLQ_PREFIX", "[DLQ]"),
            ("DT_RAW_ENTITY_SELECTOR", "true"),
        ]))
        .unwrap();

        assert_eq!(
            config.default_entity_selector.as_deref(),
            Some("type(SERVICE)")
        );
        assert_eq!(config.default_timeout_ms, 15_000);
        assert_eq!(config.dlq_prefix, "[DLQ]");
        assert!(config.raw_entity_selector);
    }

    #[test]
    fn dlq_prefix_is_trimmed() {
        let config = Config::from_lookup(lookup(&[
            ("DT_URL", "https://tenant.example.com"),
            ("DT_TOKEN", "secret"),
            ("DT_DLQ_PREFIX", " [DLQ] "),
        ]))
        .unwrap();
        assert_eq!(config.dlq_prefix, "[DLQ]");

        let once = crate::event::prefix_title_if_dlq("stuck", true, &config.dlq_prefix);
        let twice = crate::event::prefix_title_if_dlq(&once, true, &config.dlq_prefix);
        assert_eq!(once, "[DLQ] stuck");
        assert_eq!(once, twice);

        let config = Config::from_lookup(lookup(&[
            ("DT_URL", "https://tenant.example.com"),
            ("DT_TOKEN", "secret"),
            ("DT_DLQ_PREFIX", "   "),
        ]))
        .unwrap();
        assert_eq!(config.dlq_prefix, "[DQL]");
    }
}
