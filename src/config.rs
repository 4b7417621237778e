use std::str::FromStr;

use tracing::Level;

use crate::auth::{MissingOriginPolicy, OriginPolicy};
use crate::error::ConfigError;

pub const DEFAULT_KV_BINDING: &str = "GRAPHQL_CACHE";

pub const DEFAULT_ALLOWED_ORIGINS: &[&str] =
    &[r"^http://localhost(:\d+)?$", r"^http://127\.0\.0\.1(:\d+)?$"];

/// Collections the v2 REST cache reports on in `/status`.
pub const DEFAULT_V2_COLLECTIONS: &[&str] = &[
    "posts",
    "working-notes",
    "photography",
    "historic-posts",
    "pages",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidValue {
                name: "LOG_FORMAT",
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggingSettings {
    pub level: Level,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Compact,
        }
    }
}

/// Immutable per-deployment settings, built once and shared by every request.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub kv_binding: String,
    /// `CACHE_API_KEY`: bearer secret for every write endpoint.
    pub write_api_key: Option<String>,
    /// `GRAPHQL_API_KEY`: when set, `/api/graphql` requires it.
    pub graphql_api_key: Option<String>,
    pub origins: OriginPolicy,
    pub v2_collections: Vec<String>,
    pub logging: LoggingSettings,
}

impl GatewayConfig {
    /// Build from a variable lookup. Missing or blank values take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| trimmed(lookup(name));

        let missing = var("MISSING_ORIGIN_POLICY")
            .map(|v| v.parse::<MissingOriginPolicy>())
            .transpose()?
            .unwrap_or_default();
        let origins = match var("ALLOWED_ORIGINS") {
            Some(list) => OriginPolicy::new(split_list(&list), missing)?,
            None => OriginPolicy::new(DEFAULT_ALLOWED_ORIGINS, missing)?,
        };

        let v2_collections = var("V2_COLLECTIONS")
            .map(|list| split_list(&list))
            .unwrap_or_else(|| DEFAULT_V2_COLLECTIONS.iter().map(|c| c.to_string()).collect());

        let level = match var("LOG_LEVEL") {
            Some(raw) => Level::from_str(&raw).map_err(|_| ConfigError::InvalidValue {
                name: "LOG_LEVEL",
                value: raw,
            })?,
            None => Level::INFO,
        };
        let format = var("LOG_FORMAT")
            .map(|v| v.parse::<LogFormat>())
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            kv_binding: var("KV_BINDING").unwrap_or_else(|| DEFAULT_KV_BINDING.to_string()),
            write_api_key: var("CACHE_API_KEY"),
            graphql_api_key: var("GRAPHQL_API_KEY"),
            origins,
            v2_collections,
            logging: LoggingSettings { level, format },
        })
    }

    pub fn with_write_key(mut self, key: impl Into<String>) -> Self {
        self.write_api_key = Some(key.into());
        self
    }

    pub fn with_graphql_key(mut self, key: impl Into<String>) -> Self {
        self.graphql_api_key = Some(key.into());
        self
    }

    pub fn with_origins(mut self, origins: OriginPolicy) -> Self {
        self.origins = origins;
        self
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None).expect("built-in defaults are valid")
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<GatewayConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GatewayConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.kv_binding, "GRAPHQL_CACHE");
        assert_eq!(cfg.write_api_key, None);
        assert_eq!(cfg.graphql_api_key, None);
        assert_eq!(cfg.v2_collections.len(), 5);
        assert_eq!(cfg.origins.missing_origin(), MissingOriginPolicy::Allow);
        assert!(cfg.origins.is_allowed_origin("http://localhost:4000"));
        assert!(cfg.origins.is_allowed_origin("http://127.0.0.1"));
        assert_eq!(cfg.logging, LoggingSettings::default());
    }

    #[test]
    fn blank_secrets_count_as_unset() {
        let cfg = config(&[("CACHE_API_KEY", "  "), ("GRAPHQL_API_KEY", "")]).unwrap();
        assert_eq!(cfg.write_api_key, None);
        assert_eq!(cfg.graphql_api_key, None);
    }

    #[test]
    fn overrides() {
        let cfg = config(&[
            ("CACHE_API_KEY", "write"),
            ("GRAPHQL_API_KEY", "read"),
            ("ALLOWED_ORIGINS", r"^https://example\.net$, ^https://cms\.example\.net$"),
            ("MISSING_ORIGIN_POLICY", "deny"),
            ("V2_COLLECTIONS", "posts,notes"),
            ("LOG_LEVEL", "debug"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();
        assert_eq!(cfg.write_api_key.as_deref(), Some("write"));
        assert_eq!(cfg.graphql_api_key.as_deref(), Some("read"));
        assert!(cfg.origins.is_allowed_origin("https://cms.example.net"));
        assert!(!cfg.origins.is_allowed_origin("http://localhost"));
        assert_eq!(cfg.origins.missing_origin(), MissingOriginPolicy::Deny);
        assert_eq!(cfg.v2_collections, vec!["posts", "notes"]);
        assert_eq!(cfg.logging.level, Level::DEBUG);
        assert_eq!(cfg.logging.format, LogFormat::Json);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(config(&[("MISSING_ORIGIN_POLICY", "sometimes")]).is_err());
        assert!(config(&[("ALLOWED_ORIGINS", "(")]).is_err());
        assert!(config(&[("LOG_LEVEL", "loud")]).is_err());
        assert!(config(&[("LOG_FORMAT", "xml")]).is_err());
    }
}
