//! Read and write gates.
//!
//! Reads are gated on where the request comes from (`Origin`, then
//! `Referer`); writes on a bearer token. The two never combine: an
//! authenticated write is accepted from any origin.

use axum::http::header::{AUTHORIZATION, ORIGIN, REFERER};
use axum::http::HeaderMap;
use regex::RegexSet;
use subtle::ConstantTimeEq;
use url::Url;

use crate::error::ConfigError;

/// What to do with a read that carries neither `Origin` nor `Referer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingOriginPolicy {
    /// Server-to-server callers (CI, curl) send no browser headers.
    #[default]
    Allow,
    Deny,
}

impl std::str::FromStr for MissingOriginPolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "allow" => Ok(Self::Allow),
            "deny" => Ok(Self::Deny),
            _ => Err(ConfigError::InvalidValue {
                name: "MISSING_ORIGIN_POLICY",
                value: value.to_string(),
            }),
        }
    }
}

/// Origin allowlist compiled once from regular expressions.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: RegexSet,
    missing: MissingOriginPolicy,
}

impl OriginPolicy {
    pub fn new<I, S>(patterns: I, missing: MissingOriginPolicy) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns: Vec<String> = patterns
            .into_iter()
            .map(|p| p.as_ref().trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        // Compile individually first so the error names the bad pattern.
        for pattern in &patterns {
            regex::Regex::new(pattern).map_err(|source| ConfigError::OriginPattern {
                pattern: pattern.clone(),
                source,
            })?;
        }
        let allowed = RegexSet::new(&patterns).map_err(|source| ConfigError::OriginPattern {
            pattern: patterns.join(","),
            source,
        })?;
        Ok(Self { allowed, missing })
    }

    pub fn missing_origin(&self) -> MissingOriginPolicy {
        self.missing
    }

    pub fn is_allowed_origin(&self, origin: &str) -> bool {
        self.allowed.is_match(origin)
    }

    /// `Origin` decides when present; otherwise the origin of `Referer`;
    /// otherwise the missing-origin policy.
    pub fn is_request_allowed(&self, headers: &HeaderMap) -> bool {
        if let Some(origin) = headers.get(ORIGIN) {
            return origin
                .to_str()
                .map(|o| self.is_allowed_origin(o))
                .unwrap_or(false);
        }

        if let Some(referer) = headers.get(REFERER) {
            return referer
                .to_str()
                .ok()
                .and_then(|r| Url::parse(r).ok())
                .map(|url| self.is_allowed_origin(&url.origin().ascii_serialization()))
                .unwrap_or(false);
        }

        self.missing == MissingOriginPolicy::Allow
    }
}

/// The token of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Exact match against the configured secret. No secret configured means
/// nothing is authorized.
pub fn is_authorized(headers: &HeaderMap, secret: Option<&str>) -> bool {
    match (bearer_token(headers), secret) {
        (Some(token), Some(secret)) if !secret.is_empty() => {
            token.as_bytes().ct_eq(secret.as_bytes()).into()
        }
        _ => false,
    }
}
