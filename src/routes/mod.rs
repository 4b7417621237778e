use std::sync::Arc;

use axum::body::Bytes;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Router;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::auth::is_authorized;
use crate::cache::CacheStorage;
use crate::config::GatewayConfig;
use crate::error::ApiError;

pub mod config;
pub mod graphql;
pub mod health;
pub mod legacy;
pub mod not_found;
pub mod refresh;
pub mod status;
pub mod v2;

#[derive(Clone)]
pub struct AppState {
    pub cache: CacheStorage,
    pub config: Arc<GatewayConfig>,
}

pub fn router(state: AppState) -> Router {
    use not_found::method_not_allowed;

    Router::new()
        .route("/health", get(health::handle).fallback(method_not_allowed))
        .route("/status", get(status::handle).fallback(method_not_allowed))
        .route(
            "/api/graphql",
            post(graphql::handle).fallback(method_not_allowed),
        )
        .route(
            "/config/:key",
            get(config::read).post(config::write).fallback(method_not_allowed),
        )
        .route(
            "/refresh/:collection",
            post(refresh::handle).fallback(method_not_allowed),
        )
        .route(
            "/cache/:collection",
            get(legacy::read).fallback(method_not_allowed),
        )
        .route("/v2/:collection", get(v2::list).fallback(method_not_allowed))
        .route(
            "/v2/:collection/:id",
            get(v2::single).fallback(method_not_allowed),
        )
        .route(
            "/v2/refresh/:collection",
            post(v2::refresh).fallback(method_not_allowed),
        )
        .fallback(not_found::handle)
        .with_state(state)
}

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("valid regex"));
static V2_COLLECTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z-]+$").expect("valid regex"));

fn check_segment(value: &str, pattern: &Regex, what: &str, allowed: &str) -> Result<(), ApiError> {
    if pattern.is_match(value) {
        Ok(())
    } else {
        Err(ApiError::bad_request_with_hint(
            format!("Invalid {what}: {value}"),
            format!("{what} may only contain {allowed}"),
        ))
    }
}

/// Config keys and v1 collection names: ASCII word characters.
pub(crate) fn check_word(value: &str, what: &str) -> Result<(), ApiError> {
    check_segment(value, &WORD, what, "letters, digits and underscores")
}

pub(crate) fn check_v2_collection(value: &str) -> Result<(), ApiError> {
    check_segment(
        value,
        &V2_COLLECTION,
        "collection name",
        "lowercase letters and hyphens",
    )
}

pub(crate) fn require_write(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    if is_authorized(headers, state.config.write_api_key.as_deref()) {
        Ok(())
    } else {
        tracing::warn!("rejected write without a valid CACHE_API_KEY");
        Err(ApiError::Unauthorized(
            "Unauthorized - valid CACHE_API_KEY required",
        ))
    }
}

pub(crate) fn require_read(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    if state.config.origins.is_request_allowed(headers) {
        Ok(())
    } else {
        tracing::warn!(origin = ?headers.get("origin"), "rejected read from disallowed origin");
        Err(ApiError::Forbidden("Forbidden - origin not allowed"))
    }
}

/// Request bodies are parsed by hand so a syntax error surfaces as a 500
/// carrying the parser message, not as a framework rejection.
pub(crate) fn parse_body(body: &Bytes, context: &'static str) -> Result<Value, ApiError> {
    serde_json::from_slice(body).map_err(ApiError::malformed(context))
}
