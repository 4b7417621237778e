use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use serde::Deserialize;
use serde_json::Value;

use super::{check_word, parse_body, require_write, AppState};
use crate::error::ApiError;
use crate::keys::COLLECTION_MAP_KEY;
use crate::models::{data_field, CollectionMap, ConfigEntryResponse, ConfigWriteResponse};
use crate::utils::{current_time, success_response};

const WRITE_CONTEXT: &str = "Failed to store configuration";

pub async fn read(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    check_word(&key, "config key")?;

    let data = state
        .cache
        .config(&key)
        .await
        .map_err(ApiError::store("Failed to read configuration"))?
        .ok_or_else(|| ApiError::not_found_bare(format!("No configuration found for key: {key}")))?;

    Ok(success_response(&ConfigEntryResponse { key, data }))
}

/// Overwrite a config entry verbatim. `config/collections` is the GraphQL
/// collection map.
pub async fn write(
    State(state): State<AppState>,
    Path(key): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    require_write(&state, &headers)?;
    check_word(&key, "config key")?;

    let body = parse_body(&body, WRITE_CONTEXT)?;
    let data = data_field(&body)
        .ok_or_else(|| ApiError::bad_request(r#"Request body must contain "data" field"#))?;
    if key == COLLECTION_MAP_KEY {
        check_collection_map(data)?;
    }

    state
        .cache
        .put_config(&key, data)
        .await
        .map_err(ApiError::store(WRITE_CONTEXT))?;
    tracing::info!(%key, "stored configuration");

    Ok(success_response(&ConfigWriteResponse {
        success: true,
        key,
        timestamp: current_time(),
    }))
}

/// Every GraphQL read and `/status` decode the collection map, so a map of
/// the wrong shape is refused before it is stored.
fn check_collection_map(data: &Value) -> Result<(), ApiError> {
    CollectionMap::deserialize(data).map(drop).map_err(|err| {
        ApiError::bad_request_with_hint(
            format!("Invalid collection mapping: {err}"),
            r#"Expected an object of GraphQL query name to collection id, e.g. {"Posts": "posts"}"#,
        )
    })
}
