use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;

use super::{check_word, parse_body, require_write, AppState};
use crate::error::ApiError;
use crate::models::{data_field, RefreshResponse};
use crate::utils::success_response;

const CONTEXT: &str = "Failed to store cache data";

/// v1 write-through: replace `collection:<name>` and its metadata.
pub async fn handle(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    require_write(&state, &headers)?;
    check_word(&collection, "collection name")?;

    let body = parse_body(&body, CONTEXT)?;
    let data = data_field(&body)
        .ok_or_else(|| ApiError::bad_request(r#"Request body must contain "data" field"#))?;

    let metadata = state
        .cache
        .put_collection(&collection, data)
        .await
        .map_err(ApiError::store(CONTEXT))?;
    tracing::info!(
        %collection,
        doc_count = ?metadata.doc_count,
        total_docs = ?metadata.total_docs,
        "refreshed v1 collection"
    );

    Ok(success_response(&RefreshResponse {
        success: true,
        collection,
        metadata,
    }))
}
