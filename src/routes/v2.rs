use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use serde_json::Value;

use super::{check_v2_collection, parse_body, require_read, require_write, AppState};
use crate::error::ApiError;
use crate::models::{data_field, PageParams, PageResponse, RefreshResponse};
use crate::utils::success_response;

const REFRESH_CONTEXT: &str = "Failed to store v2 cache data";

/// `GET /v2/:collection?page=&limit=`: paginate the cached `docs` array.
pub async fn list(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    params: Option<Query<PageParams>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    require_read(&state, &headers)?;
    check_v2_collection(&collection)?;

    let (page, limit) = params.map(|Query(p)| p).unwrap_or_default().resolve();

    let data = state
        .cache
        .v2_collection(&collection)
        .await
        .map_err(ApiError::store("Failed to process v2 list request"))?
        .ok_or_else(|| {
            ApiError::not_found(
                format!("No cached data for v2 collection: {collection}"),
                "Cache may need to be refreshed",
            )
        })?;

    tracing::debug!(%collection, page, limit, "served v2 list");
    Ok(success_response(&PageResponse::slice(&data, page, limit)))
}

/// `GET /v2/:collection/:id`. The id is the percent-decoded path segment,
/// looked up as-is: any id the refresh indexed is reachable here.
pub async fn single(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    require_read(&state, &headers)?;
    check_v2_collection(&collection)?;

    let doc = state
        .cache
        .v2_document(&collection, &id)
        .await
        .map_err(ApiError::store("Failed to process v2 single document request"))?
        .ok_or_else(|| {
            ApiError::not_found(
                format!("Document not found: {collection}/{id}"),
                "Document may not exist or cache needs refresh",
            )
        })?;

    Ok(success_response(&doc))
}

/// `POST /v2/refresh/:collection`: store the list payload and index each
/// document under its own key.
pub async fn refresh(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    require_write(&state, &headers)?;
    check_v2_collection(&collection)?;

    let body = parse_body(&body, REFRESH_CONTEXT)?;
    let data = data_field(&body)
        .filter(|data| data.get("docs").is_some_and(|docs| !docs.is_null()))
        .ok_or_else(|| {
            ApiError::bad_request(
                r#"Request body must contain "data.docs" field (paginated response)"#,
            )
        })?;
    let docs = match data.get("docs") {
        Some(Value::Array(docs)) => docs,
        _ => return Err(ApiError::bad_request(r#""data.docs" must be an array"#)),
    };

    let written = state
        .cache
        .put_v2_collection(&collection, data, docs)
        .await
        .map_err(ApiError::store(REFRESH_CONTEXT))?;
    tracing::info!(
        %collection,
        doc_count = docs.len(),
        indexed = written.indexed,
        skipped = written.skipped,
        "refreshed v2 collection"
    );

    Ok(success_response(&RefreshResponse {
        success: true,
        collection,
        metadata: written.metadata,
    }))
}
