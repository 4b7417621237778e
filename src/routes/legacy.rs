use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;

use super::{check_word, require_read, AppState};
use crate::error::ApiError;
use crate::utils::success_response;

/// `GET /cache/:collection`: the raw v1 payload, for builds that predate the
/// GraphQL endpoint.
pub async fn read(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    require_read(&state, &headers)?;
    check_word(&collection, "collection name")?;

    let data = state
        .cache
        .collection(&collection)
        .await
        .map_err(ApiError::store("Failed to read cache data"))?
        .ok_or_else(|| {
            ApiError::not_found(
                format!("No cached data for collection: {collection}"),
                "Cache may need to be refreshed",
            )
        })?;

    Ok(success_response(&data))
}
