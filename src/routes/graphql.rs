use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use serde_json::{Map, Value};

use super::{parse_body, AppState};
use crate::auth::is_authorized;
use crate::error::{ApiError, GraphqlError};
use crate::graphql::extract_collection_name;
use crate::mapping::resolve_collection;
use crate::models::GraphqlRequest;
use crate::utils::success_response;

const CONTEXT: &str = "Failed to process GraphQL request";
const QUERY_HINT: &str =
    "Query must follow pattern: query { CollectionName(...) { docs { ... } } }";

/// Serve a cached collection in the shape the CMS GraphQL endpoint would:
/// `{"data": {"<QueryName>": <payload>}}`.
pub async fn handle(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GraphqlError> {
    if let Some(secret) = state.config.graphql_api_key.as_deref() {
        if !is_authorized(&headers, Some(secret)) {
            tracing::warn!("rejected GraphQL read without a valid GRAPHQL_API_KEY");
            return Err(
                ApiError::Unauthorized("Unauthorized - valid GRAPHQL_API_KEY required").into(),
            );
        }
    }

    let body = parse_body(&body, CONTEXT)?;

    // An unconfigured mapping fails every query the same way.
    let map = state
        .cache
        .collection_map()
        .await
        .map_err(ApiError::store(CONTEXT))?;
    if map.is_empty() {
        return Err(ApiError::MappingNotConfigured.into());
    }

    let request: GraphqlRequest =
        serde_json::from_value(body).map_err(ApiError::malformed(CONTEXT))?;
    let query = request
        .query
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing query in request body"))?;

    let graphql_name = extract_collection_name(&query).ok_or_else(|| {
        ApiError::bad_request_with_hint("Could not parse collection from query", QUERY_HINT)
    })?;
    let collection = resolve_collection(&map, &graphql_name)?;

    let data = state
        .cache
        .collection(&collection)
        .await
        .map_err(ApiError::store(CONTEXT))?
        .ok_or_else(|| {
            ApiError::not_found(
                format!("No cached data for collection: {graphql_name}"),
                "Cache may need to be refreshed",
            )
        })?;

    tracing::debug!(%graphql_name, %collection, "served GraphQL read from cache");
    let mut fields = Map::new();
    fields.insert(graphql_name, data);
    let mut envelope = Map::new();
    envelope.insert("data".to_string(), Value::Object(fields));
    Ok(success_response(&Value::Object(envelope)))
}
