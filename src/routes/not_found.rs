use axum::http::StatusCode;
use axum::response::Response;
use serde_json::json;

use crate::error::ApiError;
use crate::utils::json_response;

pub const AVAILABLE_ENDPOINTS: &[&str] = &[
    "GET /health",
    "GET /status",
    "POST /api/graphql (v1 GraphQL)",
    "GET /config/:key",
    "POST /config/:key",
    "POST /refresh/:collection (v1)",
    "GET /cache/:collection (v1 legacy)",
    "GET /v2/:collection (v2 REST list)",
    "GET /v2/:collection/:id (v2 REST single)",
    "POST /v2/refresh/:collection (v2)",
];

pub async fn handle() -> Response {
    json_response(
        StatusCode::NOT_FOUND,
        &json!({
            "error": "Not found",
            "availableEndpoints": AVAILABLE_ENDPOINTS,
        }),
    )
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
