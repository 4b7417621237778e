use axum::response::Response;

use crate::models::HealthResponse;
use crate::utils::{current_time, success_response};

pub async fn handle() -> Response {
    success_response(&HealthResponse {
        status: "ok",
        timestamp: current_time(),
        version: env!("CARGO_PKG_VERSION"),
    })
}
