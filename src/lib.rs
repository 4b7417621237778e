//! Edge cache in front of a headless CMS.
//!
//! A refresh workflow pushes collection payloads in with a bearer token; the
//! site build reads them back through a GraphQL-compatible endpoint (v1) or
//! a paginated REST endpoint (v2). All state lives in the key-value store.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use tower_service::Service;

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod fallback;
pub mod graphql;
pub mod keys;
pub mod mapping;
pub mod models;
pub mod routes;
pub mod store;
mod utils;

#[cfg(target_arch = "wasm32")]
mod platform;
#[cfg(target_arch = "wasm32")]
mod telemetry;

pub use cache::CacheStorage;
pub use config::GatewayConfig;
pub use error::{ApiError, StoreError};
pub use store::{KvStore, MemoryStore};

use routes::AppState;
use utils::{preflight_response, request_origin, with_envelope};

/// The request handler: OPTIONS preflight, routing, and the CORS /
/// `Cache-Control` envelope around every response. Cheap to clone.
#[derive(Clone)]
pub struct Gateway {
    router: axum::Router,
}

impl Gateway {
    pub fn new(store: Arc<dyn KvStore>, config: Arc<GatewayConfig>) -> Self {
        let state = AppState {
            cache: CacheStorage::new(store),
            config,
        };
        Self {
            router: routes::router(state),
        }
    }

    pub async fn handle(&self, req: Request<Body>) -> Response {
        let origin = request_origin(req.headers());
        if req.method() == Method::OPTIONS {
            return preflight_response(origin);
        }

        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let mut router = self.router.clone();
        let resp = match router.call(req).await {
            Ok(resp) => resp,
            Err(never) => match never {},
        };
        tracing::info!(%method, %path, status = resp.status().as_u16(), "handled request");

        with_envelope(resp, origin)
    }
}

#[cfg(target_arch = "wasm32")]
#[worker::event(fetch)]
pub async fn main(
    req: worker::HttpRequest,
    env: worker::Env,
    _ctx: worker::Context,
) -> worker::Result<Response> {
    console_error_panic_hook::set_once();

    let gateway = platform::gateway(&env)?;
    Ok(gateway.handle(req.map(Body::new)).await)
}
