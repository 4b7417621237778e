//! Build-side fetching against a live gateway: the cache answers what it
//! holds, the CMS covers the rest.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use graphql_cache_worker::fallback::{
    CollectionFetcher, CollectionSpec, FetchError, FetchOptions, GraphqlSource, Outcome, PageSource,
    Source,
};
use graphql_cache_worker::models::PageResponse;
use graphql_cache_worker::{Gateway, GatewayConfig, MemoryStore};
use http_body_util::BodyExt;
use serde_json::{json, Value};

const WRITE_KEY: &str = "build-key";

struct GatewayClient {
    gateway: Gateway,
}

impl GatewayClient {
    async fn send(&self, req: Request<Body>) -> Result<Value, FetchError> {
        let resp = self.gateway.handle(req).await;
        let status = resp.status();
        let bytes = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| FetchError::InvalidResponse(e.to_string()))?
            .to_bytes();
        let body: Value = serde_json::from_slice(&bytes)
            .map_err(|e| FetchError::InvalidResponse(e.to_string()))?;

        match status {
            StatusCode::OK => Ok(body),
            StatusCode::NOT_FOUND => Err(FetchError::CacheMiss(body.to_string())),
            other => Err(FetchError::Upstream {
                status: other.as_u16(),
                message: body.to_string(),
            }),
        }
    }
}

#[async_trait]
impl GraphqlSource for GatewayClient {
    async fn query(&self, query: &str) -> Result<Value, FetchError> {
        let req = Request::builder()
            .method("POST")
            .uri("/api/graphql")
            .body(Body::from(json!({ "query": query }).to_string()))
            .unwrap();
        self.send(req).await
    }
}

#[async_trait]
impl PageSource for GatewayClient {
    async fn page(
        &self,
        collection: &str,
        page: u64,
        limit: u64,
    ) -> Result<PageResponse, FetchError> {
        let req = Request::builder()
            .uri(format!("/v2/{collection}?page={page}&limit={limit}"))
            .body(Body::empty())
            .unwrap();
        let body = self.send(req).await?;
        serde_json::from_value(body).map_err(|e| FetchError::InvalidResponse(e.to_string()))
    }
}

/// Stands in for the CMS GraphQL endpoint.
struct Cms {
    calls: AtomicUsize,
}

#[async_trait]
impl GraphqlSource for Cms {
    async fn query(&self, _query: &str) -> Result<Value, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({ "data": { "Pages": { "docs": [{ "id": "about" }] } } }))
    }
}

async fn seeded_gateway() -> Gateway {
    let store = Arc::new(MemoryStore::new());
    let gateway = Gateway::new(
        store,
        Arc::new(GatewayConfig::default().with_write_key(WRITE_KEY)),
    );

    let docs: Vec<Value> = (1..=12).map(|i| json!({ "id": i })).collect();
    let writes = [
        ("/refresh/posts", json!({ "data": { "docs": [{ "id": 1 }] } })),
        ("/config/collections", json!({ "data": { "Posts": "posts", "Pages": "pages" } })),
        ("/v2/refresh/posts", json!({ "data": { "docs": docs } })),
    ];
    for (uri, body) in writes {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header("authorization", format!("Bearer {WRITE_KEY}"))
            .body(Body::from(body.to_string()))
            .unwrap();
        assert_eq!(gateway.handle(req).await.status(), StatusCode::OK);
    }
    gateway
}

fn spec(graphql_name: &str, rest_endpoint: &str) -> CollectionSpec {
    CollectionSpec {
        graphql_name: graphql_name.to_string(),
        rest_endpoint: rest_endpoint.to_string(),
        query: format!("query {{ {graphql_name} {{ docs {{ id }} }} }}"),
    }
}

fn fetched(outcome: Outcome) -> (Source, usize) {
    match outcome {
        Outcome::Fetched(f) => (f.source, f.docs.len()),
        Outcome::Skipped { reason } => panic!("skipped: {reason}"),
    }
}

#[tokio::test]
async fn cached_collection_is_served_by_the_gateway() {
    let client = GatewayClient {
        gateway: seeded_gateway().await,
    };
    let cms = Cms {
        calls: AtomicUsize::new(0),
    };
    let fetcher = CollectionFetcher::new(&cms, FetchOptions::default()).with_cache(&client);

    let outcome = fetcher.fetch(&spec("Posts", "posts")).await.unwrap();
    assert_eq!(fetched(outcome), (Source::Cache, 1));
    assert_eq!(cms.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn uncached_collection_falls_through_to_cms() {
    let client = GatewayClient {
        gateway: seeded_gateway().await,
    };
    let cms = Cms {
        calls: AtomicUsize::new(0),
    };
    let fetcher = CollectionFetcher::new(&cms, FetchOptions::default()).with_cache(&client);

    let outcome = fetcher.fetch(&spec("Pages", "pages")).await.unwrap();
    assert_eq!(fetched(outcome), (Source::Cms, 1));
    assert_eq!(cms.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rest_pages_are_walked_through_the_gateway() {
    let client = GatewayClient {
        gateway: seeded_gateway().await,
    };
    let cms = Cms {
        calls: AtomicUsize::new(0),
    };
    let options = FetchOptions {
        page_limit: 5,
        ..FetchOptions::default()
    };
    let fetcher = CollectionFetcher::new(&cms, options)
        .with_cache(&client)
        .with_rest(&client);

    let outcome = fetcher.fetch(&spec("Posts", "posts")).await.unwrap();
    assert_eq!(fetched(outcome), (Source::Rest, 12));
}

#[tokio::test]
async fn missing_rest_collection_falls_back_to_v1() {
    let client = GatewayClient {
        gateway: seeded_gateway().await,
    };
    let cms = Cms {
        calls: AtomicUsize::new(0),
    };
    let fetcher = CollectionFetcher::new(&cms, FetchOptions::default())
        .with_cache(&client)
        .with_rest(&client);

    let outcome = fetcher.fetch(&spec("Pages", "pages")).await.unwrap();
    assert_eq!(fetched(outcome), (Source::Cms, 1));
}

#[tokio::test]
async fn unmapped_collection_is_skipped_when_not_fatal() {
    let client = GatewayClient {
        gateway: seeded_gateway().await,
    };
    let cms = Cms {
        calls: AtomicUsize::new(0),
    };
    let options = FetchOptions {
        fail_on_error: false,
        ..FetchOptions::default()
    };
    let fetcher = CollectionFetcher::new(&cms, options).with_cache(&client);

    // Unknown to the mapping: a 400 from the cache, not a miss.
    match fetcher.fetch(&spec("Widgets", "widgets")).await.unwrap() {
        Outcome::Skipped { reason } => assert!(reason.contains("400")),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(cms.calls.load(Ordering::SeqCst), 0);
}
