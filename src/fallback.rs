//! Caller-side fetch orchestration for the site build.
//!
//! The gateway never falls back on its own. A build asks for a collection
//! and this module decides where it comes from:
//!
//! 1. v2 REST pages, when a REST source is configured;
//! 2. on any v2 failure (and `fallback_to_v1`), the v1 chain:
//!    the cache's GraphQL endpoint, then the CMS GraphQL endpoint on a cache
//!    miss or when the cache is disabled;
//! 3. `fail_on_error` decides whether a collection that still failed aborts
//!    the build or is skipped.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::models::{docs_of, PageResponse, MAX_PAGE_LIMIT};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no cached data for {0}")]
    CacheMiss(String),
    #[error("upstream request failed with status {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("upstream request timed out")]
    Timeout,
    #[error("invalid upstream response: {0}")]
    InvalidResponse(String),
}

impl FetchError {
    /// The status a build report shows for this failure.
    pub fn status(&self) -> u16 {
        match self {
            Self::CacheMiss(_) => 404,
            Self::Upstream { .. } | Self::InvalidResponse(_) => 502,
            Self::Timeout => 504,
        }
    }
}

/// Anything that answers a GraphQL query with `{"data": {...}}`: the cache
/// gateway or the CMS itself. Cache implementations report a 404 as
/// [`FetchError::CacheMiss`].
#[async_trait]
pub trait GraphqlSource: Send + Sync {
    async fn query(&self, query: &str) -> Result<Value, FetchError>;
}

/// A paginated REST list endpoint (`/v2/:collection`).
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn page(
        &self,
        collection: &str,
        page: u64,
        limit: u64,
    ) -> Result<PageResponse, FetchError>;
}

/// One collection as the build knows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    /// GraphQL top-level query name, e.g. `Posts`.
    pub graphql_name: String,
    /// REST endpoint segment, e.g. `working-notes`.
    pub rest_endpoint: String,
    pub query: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub use_cache: bool,
    pub fallback_to_v1: bool,
    pub fail_on_error: bool,
    pub page_limit: u64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            fallback_to_v1: true,
            fail_on_error: true,
            page_limit: MAX_PAGE_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Cache,
    Cms,
    Rest,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub docs: Vec<Value>,
    pub source: Source,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Fetched(Fetched),
    /// The collection failed and `fail_on_error` is off.
    Skipped { reason: String },
}

pub struct CollectionFetcher<'a> {
    cache: Option<&'a dyn GraphqlSource>,
    cms: &'a dyn GraphqlSource,
    rest: Option<&'a dyn PageSource>,
    options: FetchOptions,
}

impl<'a> CollectionFetcher<'a> {
    pub fn new(cms: &'a dyn GraphqlSource, options: FetchOptions) -> Self {
        Self {
            cache: None,
            cms,
            rest: None,
            options,
        }
    }

    pub fn with_cache(mut self, cache: &'a dyn GraphqlSource) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_rest(mut self, rest: &'a dyn PageSource) -> Self {
        self.rest = Some(rest);
        self
    }

    pub async fn fetch(&self, spec: &CollectionSpec) -> Result<Outcome, FetchError> {
        let result = match self.rest {
            Some(rest) => match self.fetch_v2(rest, spec).await {
                Ok(fetched) => Ok(fetched),
                Err(err) if self.options.fallback_to_v1 => {
                    tracing::warn!(
                        collection = %spec.rest_endpoint,
                        error = %err,
                        "v2 REST fetch failed, falling back to v1 GraphQL"
                    );
                    self.fetch_v1(spec).await
                }
                Err(err) => Err(err),
            },
            None => self.fetch_v1(spec).await,
        };

        match result {
            Ok(fetched) => Ok(Outcome::Fetched(fetched)),
            Err(err) if self.options.fail_on_error => Err(err),
            Err(err) => {
                tracing::warn!(
                    collection = %spec.graphql_name,
                    error = %err,
                    "skipping collection"
                );
                Ok(Outcome::Skipped {
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Cache first, CMS on a miss. Other cache failures are not retried
    /// against the CMS: they point at a broken cache, not a cold one.
    pub async fn fetch_v1(&self, spec: &CollectionSpec) -> Result<Fetched, FetchError> {
        if let Some(cache) = self.cache.filter(|_| self.options.use_cache) {
            match cache.query(&spec.query).await {
                Ok(response) => {
                    return Ok(Fetched {
                        docs: graphql_docs(&response, &spec.graphql_name)?,
                        source: Source::Cache,
                    })
                }
                Err(FetchError::CacheMiss(what)) => {
                    tracing::info!(%what, "cache miss, fetching from CMS");
                }
                Err(err) => return Err(err),
            }
        }

        let response = self.cms.query(&spec.query).await?;
        Ok(Fetched {
            docs: graphql_docs(&response, &spec.graphql_name)?,
            source: Source::Cms,
        })
    }

    /// Walk pages from 1 until `hasNextPage` is false.
    pub async fn fetch_v2(
        &self,
        rest: &dyn PageSource,
        spec: &CollectionSpec,
    ) -> Result<Fetched, FetchError> {
        let mut docs = Vec::new();
        let mut page = 1;
        loop {
            let result = rest
                .page(&spec.rest_endpoint, page, self.options.page_limit)
                .await?;
            docs.extend(result.docs);
            if !result.has_next_page {
                break;
            }
            page += 1;
        }
        Ok(Fetched {
            docs,
            source: Source::Rest,
        })
    }
}

/// `data.<name>.docs` of a GraphQL response. A response carrying `errors`
/// is an upstream failure.
fn graphql_docs(response: &Value, graphql_name: &str) -> Result<Vec<Value>, FetchError> {
    if let Some(errors) = response.get("errors").and_then(Value::as_array) {
        let message = errors
            .iter()
            .filter_map(|e| e.get("message").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(", ");
        return Err(FetchError::Upstream {
            status: 200,
            message: format!("GraphQL errors: {message}"),
        });
    }
    let payload = response
        .get("data")
        .and_then(|data| data.get(graphql_name))
        .ok_or_else(|| FetchError::InvalidResponse(format!("missing data.{graphql_name}")))?;
    Ok(docs_of(payload).cloned().unwrap_or_default())
}
