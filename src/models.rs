use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::current_time;

/// GraphQL top-level query name (`Posts`) → internal collection id (`posts`).
pub type CollectionMap = BTreeMap<String, String>;

pub const DEFAULT_PAGE_LIMIT: u64 = 10;
pub const MAX_PAGE_LIMIT: u64 = 100;

/// Per-collection bookkeeping written next to every collection payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub cached: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_docs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Metadata {
    /// Placeholder reported by `/status` for collections never written.
    pub fn uncached() -> Self {
        Self {
            cached: false,
            updated_at: None,
            doc_count: None,
            total_docs: None,
            version: None,
        }
    }

    /// v1: `docCount` is the length of `data.docs` (0 when absent),
    /// `totalDocs` is `data.totalDocs` (0 when absent).
    pub fn for_v1(data: &Value) -> Self {
        Self {
            cached: true,
            updated_at: Some(current_time()),
            doc_count: Some(docs_of(data).map_or(0, |docs| docs.len() as u64)),
            total_docs: Some(declared_total(data).unwrap_or(0)),
            version: None,
        }
    }

    /// v2: `totalDocs` falls back to the number of documents written.
    pub fn for_v2(data: &Value, docs: &[Value]) -> Self {
        let doc_count = docs.len() as u64;
        Self {
            cached: true,
            updated_at: Some(current_time()),
            doc_count: Some(doc_count),
            total_docs: Some(declared_total(data).unwrap_or(doc_count)),
            version: Some("v2".to_string()),
        }
    }
}

/// The `docs` array of a paginated CMS payload, if it has one.
pub fn docs_of(data: &Value) -> Option<&Vec<Value>> {
    data.get("docs").and_then(Value::as_array)
}

/// A positive `totalDocs` declared by the payload. Zero counts as absent.
fn declared_total(data: &Value) -> Option<u64> {
    data.get("totalDocs")
        .and_then(Value::as_u64)
        .filter(|total| *total > 0)
}

/// The cache id of a document: a number, or a non-empty string.
pub fn document_id(doc: &Value) -> Option<String> {
    match doc.get("id")? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// The `data` field of a write body. `null` counts as missing.
pub fn data_field(body: &Value) -> Option<&Value> {
    body.get("data").filter(|data| !data.is_null())
}

#[derive(Debug, Default, Deserialize)]
pub struct GraphqlRequest {
    #[serde(default)]
    pub query: Option<String>,
}

/// Raw `?page=&limit=` values. Unparseable numbers fall back to defaults.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageParams {
    /// `(page, limit)` with `page >= 1` and `limit` in `[1, MAX_PAGE_LIMIT]`.
    pub fn resolve(&self) -> (u64, u64) {
        let page = parse_int(self.page.as_deref()).unwrap_or(1).max(1) as u64;
        let limit = parse_int(self.limit.as_deref())
            .unwrap_or(DEFAULT_PAGE_LIMIT as i64)
            .clamp(1, MAX_PAGE_LIMIT as i64) as u64;
        (page, limit)
    }
}

fn parse_int(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
}

/// One page of a cached v2 collection, shaped like the CMS REST list
/// response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    pub docs: Vec<Value>,
    pub total_docs: u64,
    pub total_pages: u64,
    pub page: u64,
    pub limit: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl PageResponse {
    /// Slice `docs[(page-1)*limit .. page*limit]` out of a cached payload.
    pub fn slice(data: &Value, page: u64, limit: u64) -> Self {
        let limit = limit.max(1);
        let docs = docs_of(data).map(Vec::as_slice).unwrap_or_default();
        let total_docs = declared_total(data).unwrap_or(docs.len() as u64);

        let start = page.saturating_sub(1).saturating_mul(limit);
        let end = start.saturating_add(limit);
        let len = docs.len() as u64;
        let window = if start >= len {
            Vec::new()
        } else {
            docs[start as usize..end.min(len) as usize].to_vec()
        };

        Self {
            docs: window,
            total_docs,
            total_pages: total_docs.div_ceil(limit),
            page,
            limit,
            has_next_page: page.saturating_mul(limit) < total_docs,
            has_prev_page: page > 1,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ConfigEntryResponse {
    pub key: String,
    pub data: Value,
}

#[derive(Debug, Serialize)]
pub struct ConfigWriteResponse {
    pub success: bool,
    pub key: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub success: bool,
    pub collection: String,
    pub metadata: Metadata,
}
