use std::collections::{BTreeMap, BTreeSet};

use axum::extract::State;
use axum::response::Response;
use futures::future::try_join_all;
use serde::Serialize;

use super::AppState;
use crate::error::{ApiError, StoreError};
use crate::models::{CollectionMap, Metadata};
use crate::utils::{current_time, success_response};

const CONTEXT: &str = "Failed to read cache status";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct V1Status {
    collections: BTreeMap<String, Metadata>,
    collection_map: CollectionMap,
}

#[derive(Debug, Serialize)]
struct V2Status {
    collections: BTreeMap<String, Metadata>,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    v1: V1Status,
    v2: V2Status,
    timestamp: String,
}

/// Metadata for every mapped v1 collection and every known v2 collection;
/// `{"cached": false}` for the ones never written.
pub async fn handle(State(state): State<AppState>) -> Result<Response, ApiError> {
    let cache = &state.cache;
    let collection_map = cache.collection_map().await.map_err(ApiError::store(CONTEXT))?;

    let v1_names: BTreeSet<&String> = collection_map.values().collect();
    let v1 = try_join_all(v1_names.into_iter().map(|name| async move {
        let meta = cache.metadata(name).await?;
        Ok::<_, StoreError>((name.clone(), meta.unwrap_or_else(Metadata::uncached)))
    }))
    .await
    .map_err(ApiError::store(CONTEXT))?;

    let v2 = try_join_all(state.config.v2_collections.iter().map(|name| async move {
        let meta = cache.v2_metadata(name).await?;
        Ok::<_, StoreError>((name.clone(), meta.unwrap_or_else(Metadata::uncached)))
    }))
    .await
    .map_err(ApiError::store(CONTEXT))?;

    Ok(success_response(&StatusResponse {
        v1: V1Status {
            collections: v1.into_iter().collect(),
            collection_map,
        },
        v2: V2Status {
            collections: v2.into_iter().collect(),
        },
        timestamp: current_time(),
    }))
}
