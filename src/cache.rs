use std::sync::Arc;

use futures::future::try_join_all;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::StoreError;
use crate::keys::{
    collection_key, config_key, metadata_key, v2_collection_key, v2_document_key,
    v2_metadata_key, COLLECTION_MAP_KEY,
};
use crate::models::{document_id, CollectionMap, Metadata};
use crate::store::KvStore;

/// Typed JSON access to the cache namespace. Holds no state of its own;
/// every call goes straight to the store.
#[derive(Clone)]
pub struct CacheStorage {
    kv: Arc<dyn KvStore>,
}

/// What a v2 refresh wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct V2Write {
    pub metadata: Metadata,
    pub indexed: usize,
    pub skipped: usize,
}

impl CacheStorage {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.kv.get(key).await? {
            Some(raw) => serde_json::from_str(&raw).map(Some).map_err(|source| {
                let key = key.to_string();
                if source.is_data() {
                    StoreError::Shape { key, source }
                } else {
                    StoreError::Decode { key, source }
                }
            }),
            None => Ok(None),
        }
    }

    async fn put_json<T>(&self, key: &str, value: &T) -> Result<(), StoreError>
    where
        T: Serialize + ?Sized,
    {
        let raw = serde_json::to_string(value).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.kv.put(key, raw).await
    }

    pub async fn collection(&self, collection: &str) -> Result<Option<Value>, StoreError> {
        self.get_json(&collection_key(collection)).await
    }

    pub async fn metadata(&self, collection: &str) -> Result<Option<Metadata>, StoreError> {
        self.get_json(&metadata_key(collection)).await
    }

    /// Replace a v1 collection wholesale and record its metadata.
    pub async fn put_collection(
        &self,
        collection: &str,
        data: &Value,
    ) -> Result<Metadata, StoreError> {
        self.put_json(&collection_key(collection), data).await?;
        let metadata = Metadata::for_v1(data);
        self.put_json(&metadata_key(collection), &metadata).await?;
        Ok(metadata)
    }

    pub async fn v2_collection(&self, collection: &str) -> Result<Option<Value>, StoreError> {
        self.get_json(&v2_collection_key(collection)).await
    }

    pub async fn v2_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Value>, StoreError> {
        self.get_json(&v2_document_key(collection, id)).await
    }

    pub async fn v2_metadata(&self, collection: &str) -> Result<Option<Metadata>, StoreError> {
        self.get_json(&v2_metadata_key(collection)).await
    }

    /// Store the full payload for the list endpoint, then index every
    /// document that has an id under its own key. Documents without an id
    /// only live in the list payload.
    pub async fn put_v2_collection(
        &self,
        collection: &str,
        data: &Value,
        docs: &[Value],
    ) -> Result<V2Write, StoreError> {
        self.put_json(&v2_collection_key(collection), data).await?;

        let mut skipped = 0;
        let mut writes = Vec::with_capacity(docs.len());
        for doc in docs {
            match document_id(doc) {
                Some(id) => writes.push(async move {
                    self.put_json(&v2_document_key(collection, &id), doc).await
                }),
                None => {
                    skipped += 1;
                    tracing::warn!(
                        collection,
                        "document missing id field, skipping individual cache"
                    );
                }
            }
        }
        let indexed = try_join_all(writes).await?.len();

        let metadata = Metadata::for_v2(data, docs);
        self.put_json(&v2_metadata_key(collection), &metadata).await?;
        Ok(V2Write {
            metadata,
            indexed,
            skipped,
        })
    }

    pub async fn config(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.get_json(&config_key(key)).await
    }

    pub async fn put_config(&self, key: &str, data: &Value) -> Result<(), StoreError> {
        self.put_json(&config_key(key), data).await
    }

    /// The collection map, empty when it was never configured.
    pub async fn collection_map(&self) -> Result<CollectionMap, StoreError> {
        Ok(self
            .get_json::<CollectionMap>(&config_key(COLLECTION_MAP_KEY))
            .await?
            .unwrap_or_default())
    }
}
