//! KV key schema.
//!
//! | key | value |
//! |---|---|
//! | `collection:<name>` | v1 collection payload |
//! | `v2:<name>` | v2 collection payload |
//! | `v2:<name>:<id>` | one v2 document |
//! | `metadata:<name>` | v1 metadata |
//! | `metadata:v2:<name>` | v2 metadata |
//! | `config:<key>` | config entry |

/// Config key holding the GraphQL name → collection id map.
pub const COLLECTION_MAP_KEY: &str = "collections";

pub fn collection_key(collection: &str) -> String {
    format!("collection:{collection}")
}

pub fn v2_collection_key(collection: &str) -> String {
    format!("v2:{collection}")
}

pub fn v2_document_key(collection: &str, id: &str) -> String {
    format!("v2:{collection}:{id}")
}

pub fn metadata_key(collection: &str) -> String {
    format!("metadata:{collection}")
}

pub fn v2_metadata_key(collection: &str) -> String {
    metadata_key(&v2_collection_key(collection))
}

pub fn config_key(key: &str) -> String {
    format!("config:{key}")
}
