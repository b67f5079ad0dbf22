//! Schema cache owned by the caller
//!
//! Entries never expire on their own. Whoever changes the schema (a design
//! operation, a drop, a refresh command) invalidates the affected keys.

use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use sqlport_core::{IndexMeta, TableSnapshot};

/// Identity of one cached object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub connection_id: Uuid,
    pub schema: String,
    pub object: String,
}

impl CacheKey {
    pub fn new(connection_id: Uuid, schema: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            connection_id,
            schema: schema.into(),
            object: object.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct CachedObject {
    snapshot: Option<TableSnapshot>,
    indexes: Option<Vec<IndexMeta>>,
}

/// Cached table snapshots and index listings keyed by connection, schema and object
#[derive(Debug, Default)]
pub struct SchemaCache {
    entries: RwLock<HashMap<CacheKey, CachedObject>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_snapshot(&self, key: &CacheKey) -> Option<TableSnapshot> {
        let result = self
            .entries
            .read()
            .get(key)
            .and_then(|entry| entry.snapshot.clone());
        if result.is_some() {
            tracing::debug!(connection_id = %key.connection_id, schema = %key.schema, object = %key.object, "cache hit for table snapshot");
        } else {
            tracing::debug!(connection_id = %key.connection_id, schema = %key.schema, object = %key.object, "cache miss for table snapshot");
        }
        result
    }

    pub fn set_snapshot(&self, key: CacheKey, snapshot: TableSnapshot) {
        self.entries.write().entry(key).or_default().snapshot = Some(snapshot);
    }

    pub fn get_indexes(&self, key: &CacheKey) -> Option<Vec<IndexMeta>> {
        let result = self
            .entries
            .read()
            .get(key)
            .and_then(|entry| entry.indexes.clone());
        tracing::debug!(
            connection_id = %key.connection_id,
            object = %key.object,
            hit = result.is_some(),
            "index cache lookup"
        );
        result
    }

    pub fn set_indexes(&self, key: CacheKey, indexes: Vec<IndexMeta>) {
        self.entries.write().entry(key).or_default().indexes = Some(indexes);
    }

    /// Drop everything cached for one object
    pub fn invalidate(&self, key: &CacheKey) {
        if self.entries.write().remove(key).is_some() {
            tracing::debug!(connection_id = %key.connection_id, object = %key.object, "invalidated cached object");
        }
    }

    /// Drop everything cached for one schema of a connection
    pub fn invalidate_schema(&self, connection_id: Uuid, schema: &str) {
        self.entries
            .write()
            .retain(|key, _| !(key.connection_id == connection_id && key.schema == schema));
        tracing::debug!(connection_id = %connection_id, schema = %schema, "invalidated cached schema");
    }

    /// Drop everything cached for a connection
    pub fn invalidate_connection(&self, connection_id: Uuid) {
        self.entries
            .write()
            .retain(|key, _| key.connection_id != connection_id);
        tracing::debug!(connection_id = %connection_id, "invalidated connection cache");
    }

    /// Clear all cached data
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
