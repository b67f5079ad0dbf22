//! Primary key columns remembered per table
//!
//! Test-data generators register the key column they fill so later runs can
//! continue after the current maximum. The registry is owned by the caller and
//! forgets a table only when told to.

use parking_lot::RwLock;
use std::collections::HashMap;

use sqlport_core::TableSnapshot;
use sqlport_schema::CacheKey;

#[derive(Debug, Default)]
pub struct PrimaryKeyRegistry {
    keys: RwLock<HashMap<CacheKey, String>>,
}

impl PrimaryKeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, key: CacheKey, column: impl Into<String>) {
        let column = column.into();
        tracing::debug!(object = %key.object, column = %column, "registered primary key");
        self.keys.write().insert(key, column);
    }

    /// Register the first primary-key column of a snapshot; false when it has none
    pub fn register_snapshot(&self, key: CacheKey, snapshot: &TableSnapshot) -> bool {
        match snapshot.primary_key().first() {
            Some(column) => {
                self.register(key, column.name.clone());
                true
            }
            None => false,
        }
    }

    pub fn primary_key(&self, key: &CacheKey) -> Option<String> {
        self.keys.read().get(key).cloned()
    }

    pub fn invalidate(&self, key: &CacheKey) {
        self.keys.write().remove(key);
    }

    pub fn invalidate_connection(&self, connection_id: uuid::Uuid) {
        self.keys
            .write()
            .retain(|key, _| key.connection_id != connection_id);
    }

    pub fn clear(&self) {
        self.keys.write().clear();
    }

    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }
}
