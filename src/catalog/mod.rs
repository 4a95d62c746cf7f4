use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::types::TableId;
use crate::storage::disk::PageStore;
use crate::tuple::TupleDesc;

struct TableEntry {
    name: String,
    store: Arc<dyn PageStore>,
}

/// Registry of the tables the engine knows about.
///
/// Maps table IDs to their page stores and keeps a name index. Schemas are
/// registered at startup; the catalog itself is not persisted.
pub struct Catalog {
    tables: RwLock<HashMap<TableId, TableEntry>>,
    names: RwLock<HashMap<String, TableId>>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            names: RwLock::new(HashMap::new()),
        }
    }

    /// Register a table under a name. Re-registering an ID or name replaces
    /// the previous entry.
    pub fn add_table(&self, store: Arc<dyn PageStore>, name: impl Into<String>) {
        let name = name.into();
        let table_id = store.table_id();
        self.names.write().insert(name.clone(), table_id);
        self.tables
            .write()
            .insert(table_id, TableEntry { name, store });
    }

    pub fn table(&self, table_id: TableId) -> Option<Arc<dyn PageStore>> {
        self.tables.read().get(&table_id).map(|e| e.store.clone())
    }

    pub fn table_by_name(&self, name: &str) -> Option<Arc<dyn PageStore>> {
        let table_id = *self.names.read().get(name)?;
        self.table(table_id)
    }

    pub fn table_id(&self, name: &str) -> Option<TableId> {
        self.names.read().get(name).copied()
    }

    pub fn table_name(&self, table_id: TableId) -> Option<String> {
        self.tables.read().get(&table_id).map(|e| e.name.clone())
    }

    pub fn tuple_desc(&self, table_id: TableId) -> Option<TupleDesc> {
        self.tables
            .read()
            .get(&table_id)
            .map(|e| e.store.tuple_desc().clone())
    }

    pub fn table_ids(&self) -> Vec<TableId> {
        self.tables.read().keys().copied().collect()
    }
}
