//! Catalog - registry of tables.
//!
//! Maps a [`TableId`] to the [`HeapFile`] backing it and to its schema. The
//! buffer pool resolves page ids through the catalog; it never keeps a table
//! registry of its own.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::common::{Error, Result, TableId};
use crate::storage::HeapFile;
use crate::tuple::TupleDesc;

struct Table {
    name: String,
    file: Arc<HeapFile>,
}

#[derive(Default)]
struct Tables {
    by_id: HashMap<TableId, Table>,
    by_name: HashMap<String, TableId>,
}

/// Shared table registry.
///
/// # Thread Safety
/// Lookups take a read lock; registration takes a write lock.
#[derive(Default)]
pub struct Catalog {
    tables: RwLock<Tables>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `file` under `name`.
    ///
    /// A table already registered with the same name or the same id is
    /// replaced.
    pub fn add_table(&self, file: Arc<HeapFile>, name: impl Into<String>) {
        let name = name.into();
        let id = file.id();
        let mut tables = self.tables.write();

        if let Some(old_id) = tables.by_name.remove(&name) {
            tables.by_id.remove(&old_id);
        }
        if let Some(old) = tables.by_id.remove(&id) {
            tables.by_name.remove(&old.name);
        }

        debug!("registered table {name} as {id}");
        tables.by_name.insert(name.clone(), id);
        tables.by_id.insert(id, Table { name, file });
    }

    /// The file backing `table_id`.
    ///
    /// # Errors
    /// Returns `Error::NoSuchTable` if nothing is registered under the id.
    pub fn file(&self, table_id: TableId) -> Result<Arc<HeapFile>> {
        self.tables
            .read()
            .by_id
            .get(&table_id)
            .map(|t| Arc::clone(&t.file))
            .ok_or(Error::NoSuchTable(table_id))
    }

    pub fn tuple_desc(&self, table_id: TableId) -> Result<Arc<TupleDesc>> {
        self.file(table_id).map(|f| Arc::clone(f.tuple_desc()))
    }

    pub fn table_id(&self, name: &str) -> Option<TableId> {
        self.tables.read().by_name.get(name).copied()
    }

    pub fn table_name(&self, table_id: TableId) -> Option<String> {
        self.tables
            .read()
            .by_id
            .get(&table_id)
            .map(|t| t.name.clone())
    }

    pub fn table_ids(&self) -> Vec<TableId> {
        self.tables.read().by_id.keys().copied().collect()
    }

    pub fn clear(&self) {
        let mut tables = self.tables.write();
        tables.by_id.clear();
        tables.by_name.clear();
    }
}
