//! Catalog collaborator interface
//!
//! Analysis consumes table and database metadata through the [`Catalog`]
//! trait; the real implementation lives in the catalog service. Lookups never
//! block on metadata loads: a table the catalog knows about but has not
//! loaded yet is reported as [`TableLookup::Missing`] so the caller can
//! trigger a load and retry the whole analysis.
//!
//! [`MemoryCatalog`] is the in-process implementation used by tests.

use crate::semantic::privilege::Privilege;
use crate::types::schema::{Column, StorageFormat, Table, TableId};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by the catalog collaborator. Analysis wraps these into
/// [`Error::CatalogAccess`](crate::Error::CatalogAccess), preserving the
/// underlying cause.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct CatalogError(pub String);

/// Result of a table lookup.
#[derive(Debug, Clone)]
pub enum TableLookup {
    /// The table definition is loaded and usable.
    Loaded(Arc<Table>),
    /// The catalog has no loaded definition. The caller should record the
    /// table in the analyzer's missing set, load it out-of-band, and retry.
    Missing,
}

/// A handle to a database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Database {
    pub name: String,
}

/// A would-be table, as described by a CREATE statement. Passed to the
/// catalog to compute locations and to mirror a schema for a table that does
/// not exist yet.
#[derive(Debug, Clone)]
pub struct TableDescriptor {
    pub db: String,
    pub name: String,
    /// Full column list in canonical order (regular columns first, then
    /// partition columns).
    pub columns: Vec<Column>,
    pub format: StorageFormat,
    pub location: Option<String>,
}

/// Scoped handle for loading or mirroring table definitions. Acquired
/// immediately before use and released when dropped, on every exit path.
pub trait CatalogClient {
    /// Materializes an in-memory table whose schema exactly mirrors the
    /// descriptor. The returned table carries [`TableId::INVALID`]: the real
    /// backing object is created out-of-band by the DDL executor.
    fn mirror_table(&mut self, desc: &TableDescriptor) -> Result<Table, CatalogError>;
}

/// Read-only metadata lookups consumed by analysis.
pub trait Catalog {
    /// Looks up a database by name under the given privilege tag. Privilege
    /// enforcement happens in the authorization collaborator; the tag is
    /// carried so the catalog can record what was asked for.
    fn database(&self, name: &str, privilege: Privilege) -> Option<Database>;

    /// Looks up a table definition.
    fn table(&self, db: &str, name: &str) -> TableLookup;

    /// Computes the physical location the catalog would assign to the given
    /// table if it were created now.
    fn table_location(&self, db: &str, table: &str) -> String;

    /// Acquires a scoped metadata client.
    fn client(&self) -> Box<dyn CatalogClient + '_>;
}

/// In-memory catalog for tests and embedded use.
pub struct MemoryCatalog {
    warehouse_root: String,
    databases: RefCell<HashSet<String>>,
    tables: RefCell<HashMap<(String, String), Arc<Table>>>,
    unloaded: RefCell<HashSet<(String, String)>>,
    active_clients: Cell<usize>,
    fail_mirror: Cell<bool>,
}

impl MemoryCatalog {
    pub fn new(warehouse_root: impl Into<String>) -> Self {
        MemoryCatalog {
            warehouse_root: warehouse_root.into(),
            databases: RefCell::new(HashSet::new()),
            tables: RefCell::new(HashMap::new()),
            unloaded: RefCell::new(HashSet::new()),
            active_clients: Cell::new(0),
            fail_mirror: Cell::new(false),
        }
    }

    pub fn add_database(&self, name: impl Into<String>) {
        self.databases.borrow_mut().insert(name.into());
    }

    pub fn add_table(&self, table: Table) {
        self.databases.borrow_mut().insert(table.db.clone());
        self.tables
            .borrow_mut()
            .insert((table.db.clone(), table.name.clone()), Arc::new(table));
    }

    /// Marks a table as known but unloaded, so lookups report it missing
    /// until [`MemoryCatalog::load`] is called.
    pub fn mark_unloaded(&self, db: impl Into<String>, name: impl Into<String>) {
        self.unloaded.borrow_mut().insert((db.into(), name.into()));
    }

    pub fn load(&self, db: &str, name: &str) {
        self.unloaded
            .borrow_mut()
            .remove(&(db.to_string(), name.to_string()));
    }

    /// Number of client handles currently held.
    pub fn active_clients(&self) -> usize {
        self.active_clients.get()
    }

    /// Makes subsequent [`CatalogClient::mirror_table`] calls fail.
    pub fn fail_next_mirror(&self, fail: bool) {
        self.fail_mirror.set(fail);
    }
}

impl Catalog for MemoryCatalog {
    fn database(&self, name: &str, _privilege: Privilege) -> Option<Database> {
        self.databases
            .borrow()
            .contains(name)
            .then(|| Database { name: name.into() })
    }

    fn table(&self, db: &str, name: &str) -> TableLookup {
        let key = (db.to_string(), name.to_string());
        if self.unloaded.borrow().contains(&key) {
            return TableLookup::Missing;
        }
        match self.tables.borrow().get(&key) {
            Some(table) => TableLookup::Loaded(Arc::clone(table)),
            None => TableLookup::Missing,
        }
    }

    fn table_location(&self, db: &str, table: &str) -> String {
        format!("{}/{}.db/{}", self.warehouse_root, db, table)
    }

    fn client(&self) -> Box<dyn CatalogClient + '_> {
        self.active_clients.set(self.active_clients.get() + 1);
        Box::new(MemoryCatalogClient { catalog: self })
    }
}

struct MemoryCatalogClient<'a> {
    catalog: &'a MemoryCatalog,
}

impl CatalogClient for MemoryCatalogClient<'_> {
    fn mirror_table(&mut self, desc: &TableDescriptor) -> Result<Table, CatalogError> {
        if self.catalog.fail_mirror.get() {
            return Err(CatalogError(format!(
                "failed to load schema for {}.{}",
                desc.db, desc.name
            )));
        }
        let mut table = Table::new(TableId::INVALID, desc.db.clone(), desc.name.clone())
            .with_columns(desc.columns.clone())
            .with_format(desc.format);
        table.location = desc.location.clone();
        Ok(table)
    }
}

impl Drop for MemoryCatalogClient<'_> {
    fn drop(&mut self) {
        self.catalog
            .active_clients
            .set(self.catalog.active_clients.get() - 1);
    }
}
