//! Analysis scopes
//!
//! An [`Analyzer`] is the scope a tree is analyzed under: the alias registry
//! filled in by FROM clauses, plus state shared across the whole statement
//! (missing tables, privilege requests, the pending-rewrite flag). Scopes are
//! always passed explicitly into `analyze` calls, never ambient.
//!
//! Child scopes share the statement-wide state; disposable root scopes share
//! only the catalog context, so a speculative analysis pass can run without
//! registering anything in the real scope.

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::functions::FunctionRegistry;
use crate::semantic::privilege::PrivilegeRequest;
use crate::types::schema::{Table, TableId};
use crate::types::DataType;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;
use std::sync::Arc;

/// Session-level analysis options.
#[derive(Debug, Clone)]
pub struct AnalyzerOptions {
    /// Database used to qualify unqualified table references.
    pub default_db: String,
    /// Label result expressions positionally (`_c0`, `_c1`, ...) when no
    /// alias or column name applies. Schema inference turns these labels into
    /// column names, so they must be valid identifiers.
    pub use_query_column_labels: bool,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        AnalyzerOptions {
            default_db: "default".into(),
            use_query_column_labels: false,
        }
    }
}

/// State shared by every scope of one statement analysis.
#[derive(Debug, Default)]
struct GlobalState {
    /// Tables the catalog has not loaded yet, keyed by qualified name.
    /// Accumulated, never thrown: the caller loads them and retries.
    missing_tables: BTreeSet<String>,
    /// Access requirements registered so far, in registration order.
    privilege_requests: Vec<PrivilegeRequest>,
    /// Set when a subquery is seen; analysis of statements that cannot
    /// tolerate unrewritten subqueries stops until the rewriter has run.
    subquery_rewrite_pending: bool,
}

/// A table reference registered in a scope, addressable by alias.
#[derive(Debug, Clone)]
pub struct RegisteredTable {
    pub alias: String,
    pub table: Arc<Table>,
}

/// A column reference resolved against a scope.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedColumn {
    pub table_id: TableId,
    pub table_alias: String,
    /// Canonical position of the column in the table.
    pub index: usize,
    pub column: String,
    /// Struct fields traversed below the column. Empty when the reference
    /// terminates at the column itself.
    pub field_path: Vec<String>,
    /// Type of the terminal column or field.
    pub data_type: DataType,
    /// Whether the referenced column is one of the table's key columns.
    pub is_key: bool,
}

/// An analysis scope.
pub struct Analyzer {
    catalog: Rc<dyn Catalog>,
    registry: Rc<FunctionRegistry>,
    options: AnalyzerOptions,
    globals: Rc<RefCell<GlobalState>>,
    tables: Vec<RegisteredTable>,
}

impl Analyzer {
    /// Creates a root scope.
    pub fn new(catalog: Rc<dyn Catalog>, registry: Rc<FunctionRegistry>) -> Self {
        Analyzer::with_options(catalog, registry, AnalyzerOptions::default())
    }

    pub fn with_options(
        catalog: Rc<dyn Catalog>,
        registry: Rc<FunctionRegistry>,
        options: AnalyzerOptions,
    ) -> Self {
        Analyzer {
            catalog,
            registry,
            options,
            globals: Rc::new(RefCell::new(GlobalState::default())),
            tables: Vec::new(),
        }
    }

    /// Creates a child scope sharing this scope's statement-wide state. The
    /// child resolves its own FROM clause; correlated references into the
    /// parent are the subquery rewriter's concern.
    pub fn child(&self) -> Analyzer {
        Analyzer {
            catalog: Rc::clone(&self.catalog),
            registry: Rc::clone(&self.registry),
            options: self.options.clone(),
            globals: Rc::clone(&self.globals),
            tables: Vec::new(),
        }
    }

    /// Creates a disposable root scope: same catalog and session context,
    /// fresh statement-wide state. Nothing a speculative pass registers here
    /// is visible to this scope; the caller merges back what it wants
    /// (typically the missing-table set).
    pub fn disposable_root(&self) -> Analyzer {
        Analyzer {
            catalog: Rc::clone(&self.catalog),
            registry: Rc::clone(&self.registry),
            options: self.options.clone(),
            globals: Rc::new(RefCell::new(GlobalState::default())),
            tables: Vec::new(),
        }
    }

    pub fn catalog(&self) -> Rc<dyn Catalog> {
        Rc::clone(&self.catalog)
    }

    pub fn registry(&self) -> Rc<FunctionRegistry> {
        Rc::clone(&self.registry)
    }

    pub fn options(&self) -> &AnalyzerOptions {
        &self.options
    }

    pub fn set_use_query_column_labels(&mut self, enable: bool) {
        self.options.use_query_column_labels = enable;
    }

    /// Splits a table path into `(db, table)`, qualifying with the session
    /// default database when no database is given.
    pub fn qualify_table(&self, path: &[String]) -> (String, String) {
        match path {
            [table] => (self.options.default_db.clone(), table.clone()),
            [db, table] => (db.clone(), table.clone()),
            _ => panic!("table path must have one or two segments: {:?}", path),
        }
    }

    /// Registers a table under an alias. Re-registering the same table under
    /// the same alias is a no-op so that a FROM clause shared between a
    /// statement and its synthesized projection can be analyzed through both
    /// owners; a different table under an existing alias is an error.
    pub fn register_table(&mut self, alias: String, table: Arc<Table>) -> Result<()> {
        if let Some(existing) = self.tables.iter().find(|t| t.alias == alias) {
            if existing.table.id == table.id && existing.table.qualified_name() == table.qualified_name() {
                return Ok(());
            }
            return Err(Error::InvalidTableReference(format!(
                "Duplicate table alias: '{}'",
                alias
            )));
        }
        self.tables.push(RegisteredTable { alias, table });
        Ok(())
    }

    pub fn find_registered(&self, alias: &str) -> Option<&RegisteredTable> {
        self.tables.iter().find(|t| t.alias == alias)
    }

    pub fn registered_tables(&self) -> &[RegisteredTable] {
        &self.tables
    }

    /// Resolves a column reference path against the registered tables.
    ///
    /// Accepted forms: `col`, `alias.col`, `alias.col.field...`, and
    /// `col.field...` where `col` is a struct-typed column of a registered
    /// table.
    pub fn resolve_column(&self, path: &[String]) -> Result<ResolvedColumn> {
        let unresolved = || {
            Error::InvalidTableReference(format!(
                "Could not resolve column/field reference: '{}'",
                path.join(".")
            ))
        };

        match path {
            [] => panic!("empty column reference path"),
            [name] => {
                let mut found = None;
                for reg in &self.tables {
                    if let Some((index, column)) = reg.table.column(name) {
                        if found.is_some() {
                            return Err(Error::InvalidTableReference(format!(
                                "Column/field reference is ambiguous: '{}'",
                                name
                            )));
                        }
                        found = Some(self.resolved(reg, index, column.name.clone(), &[])?);
                    }
                }
                found.ok_or_else(unresolved)
            }
            [head, rest @ ..] => {
                if let Some(reg) = self.find_registered(head) {
                    let (column, fields) = rest.split_first().expect("rest is non-empty");
                    let (index, _) = reg.table.column(column).ok_or_else(unresolved)?;
                    return self.resolved(reg, index, column.clone(), fields);
                }
                // No alias named `head`: try it as a struct-typed column.
                for reg in &self.tables {
                    if let Some((index, _)) = reg.table.column(head) {
                        return self.resolved(reg, index, head.clone(), rest);
                    }
                }
                Err(unresolved())
            }
        }
    }

    fn resolved(
        &self,
        reg: &RegisteredTable,
        index: usize,
        column: String,
        fields: &[String],
    ) -> Result<ResolvedColumn> {
        let mut data_type = reg.table.columns[index].data_type.clone();
        for field in fields {
            let DataType::Struct(struct_fields) = &data_type else {
                return Err(Error::InvalidTableReference(format!(
                    "Could not resolve column/field reference: '{}.{}'",
                    column, field
                )));
            };
            data_type = struct_fields
                .iter()
                .find(|(name, _)| name == field)
                .map(|(_, ty)| ty.clone())
                .ok_or_else(|| {
                    Error::InvalidTableReference(format!(
                        "Could not resolve column/field reference: '{}.{}'",
                        column, field
                    ))
                })?;
        }
        Ok(ResolvedColumn {
            table_id: reg.table.id,
            table_alias: reg.alias.clone(),
            index,
            is_key: reg.table.key_column_names().contains(&column),
            column,
            field_path: fields.to_vec(),
            data_type,
        })
    }

    // Missing-table accumulation (recoverable, never an error).

    pub fn add_missing_table(&self, qualified_name: String) {
        self.globals
            .borrow_mut()
            .missing_tables
            .insert(qualified_name);
    }

    pub fn missing_tables(&self) -> BTreeSet<String> {
        self.globals.borrow().missing_tables.clone()
    }

    pub fn has_missing_tables(&self) -> bool {
        !self.globals.borrow().missing_tables.is_empty()
    }

    /// Merges another scope's missing tables into this scope. Used to carry
    /// what a disposable speculative scope surfaced back to the real one.
    pub fn merge_missing_from(&self, other: &Analyzer) {
        let other_missing = other.globals.borrow().missing_tables.clone();
        self.globals
            .borrow_mut()
            .missing_tables
            .extend(other_missing);
    }

    /// Clears the missing set, typically after the caller loaded the tables
    /// and before retrying the analysis.
    pub fn clear_missing_tables(&self) {
        self.globals.borrow_mut().missing_tables.clear();
    }

    // Subquery-rewrite coordination.

    pub fn note_subquery(&self) {
        self.globals.borrow_mut().subquery_rewrite_pending = true;
    }

    pub fn subquery_rewrite_pending(&self) -> bool {
        self.globals.borrow().subquery_rewrite_pending
    }

    pub fn set_subquery_rewrite_pending(&self, pending: bool) {
        self.globals.borrow_mut().subquery_rewrite_pending = pending;
    }

    // Privilege registration.

    pub fn register_privilege(&self, request: PrivilegeRequest) {
        self.globals.borrow_mut().privilege_requests.push(request);
    }

    pub fn privilege_requests(&self) -> Vec<PrivilegeRequest> {
        self.globals.borrow().privilege_requests.clone()
    }
}
