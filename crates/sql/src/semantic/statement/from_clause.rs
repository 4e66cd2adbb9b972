//! FROM clause analysis

use crate::catalog::TableLookup;
use crate::error::Result;
use crate::semantic::analyzer::Analyzer;
use crate::types::schema::Table;
use std::fmt;
use std::sync::Arc;

/// A single table reference in a FROM clause.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    /// `[table]` or `[db, table]`.
    path: Vec<String>,
    explicit_alias: Option<String>,
    /// Resolved during analysis.
    table: Option<Arc<Table>>,
}

impl TableRef {
    pub fn new<S: Into<String>>(path: Vec<S>) -> TableRef {
        TableRef {
            path: path.into_iter().map(Into::into).collect(),
            explicit_alias: None,
            table: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> TableRef {
        self.explicit_alias = Some(alias.into());
        self
    }

    /// The alias this reference is addressable by: the explicit alias, or
    /// the unqualified table name.
    pub fn unique_alias(&self) -> &str {
        self.explicit_alias
            .as_deref()
            .unwrap_or_else(|| self.path.last().expect("empty table path"))
    }

    pub fn table(&self) -> Option<&Arc<Table>> {
        self.table.as_ref()
    }

    fn analyze(&mut self, analyzer: &mut Analyzer) -> Result<()> {
        let (db, name) = analyzer.qualify_table(&self.path);
        match analyzer.catalog().table(&db, &name) {
            TableLookup::Loaded(table) => {
                analyzer.register_table(self.unique_alias().to_string(), Arc::clone(&table))?;
                self.table = Some(table);
            }
            TableLookup::Missing => {
                analyzer.add_missing_table(format!("{}.{}", db, name));
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.table = None;
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.join("."))?;
        if let Some(alias) = &self.explicit_alias {
            write!(f, " {}", alias)?;
        }
        Ok(())
    }
}

/// The FROM clause of a statement: an ordered list of table references.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FromClause {
    refs: Vec<TableRef>,
    analyzed: bool,
}

impl FromClause {
    pub fn new(refs: Vec<TableRef>) -> FromClause {
        FromClause {
            refs,
            analyzed: false,
        }
    }

    pub fn table_refs(&self) -> &[TableRef] {
        &self.refs
    }

    /// Resolves every reference and registers its alias in the scope. Tables
    /// the catalog has not loaded are recorded as missing and the clause is
    /// left unanalyzed so a later retry re-resolves them.
    pub fn analyze(&mut self, analyzer: &mut Analyzer) -> Result<()> {
        if self.analyzed {
            return Ok(());
        }
        for table_ref in &mut self.refs {
            table_ref.analyze(analyzer)?;
        }
        if !analyzer.has_missing_tables() {
            self.analyzed = true;
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        self.analyzed = false;
        for table_ref in &mut self.refs {
            table_ref.reset();
        }
    }
}

impl fmt::Display for FromClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let refs: Vec<String> = self.refs.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", refs.join(", "))
    }
}
