//! INSERT ... SELECT statements

use super::check_type_compatibility;
use super::select::SelectStmt;
use crate::catalog::TableLookup;
use crate::error::{Error, Result};
use crate::semantic::analyzer::Analyzer;
use crate::semantic::expr::{Expr, Literal};
use crate::semantic::privilege::{Privilege, PrivilegeRequestBuilder};
use crate::types::schema::Table;
use std::sync::Arc;
use tracing::debug;

/// An INSERT statement feeding a target table from a query.
///
/// The target is normally resolved from `target_path` during analysis. A
/// CREATE TABLE AS SELECT binds a placeholder target up front with
/// [`InsertStmt::set_target`] instead, because its table does not exist until
/// the DDL executor creates it.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStmt {
    /// `[table]` or `[db, table]`.
    target_path: Vec<String>,
    query: SelectStmt,
    target: Option<Arc<Table>>,
    analyzed: bool,
}

impl InsertStmt {
    pub fn new<S: Into<String>>(target_path: Vec<S>, query: SelectStmt) -> InsertStmt {
        InsertStmt {
            target_path: target_path.into_iter().map(Into::into).collect(),
            query,
            target: None,
            analyzed: false,
        }
    }

    pub fn is_analyzed(&self) -> bool {
        self.analyzed
    }

    pub fn query(&self) -> &SelectStmt {
        &self.query
    }

    pub fn target(&self) -> Option<&Arc<Table>> {
        self.target.as_ref()
    }

    /// Binds the target table directly, bypassing catalog resolution.
    pub fn set_target(&mut self, table: Arc<Table>) {
        self.target = Some(table);
    }

    pub fn analyze(&mut self, analyzer: &mut Analyzer) -> Result<()> {
        if self.analyzed {
            return Ok(());
        }

        if self.target.is_none() {
            let (db, name) = analyzer.qualify_table(&self.target_path);
            match analyzer.catalog().table(&db, &name) {
                TableLookup::Loaded(table) => self.target = Some(table),
                TableLookup::Missing => {
                    analyzer.add_missing_table(format!("{}.{}", db, name));
                    return Ok(());
                }
            }
        }
        let table = Arc::clone(self.target.as_ref().expect("target bound above"));

        self.query.analyze(analyzer)?;
        if analyzer.has_missing_tables() {
            return Ok(());
        }

        if self.query.result_exprs().len() != table.columns.len() {
            return Err(Error::TypeError(format!(
                "Target table '{}' has {} columns but the select statement \
                 returns {}",
                table.qualified_name(),
                table.columns.len(),
                self.query.result_exprs().len()
            )));
        }

        // Cast every result expression to its column's type, refusing
        // narrowing.
        let exprs = self.query.result_exprs_mut();
        for (i, column) in table.columns.iter().enumerate() {
            let expr = std::mem::replace(&mut exprs[i], Expr::literal(Literal::Null));
            exprs[i] = check_type_compatibility(&table, column, expr)?;
        }

        analyzer.register_privilege(
            PrivilegeRequestBuilder::new()
                .on_table(&table.db, &table.name)
                .all_of(Privilege::Insert)
                .to_request(),
        );

        debug!(table = %table.qualified_name(), "analyzed insert statement");
        self.analyzed = true;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.analyzed = false;
        self.target = None;
        self.query.reset();
    }
}
