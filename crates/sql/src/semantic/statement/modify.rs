//! UPDATE and DELETE lowering
//!
//! A mutation statement is rewritten into a projection over the rows it
//! touches: the target table's key columns first (in key order), then the
//! assignment values in statement order. The plan generated from that
//! projection produces every row to modify; `referenced_columns` says which
//! canonical target-table position each projected expression is written to.
//!
//! Only keyed tables can be modified, and never through a view.

use super::check_type_compatibility;
use super::from_clause::FromClause;
use super::select::{SelectItem, SelectStmt};
use crate::error::{Error, Result};
use crate::semantic::analyzer::Analyzer;
use crate::semantic::expr::{Expr, Literal};
use crate::semantic::privilege::{Privilege, PrivilegeRequestBuilder};
use crate::types::schema::Table;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifyKind {
    Update,
    Delete,
}

/// A row-mutation statement (UPDATE or DELETE).
///
/// Syntactic input: the target table path (an alias into the FROM clause),
/// the FROM clause, the SET assignments (empty for DELETE), an optional
/// filter, and whether "row not found" outcomes are ignored at execution
/// time. Everything else is derived by analysis; the synthesized projection
/// is built once per statement instance and reused across resets.
#[derive(Debug, Clone, PartialEq)]
pub struct ModifyStmt {
    kind: ModifyKind,
    target_path: Vec<String>,
    from: FromClause,
    /// `(target column reference, value expression)` pairs, in statement
    /// order.
    assignments: Vec<(Expr, Expr)>,
    filter: Option<Expr>,
    ignore_not_found: bool,
    // Derived state.
    target: Option<Arc<Table>>,
    target_alias: Option<String>,
    source: Option<SelectStmt>,
    /// Entry `i` is the canonical target-table position written by source
    /// result expression `i`.
    referenced_columns: Vec<usize>,
    analyzed: bool,
}

impl ModifyStmt {
    pub fn update<S: Into<String>>(
        target_path: Vec<S>,
        from: FromClause,
        assignments: Vec<(Expr, Expr)>,
        filter: Option<Expr>,
        ignore_not_found: bool,
    ) -> ModifyStmt {
        ModifyStmt {
            kind: ModifyKind::Update,
            target_path: target_path.into_iter().map(Into::into).collect(),
            from,
            assignments,
            filter,
            ignore_not_found,
            target: None,
            target_alias: None,
            source: None,
            referenced_columns: Vec::new(),
            analyzed: false,
        }
    }

    pub fn delete<S: Into<String>>(
        target_path: Vec<S>,
        from: FromClause,
        filter: Option<Expr>,
        ignore_not_found: bool,
    ) -> ModifyStmt {
        let mut stmt = ModifyStmt::update(target_path, from, Vec::new(), filter, ignore_not_found);
        stmt.kind = ModifyKind::Delete;
        stmt
    }

    pub fn kind(&self) -> ModifyKind {
        self.kind
    }

    pub fn is_analyzed(&self) -> bool {
        self.analyzed
    }

    pub fn ignore_not_found(&self) -> bool {
        self.ignore_not_found
    }

    pub fn target(&self) -> Option<&Arc<Table>> {
        self.target.as_ref()
    }

    /// The synthesized projection producing the rows to modify.
    pub fn source_stmt(&self) -> Option<&SelectStmt> {
        self.source.as_ref()
    }

    pub fn referenced_columns(&self) -> &[usize] {
        &self.referenced_columns
    }

    /// Analyzes the FROM clause, resolves the target table through its
    /// alias, validates the assignments, and builds and analyzes the
    /// synthesized projection.
    pub fn analyze(&mut self, analyzer: &mut Analyzer) -> Result<()> {
        if self.analyzed {
            return Ok(());
        }

        self.from.analyze(analyzer)?;
        if analyzer.has_missing_tables() {
            return Ok(());
        }

        let (alias, table) = self.resolve_target(analyzer)?;
        if table.is_view() {
            return Err(Error::CannotModifyView(format!(
                "'{}'",
                self.target_path.join(".")
            )));
        }
        if !table.supports_row_mutation() {
            return Err(Error::UnsupportedTableKind(format!(
                "Cannot modify a non-keyed table: {}",
                table.qualified_name()
            )));
        }
        self.target = Some(Arc::clone(&table));
        self.target_alias = Some(alias.clone());

        // No distinct UPDATE/DELETE requirement exists in the privilege
        // model; write access is the INSERT-level requirement.
        analyzer.register_privilege(
            PrivilegeRequestBuilder::new()
                .on_table(&table.db, &table.name)
                .all_of(Privilege::Insert)
                .to_request(),
        );

        // The projection is only built once per statement instance; later
        // analyses reuse it and just recompute the column-index map.
        if self.source.is_none() {
            self.build_source_stmt(analyzer, &alias, &table)?;
        } else if self.referenced_columns.is_empty() {
            self.rebuild_column_map(&table);
        }

        let source = self.source.as_mut().expect("source statement built above");
        source.analyze(analyzer)?;
        if analyzer.has_missing_tables() {
            return Ok(());
        }

        if self.kind == ModifyKind::Update {
            // The projection's own analysis may have altered expression
            // types; re-cast each assigned value to its declared target type.
            let key_count = table.key_column_names().len();
            let exprs = source.result_exprs_mut();
            for i in key_count..exprs.len() {
                let declared = self.assignments[i - key_count].0.resolved_type().clone();
                let expr = std::mem::replace(&mut exprs[i], Expr::literal(Literal::Null));
                exprs[i] = expr.cast_to(&declared);
            }
        }

        debug!(
            table = %table.qualified_name(),
            projection = self.referenced_columns.len(),
            "lowered modify statement"
        );
        self.analyzed = true;
        Ok(())
    }

    /// Resolves the target table path as an alias within the FROM clause's
    /// scope. Exactly one resolution is expected, and it must terminate at a
    /// table alias rather than a column.
    fn resolve_target(&self, analyzer: &Analyzer) -> Result<(String, Arc<Table>)> {
        let joined = self.target_path.join(".");
        if let Some(registered) = analyzer.find_registered(&joined) {
            return Ok((registered.alias.clone(), Arc::clone(&registered.table)));
        }

        // A path that enters a registered alias (or names a bare column)
        // resolves to a column, not a table.
        let into_alias =
            self.target_path.len() > 1 && analyzer.find_registered(&self.target_path[0]).is_some();
        let bare_column = self.target_path.len() == 1
            && analyzer
                .registered_tables()
                .iter()
                .any(|r| r.table.column(&joined).is_some());
        if into_alias || bare_column {
            return Err(Error::NotATableAlias(format!(
                "'{}' is not a table alias. Using the FROM clause requires the \
                 target table to be a table alias.",
                joined
            )));
        }

        Err(Error::InvalidTableReference(format!(
            "'{}' is not a valid table alias or reference.",
            joined
        )))
    }

    /// Builds and validates the synthesized projection. The select list
    /// contains a reference for each key column first, followed by the
    /// assignment values; `referenced_columns` records each one's canonical
    /// position in the target table.
    fn build_source_stmt(
        &mut self,
        analyzer: &mut Analyzer,
        alias: &str,
        table: &Arc<Table>,
    ) -> Result<()> {
        let mut select_list = Vec::new();
        let mut referenced = Vec::new();
        let mut key_positions = HashSet::new();
        let mut assigned = HashSet::new();

        for key in table.key_column_names() {
            let mut key_ref = Expr::column(vec![alias.to_string(), key.clone()]);
            key_ref.analyze(analyzer)?;
            let index = key_ref
                .resolved_column()
                .expect("key column reference must resolve against its own table")
                .index;
            key_positions.insert(index);
            assigned.insert(index);
            referenced.push(index);
            select_list.push(SelectItem::new(key_ref));
        }

        for (lhs, rhs) in &mut self.assignments {
            rhs.analyze(analyzer)?;
            lhs.analyze(analyzer)?;

            let Some(resolved) = lhs.resolved_column().cloned() else {
                return Err(Error::InvalidAssignmentTarget(format!(
                    "Left-hand side in assignment expression '{}={}' must be \
                     a column reference",
                    lhs, rhs
                )));
            };
            if resolved.table_alias != alias {
                return Err(Error::ForeignColumnAssignment(format!(
                    "Left-hand side column '{}' in assignment expression \
                     '{}={}' does not belong to target table '{}'",
                    lhs,
                    lhs,
                    rhs,
                    table.qualified_name()
                )));
            }
            if rhs.contains_subquery() {
                return Err(Error::SubqueryNotAllowedInAssignment(lhs.to_string()));
            }
            // A path into a nested field is not an assignable column.
            if !resolved.field_path.is_empty() {
                return Err(Error::InvalidAssignmentTarget(format!(
                    "Left-hand side in assignment expression '{}={}' must be \
                     a column reference",
                    lhs, rhs
                )));
            }
            if key_positions.contains(&resolved.index) {
                return Err(Error::KeyColumnImmutable(lhs.to_string()));
            }
            if assigned.contains(&resolved.index) {
                return Err(Error::DuplicateAssignment(lhs.to_string()));
            }

            let column = &table.columns[resolved.index];
            let value = check_type_compatibility(table, column, rhs.clone())?;
            assigned.insert(resolved.index);
            referenced.push(resolved.index);
            select_list.push(SelectItem::new(value));
        }

        self.referenced_columns = referenced;
        self.source = Some(SelectStmt::new(
            select_list,
            self.from.clone(),
            self.filter.clone(),
        ));
        Ok(())
    }

    /// Recomputes the column-index map from the already-validated
    /// assignments after a reset cleared it.
    fn rebuild_column_map(&mut self, table: &Table) {
        let mut referenced = Vec::new();
        for key in table.key_column_names() {
            let (index, _) = table.column(key).expect("key column exists");
            referenced.push(index);
        }
        for (lhs, _) in &self.assignments {
            let resolved = lhs
                .resolved_column()
                .expect("assignment target resolved by the first analysis");
            referenced.push(resolved.index);
        }
        self.referenced_columns = referenced;
    }

    /// Clears the resolved target and column-index map and recursively
    /// resets the FROM clause and the synthesized projection. The assignment
    /// and filter syntax is preserved, so the statement can be re-analyzed
    /// without re-parsing.
    pub fn reset(&mut self) {
        self.analyzed = false;
        self.target = None;
        self.target_alias = None;
        self.referenced_columns.clear();
        self.from.reset();
        if let Some(source) = &mut self.source {
            source.reset();
        }
    }
}
