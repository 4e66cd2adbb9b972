//! Statement trees
//!
//! Statements are analyzable and resettable: `analyze` is a no-op once a
//! statement is analyzed, and `reset` clears everything analysis populated
//! (but never the syntactic input) so the same parsed tree can be
//! re-analyzed after a catalog load or a rewrite pass invalidated it.

mod create_table;
mod create_table_as_select;
mod from_clause;
mod insert;
mod modify;
mod select;

pub use create_table::{ColumnDef, CreateTableStmt};
pub use create_table_as_select::{CreateTableAsSelectStmt, CtasState};
pub use from_clause::{FromClause, TableRef};
pub use insert::InsertStmt;
pub use modify::{ModifyKind, ModifyStmt};
pub use select::{SelectItem, SelectStmt};

use crate::error::{Error, Result};
use crate::semantic::analyzer::Analyzer;
use crate::semantic::expr::Expr;
use crate::types::schema::{Column, Table};
use crate::types::DataType;

/// The closed set of statements this layer analyzes.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStmt),
    Insert(InsertStmt),
    CreateTable(CreateTableStmt),
    CreateTableAsSelect(CreateTableAsSelectStmt),
    Update(ModifyStmt),
    Delete(ModifyStmt),
}

impl Statement {
    pub fn analyze(&mut self, analyzer: &mut Analyzer) -> Result<()> {
        match self {
            Statement::Select(stmt) => stmt.analyze(analyzer),
            Statement::Insert(stmt) => stmt.analyze(analyzer),
            Statement::CreateTable(stmt) => stmt.analyze(analyzer),
            Statement::CreateTableAsSelect(stmt) => stmt.analyze(analyzer),
            Statement::Update(stmt) | Statement::Delete(stmt) => stmt.analyze(analyzer),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Statement::Select(stmt) => stmt.reset(),
            Statement::Insert(stmt) => stmt.reset(),
            Statement::CreateTable(stmt) => stmt.reset(),
            Statement::CreateTableAsSelect(stmt) => stmt.reset(),
            Statement::Update(stmt) | Statement::Delete(stmt) => stmt.reset(),
        }
    }

    pub fn is_analyzed(&self) -> bool {
        match self {
            Statement::Select(stmt) => stmt.is_analyzed(),
            Statement::Insert(stmt) => stmt.is_analyzed(),
            Statement::CreateTable(stmt) => stmt.is_analyzed(),
            Statement::CreateTableAsSelect(stmt) => stmt.is_analyzed(),
            Statement::Update(stmt) | Statement::Delete(stmt) => stmt.is_analyzed(),
        }
    }
}

/// Checks that `expr` can be assigned into `column`, and returns the
/// (possibly cast) expression.
///
/// Identical non-complex types are trivially compatible. Otherwise the
/// widest type both sides are assignment-compatible with is computed;
/// narrowing into the column is never allowed silently, so a compatible type
/// wider than the column's (and not NULL) is a precision-loss error.
pub(crate) fn check_type_compatibility(
    table: &Table,
    column: &Column,
    expr: Expr,
) -> Result<Expr> {
    let col_type = &column.data_type;
    let expr_type = expr
        .data_type()
        .expect("unanalyzed expression in type-compatibility check")
        .clone();
    if *col_type == expr_type && !col_type.is_complex() {
        return Ok(expr);
    }

    let Some(compatible) = DataType::assignment_compatible(col_type, &expr_type) else {
        return Err(Error::IncompatibleTypes(format!(
            "Target table '{}' is incompatible with source expressions. \
             Expression '{}' (type: {}) is not compatible with column '{}' \
             (type: {})",
            table.qualified_name(),
            expr,
            expr_type,
            column.name,
            col_type
        )));
    };
    if compatible != *col_type && !compatible.is_null() {
        return Err(Error::PrecisionLoss(format!(
            "Possible loss of precision for target table '{}'. Expression \
             '{}' (type: {}) would need to be cast to {} for column '{}'",
            table.qualified_name(),
            expr,
            expr_type,
            col_type,
            column.name
        )));
    }
    Ok(expr.cast_to(&compatible))
}
