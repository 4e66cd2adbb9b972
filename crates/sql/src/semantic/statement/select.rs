//! SELECT statements
//!
//! Only the shape needed by statement rewriting lives here: a select list, a
//! FROM clause, and an optional filter. Grouping, ordering, and set
//! operations belong to the full query engine.

use super::from_clause::FromClause;
use crate::error::{Error, Result};
use crate::semantic::analyzer::Analyzer;
use crate::semantic::expr::{Expr, ExprKind};
use std::fmt;

/// One entry of a select list.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl SelectItem {
    pub fn new(expr: Expr) -> SelectItem {
        SelectItem { expr, alias: None }
    }

    pub fn with_alias(expr: Expr, alias: impl Into<String>) -> SelectItem {
        SelectItem {
            expr,
            alias: Some(alias.into()),
        }
    }
}

/// A SELECT statement.
///
/// Analysis derives `result_exprs` (the analyzed output expressions) and
/// `col_labels` (one label per output column). Both are cleared by `reset`.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStmt {
    select_list: Vec<SelectItem>,
    from: FromClause,
    where_clause: Option<Expr>,
    result_exprs: Vec<Expr>,
    col_labels: Vec<String>,
    analyzed: bool,
}

impl SelectStmt {
    pub fn new(
        select_list: Vec<SelectItem>,
        from: FromClause,
        where_clause: Option<Expr>,
    ) -> SelectStmt {
        SelectStmt {
            select_list,
            from,
            where_clause,
            result_exprs: Vec::new(),
            col_labels: Vec::new(),
            analyzed: false,
        }
    }

    pub fn is_analyzed(&self) -> bool {
        self.analyzed
    }

    pub fn from_clause(&self) -> &FromClause {
        &self.from
    }

    pub fn where_clause(&self) -> Option<&Expr> {
        self.where_clause.as_ref()
    }

    pub fn result_exprs(&self) -> &[Expr] {
        &self.result_exprs
    }

    pub(crate) fn result_exprs_mut(&mut self) -> &mut Vec<Expr> {
        &mut self.result_exprs
    }

    pub fn col_labels(&self) -> &[String] {
        &self.col_labels
    }

    pub fn analyze(&mut self, analyzer: &mut Analyzer) -> Result<()> {
        if self.analyzed {
            return Ok(());
        }

        self.from.analyze(analyzer)?;
        if analyzer.has_missing_tables() {
            return Ok(());
        }

        for item in &mut self.select_list {
            item.expr.analyze(analyzer)?;
        }
        if let Some(predicate) = &mut self.where_clause {
            predicate.analyze(analyzer)?;
        }
        // Subqueries in the select list or filter may have surfaced more
        // unloaded tables; leave the statement for the retry loop.
        if analyzer.has_missing_tables() {
            return Ok(());
        }

        if let Some(predicate) = &self.where_clause {
            let predicate_type = predicate.resolved_type();
            if !predicate_type.is_boolean() && !predicate_type.is_null() {
                return Err(Error::TypeError(format!(
                    "WHERE clause '{}' requires return type 'BOOLEAN'. \
                     Actual type is '{}'",
                    predicate, predicate_type
                )));
            }
        }

        self.result_exprs = self.select_list.iter().map(|item| item.expr.clone()).collect();
        self.col_labels = self
            .select_list
            .iter()
            .enumerate()
            .map(|(i, item)| Self::label(item, i, analyzer))
            .collect();
        self.analyzed = true;
        Ok(())
    }

    /// The output label of one select item: the explicit alias, the column
    /// name for plain references, otherwise a positional `_cN` label (when
    /// labels must be valid identifiers) or the rendered expression.
    fn label(item: &SelectItem, position: usize, analyzer: &Analyzer) -> String {
        if let Some(alias) = &item.alias {
            return alias.clone();
        }
        if let ExprKind::ColumnRef { path, .. } = item.expr.ignore_implicit_casts().kind() {
            return path.last().expect("empty column reference path").clone();
        }
        if analyzer.options().use_query_column_labels {
            format!("_c{}", position)
        } else {
            item.expr.to_string()
        }
    }

    pub fn reset(&mut self) {
        self.analyzed = false;
        self.result_exprs.clear();
        self.col_labels.clear();
        self.from.reset();
        for item in &mut self.select_list {
            item.expr.reset();
        }
        if let Some(predicate) = &mut self.where_clause {
            predicate.reset();
        }
    }

    /// Deep copy with a fresh, unanalyzed identity; see
    /// [`Expr::clone_unanalyzed`].
    pub fn clone_unanalyzed(&self) -> SelectStmt {
        let mut cloned = self.clone();
        cloned.reset();
        cloned
    }
}

impl fmt::Display for SelectStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<String> = self
            .select_list
            .iter()
            .map(|item| match &item.alias {
                Some(alias) => format!("{} AS {}", item.expr, alias),
                None => item.expr.to_string(),
            })
            .collect();
        write!(f, "SELECT {} FROM {}", items.join(", "), self.from)?;
        if let Some(predicate) = &self.where_clause {
            write!(f, " WHERE {}", predicate)?;
        }
        Ok(())
    }
}
