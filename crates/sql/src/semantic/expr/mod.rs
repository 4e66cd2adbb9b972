//! Expression trees
//!
//! Expressions are built unresolved by the parser and mutated in place by
//! analysis: types are resolved, implicit casts inserted, and selectivity
//! estimates cached. A tree is owned by exactly one in-flight analysis;
//! reusing a predicate across independently-scoped analyses goes through
//! [`Expr::clone_unanalyzed`] so no analysis state is ever shared.

mod predicate;

pub use predicate::create_conjunction;

use crate::error::{Error, Result};
use crate::functions::CompareMode;
use crate::semantic::analyzer::{Analyzer, ResolvedColumn};
use crate::semantic::statement::SelectStmt;
use crate::types::DataType;
use std::fmt;

/// Literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Decimal(rust_decimal::Decimal),
    String(String),
    Date(chrono::NaiveDate),
    Timestamp(chrono::NaiveDateTime),
}

impl Literal {
    /// The literal's resolved type. Integer literals take the smallest type
    /// that can represent the value, so they widen into any column wide
    /// enough to hold them.
    pub fn data_type(&self) -> DataType {
        match self {
            Literal::Null => DataType::Null,
            Literal::Boolean(_) => DataType::Bool,
            Literal::Integer(v) => {
                if i8::try_from(*v).is_ok() {
                    DataType::I8
                } else if i16::try_from(*v).is_ok() {
                    DataType::I16
                } else if i32::try_from(*v).is_ok() {
                    DataType::I32
                } else {
                    DataType::I64
                }
            }
            Literal::Float(_) => DataType::F64,
            Literal::Decimal(_) => DataType::Decimal(None, None),
            Literal::String(_) => DataType::Str,
            Literal::Date(_) => DataType::Date,
            Literal::Timestamp(_) => DataType::Timestamp,
        }
    }

    fn selectivity(&self) -> Option<f64> {
        match self {
            Literal::Boolean(true) => Some(1.0),
            Literal::Boolean(false) => Some(0.0),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "NULL"),
            Literal::Boolean(true) => write!(f, "TRUE"),
            Literal::Boolean(false) => write!(f, "FALSE"),
            Literal::Integer(v) => write!(f, "{}", v),
            Literal::Float(v) => write!(f, "{}", v),
            Literal::Decimal(v) => write!(f, "{}", v),
            Literal::String(v) => write!(f, "'{}'", v.replace('\'', "''")),
            Literal::Date(v) => write!(f, "DATE '{}'", v),
            Literal::Timestamp(v) => write!(f, "TIMESTAMP '{}'", v),
        }
    }
}

/// AND / OR / NOT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompoundOp {
    And,
    Or,
    Not,
}

impl CompoundOp {
    pub fn name(&self) -> &'static str {
        match self {
            CompoundOp::And => "AND",
            CompoundOp::Or => "OR",
            CompoundOp::Not => "NOT",
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            CompoundOp::Not => 1,
            _ => 2,
        }
    }
}

/// Binary comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "!=",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
        }
    }

    /// The operator whose result is the logical negation of this one.
    pub fn negated(&self) -> CompareOp {
        match self {
            CompareOp::Eq => CompareOp::NotEq,
            CompareOp::NotEq => CompareOp::Eq,
            CompareOp::Lt => CompareOp::GtEq,
            CompareOp::LtEq => CompareOp::Gt,
            CompareOp::Gt => CompareOp::LtEq,
            CompareOp::GtEq => CompareOp::Lt,
        }
    }
}

/// Binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl ArithmeticOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Subtract => "-",
            ArithmeticOp::Multiply => "*",
            ArithmeticOp::Divide => "/",
        }
    }
}

/// The closed set of expression kinds. Every match over this enum is
/// exhaustive, so adding a kind forces every analysis site to handle it.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    /// A column (or struct field) reference: `col`, `alias.col`,
    /// `alias.col.field`.
    ColumnRef {
        path: Vec<String>,
        resolved: Option<ResolvedColumn>,
    },
    /// Two children.
    Compare(CompareOp),
    /// Two children.
    Arithmetic(ArithmeticOp),
    /// AND/OR take two children, NOT takes one.
    Compound(CompoundOp),
    /// One child: `x IS [NOT] NULL`.
    IsNull { negated: bool },
    /// One child. Implicit casts are inserted by analysis and stripped again
    /// by [`Expr::reset`]; explicit casts come from the parser.
    Cast { target: DataType, implicit: bool },
    /// A scalar subquery.
    Subquery(Box<SelectStmt>),
}

/// An analyzable expression node.
///
/// Invariant: `analyzed` implies every child is analyzed and `data_type` is
/// set. `selectivity` is a cached estimate in `[0.0, 1.0]`; `None` means
/// unknown and is never defaulted to a number.
#[derive(Debug, Clone)]
pub struct Expr {
    kind: ExprKind,
    children: Vec<Expr>,
    data_type: Option<DataType>,
    analyzed: bool,
    selectivity: Option<f64>,
}

/// Structural equality: operator/kind and children, ignoring analysis state.
impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        let kind_eq = match (&self.kind, &other.kind) {
            // The resolved binding is analysis state, not syntax.
            (ExprKind::ColumnRef { path: a, .. }, ExprKind::ColumnRef { path: b, .. }) => a == b,
            (a, b) => a == b,
        };
        kind_eq && self.children == other.children
    }
}

impl Expr {
    fn new(kind: ExprKind, children: Vec<Expr>) -> Expr {
        Expr {
            kind,
            children,
            data_type: None,
            analyzed: false,
            selectivity: None,
        }
    }

    pub fn literal(literal: Literal) -> Expr {
        Expr::new(ExprKind::Literal(literal), Vec::new())
    }

    pub fn column<S: Into<String>>(path: Vec<S>) -> Expr {
        Expr::new(
            ExprKind::ColumnRef {
                path: path.into_iter().map(Into::into).collect(),
                resolved: None,
            },
            Vec::new(),
        )
    }

    pub fn compare(op: CompareOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::new(ExprKind::Compare(op), vec![lhs, rhs])
    }

    pub fn arithmetic(op: ArithmeticOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::new(ExprKind::Arithmetic(op), vec![lhs, rhs])
    }

    pub fn and(lhs: Expr, rhs: Expr) -> Expr {
        Expr::new(ExprKind::Compound(CompoundOp::And), vec![lhs, rhs])
    }

    pub fn or(lhs: Expr, rhs: Expr) -> Expr {
        Expr::new(ExprKind::Compound(CompoundOp::Or), vec![lhs, rhs])
    }

    pub fn not(child: Expr) -> Expr {
        Expr::new(ExprKind::Compound(CompoundOp::Not), vec![child])
    }

    pub fn is_null(child: Expr, negated: bool) -> Expr {
        Expr::new(ExprKind::IsNull { negated }, vec![child])
    }

    pub fn explicit_cast(target: DataType, child: Expr) -> Expr {
        Expr::new(
            ExprKind::Cast {
                target,
                implicit: false,
            },
            vec![child],
        )
    }

    pub fn subquery(stmt: SelectStmt) -> Expr {
        Expr::new(ExprKind::Subquery(Box::new(stmt)), Vec::new())
    }

    /// Wraps an already-analyzed expression in an analyzed implicit cast.
    pub(crate) fn implicit_cast(target: DataType, inner: Expr) -> Expr {
        let selectivity = inner.selectivity;
        Expr {
            kind: ExprKind::Cast {
                target: target.clone(),
                implicit: true,
            },
            children: vec![inner],
            data_type: Some(target),
            analyzed: true,
            selectivity,
        }
    }

    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    pub fn children(&self) -> &[Expr] {
        &self.children
    }

    pub fn is_analyzed(&self) -> bool {
        self.analyzed
    }

    pub fn data_type(&self) -> Option<&DataType> {
        self.data_type.as_ref()
    }

    pub fn selectivity(&self) -> Option<f64> {
        self.selectivity
    }

    /// The resolved column this reference is bound to, if this is an
    /// analyzed column reference.
    pub fn resolved_column(&self) -> Option<&ResolvedColumn> {
        match &self.kind {
            ExprKind::ColumnRef { resolved, .. } => resolved.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn resolved_type(&self) -> &DataType {
        self.data_type
            .as_ref()
            .expect("expression analyzed without a resolved type")
    }

    /// The expression beneath any implicit casts.
    pub fn ignore_implicit_casts(&self) -> &Expr {
        match &self.kind {
            ExprKind::Cast { implicit: true, .. } => self.children[0].ignore_implicit_casts(),
            _ => self,
        }
    }

    pub fn contains_subquery(&self) -> bool {
        matches!(self.kind, ExprKind::Subquery(_))
            || self.children.iter().any(Expr::contains_subquery)
    }

    /// Analyzes this expression in place: resolves children, binds column
    /// references, resolves operator signatures, inserts implicit casts, and
    /// caches a selectivity estimate. No-op if already analyzed.
    pub fn analyze(&mut self, analyzer: &mut Analyzer) -> Result<()> {
        if self.analyzed {
            return Ok(());
        }

        if let ExprKind::Subquery(stmt) = &mut self.kind {
            analyzer.note_subquery();
            let mut scope = analyzer.child();
            stmt.analyze(&mut scope)?;
        }
        for child in &mut self.children {
            child.analyze(analyzer)?;
        }
        // A child may have surfaced an unloaded table (through a subquery's
        // FROM clause). Leave the tree unanalyzed for the load-and-retry
        // loop rather than resolving against half a scope.
        if analyzer.has_missing_tables() {
            return Ok(());
        }

        match &self.kind {
            ExprKind::Literal(literal) => {
                self.data_type = Some(literal.data_type());
                self.selectivity = literal.selectivity();
            }
            ExprKind::ColumnRef { .. } => self.analyze_column_ref(analyzer)?,
            ExprKind::Compare(op) => {
                let op = *op;
                self.analyze_comparison(op, analyzer)?;
            }
            ExprKind::Arithmetic(op) => {
                let op = *op;
                self.analyze_arithmetic(op, analyzer)?;
            }
            ExprKind::Compound(_) => self.analyze_compound(analyzer)?,
            ExprKind::IsNull { .. } => {
                self.data_type = Some(DataType::Bool);
            }
            ExprKind::Cast { target, .. } => {
                let target = target.clone();
                let child_type = self.children[0].resolved_type();
                if target.is_complex() || child_type.is_complex() {
                    return Err(Error::TypeError(format!(
                        "Invalid cast of '{}' from {} to {}",
                        self.children[0], child_type, target
                    )));
                }
                self.selectivity = self.children[0].selectivity;
                self.data_type = Some(target);
            }
            ExprKind::Subquery(stmt) => {
                let data_type = stmt
                    .result_exprs()
                    .first()
                    .and_then(|e| e.data_type().cloned())
                    .unwrap_or(DataType::Null);
                self.data_type = Some(data_type);
            }
        }

        self.analyzed = true;
        Ok(())
    }

    fn analyze_column_ref(&mut self, analyzer: &Analyzer) -> Result<()> {
        let ExprKind::ColumnRef { path, resolved } = &mut self.kind else {
            unreachable!("analyze_column_ref on a non-column expression")
        };
        let binding = analyzer.resolve_column(path)?;
        self.data_type = Some(binding.data_type.clone());
        *resolved = Some(binding);
        Ok(())
    }

    fn analyze_comparison(&mut self, op: CompareOp, analyzer: &Analyzer) -> Result<()> {
        let arg_types: Vec<DataType> = self
            .children
            .iter()
            .map(|c| c.resolved_type().clone())
            .collect();
        let registry = analyzer.registry();
        let signature =
            registry.resolve(op.symbol(), &arg_types, CompareMode::NonStrictSupertype)?;
        let args = signature.args.clone();
        self.cast_children_to(&args);
        self.data_type = Some(DataType::Bool);
        if op == CompareOp::Eq {
            self.selectivity = self.equality_selectivity(analyzer);
        }
        Ok(())
    }

    fn analyze_arithmetic(&mut self, op: ArithmeticOp, analyzer: &Analyzer) -> Result<()> {
        let arg_types: Vec<DataType> = self
            .children
            .iter()
            .map(|c| c.resolved_type().clone())
            .collect();
        let registry = analyzer.registry();
        let signature =
            registry.resolve(op.symbol(), &arg_types, CompareMode::NonStrictSupertype)?;
        let (args, ret) = (signature.args.clone(), signature.ret.clone());
        self.cast_children_to(&args);
        self.data_type = Some(ret);
        Ok(())
    }

    /// Inserts implicit casts so each child matches the resolved signature.
    /// NULL-typed children are left alone; every operator accepts them as-is.
    pub(crate) fn cast_children_to(&mut self, targets: &[DataType]) {
        for (child, target) in self.children.iter_mut().zip(targets) {
            let child_type = child.resolved_type();
            if child_type != target && !child_type.is_null() {
                let inner = std::mem::replace(child, Expr::literal(Literal::Null));
                *child = Expr::implicit_cast(target.clone(), inner);
            }
        }
    }

    /// `1 / distinct_count` for a column-vs-literal equality, when the column
    /// carries a distinct-value estimate.
    fn equality_selectivity(&self, analyzer: &Analyzer) -> Option<f64> {
        let lhs = self.children[0].ignore_implicit_casts();
        let rhs = self.children[1].ignore_implicit_casts();
        let column = match (&lhs.kind, &rhs.kind) {
            (ExprKind::ColumnRef { .. }, ExprKind::Literal(_)) => lhs.resolved_column()?,
            (ExprKind::Literal(_), ExprKind::ColumnRef { .. }) => rhs.resolved_column()?,
            _ => return None,
        };
        let table = &analyzer.find_registered(&column.table_alias)?.table;
        let distinct = table.columns[column.index].distinct_count?;
        (distinct > 0).then(|| 1.0 / distinct as f64)
    }

    /// Casts this (analyzed) expression to `target`, inserting an implicit
    /// cast when the types differ. NULL-typed expressions are returned
    /// unchanged.
    pub fn cast_to(self, target: &DataType) -> Expr {
        let unchanged = self
            .data_type()
            .is_some_and(|t| t == target || t.is_null());
        if unchanged {
            self
        } else {
            Expr::implicit_cast(target.clone(), self)
        }
    }

    /// Clears all state populated by analysis, including implicit casts, so
    /// the same syntactic tree can be re-analyzed from scratch.
    pub fn reset(&mut self) {
        while matches!(self.kind, ExprKind::Cast { implicit: true, .. }) {
            let inner = self.children.pop().expect("cast node without a child");
            *self = inner;
        }
        self.analyzed = false;
        self.data_type = None;
        self.selectivity = None;
        match &mut self.kind {
            ExprKind::ColumnRef { resolved, .. } => *resolved = None,
            ExprKind::Subquery(stmt) => stmt.reset(),
            _ => {}
        }
        for child in &mut self.children {
            child.reset();
        }
    }

    /// Deep copy with a fresh, unanalyzed identity. Reusing a tree across two
    /// independently-scoped analyses must go through this so the analyses
    /// never share mutable state.
    pub fn clone_unanalyzed(&self) -> Expr {
        let mut cloned = self.clone();
        cloned.reset();
        cloned
    }

    /// Logical negation without introducing a NOT wrapper where avoidable:
    /// NOT folds into its child, AND/OR apply De Morgan recursively,
    /// comparisons flip their operator, and everything else is wrapped.
    /// The returned tree is unanalyzed.
    pub fn negate(&self) -> Expr {
        match &self.kind {
            ExprKind::Compound(CompoundOp::Not) => self.children[0].clone_unanalyzed(),
            ExprKind::Compound(CompoundOp::And) => {
                Expr::or(self.children[0].negate(), self.children[1].negate())
            }
            ExprKind::Compound(CompoundOp::Or) => {
                Expr::and(self.children[0].negate(), self.children[1].negate())
            }
            ExprKind::Compare(op) => {
                let mut negated = self.clone_unanalyzed();
                negated.kind = ExprKind::Compare(op.negated());
                negated
            }
            ExprKind::IsNull { negated } => {
                let mut flipped = self.clone_unanalyzed();
                flipped.kind = ExprKind::IsNull { negated: !negated };
                flipped
            }
            _ => Expr::not(self.clone_unanalyzed()),
        }
    }
}

// Renders the SQL form of the expression. Implicit casts are invisible so
// diagnostics show what the user wrote.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Literal(literal) => write!(f, "{}", literal),
            ExprKind::ColumnRef { path, .. } => write!(f, "{}", path.join(".")),
            ExprKind::Compare(op) => {
                write!(f, "{} {} {}", self.children[0], op.symbol(), self.children[1])
            }
            ExprKind::Arithmetic(op) => {
                write!(f, "{} {} {}", self.children[0], op.symbol(), self.children[1])
            }
            ExprKind::Compound(CompoundOp::Not) => write!(f, "NOT {}", self.children[0]),
            ExprKind::Compound(op) => {
                write!(f, "{} {} {}", self.children[0], op.name(), self.children[1])
            }
            ExprKind::IsNull { negated: false } => write!(f, "{} IS NULL", self.children[0]),
            ExprKind::IsNull { negated: true } => write!(f, "{} IS NOT NULL", self.children[0]),
            ExprKind::Cast {
                implicit: true, ..
            } => write!(f, "{}", self.children[0]),
            ExprKind::Cast { target, .. } => {
                write!(f, "CAST({} AS {})", self.children[0], target)
            }
            ExprKind::Subquery(stmt) => write!(f, "({})", stmt),
        }
    }
}
