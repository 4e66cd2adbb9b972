//! Semantic analysis for SQL statements
//!
//! This layer sits between parsing and logical planning. It takes the
//! parser's unresolved trees and produces fully type-resolved,
//! constraint-checked, schema-bound trees:
//!
//! - resolves table and column references against the catalog
//! - resolves operator signatures and inserts implicit widening casts
//! - normalizes and estimates boolean predicates
//! - rewrites statements whose semantics are expressed through a synthesized
//!   internal statement (CREATE TABLE AS SELECT, UPDATE, DELETE)

pub mod analyzer;
pub mod expr;
pub mod privilege;
pub mod statement;

pub use analyzer::{Analyzer, AnalyzerOptions, ResolvedColumn};
pub use privilege::{Privilege, PrivilegeRequest, PrivilegeRequestBuilder};
pub use expr::{
    create_conjunction, ArithmeticOp, CompareOp, CompoundOp, Expr, ExprKind, Literal,
};
pub use statement::{
    ColumnDef, CreateTableAsSelectStmt, CreateTableStmt, CtasState, FromClause, InsertStmt,
    ModifyKind, ModifyStmt, SelectItem, SelectStmt, Statement, TableRef,
};
