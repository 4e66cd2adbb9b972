//! Semantic analysis and statement rewriting for the strata SQL frontend
//!
//! This crate is the phase between the parser and the logical planner: it
//! takes a parsed, unresolved statement tree and produces a fully
//! type-resolved, schema-bound tree ready for planning.
//!
//! Analysis is single-threaded and synchronous. Waiting is never expressed
//! inside a component: a table the catalog has not loaded yet is accumulated
//! on the [`semantic::Analyzer`] as a missing table, and the statement is
//! left unanalyzed. Callers drive a load-and-retry loop:
//!
//! 1. `stmt.analyze(&mut analyzer)?`
//! 2. if `analyzer.missing_tables()` is non-empty, load them, then
//!    `stmt.reset()` and re-analyze under a fresh scope.

pub mod catalog;
pub mod error;
pub mod functions;
pub mod semantic;
pub mod types;

pub use error::{Error, Result};
