//! Error types for semantic analysis

use crate::catalog::CatalogError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Analysis failures. Every variant carries a message built from the rendered
/// SQL form of the offending node, so diagnostics can be shown to the user
/// verbatim.
///
/// Analysis fails fast: the first violation aborts the whole statement. The
/// two recoverable conditions (missing catalog tables, a pending subquery
/// rewrite) are never reported through this type; they are early returns
/// recorded on the [`Analyzer`](crate::semantic::Analyzer).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Expression typing
    #[error("Type error: {0}")]
    TypeError(String),

    #[error("No matching function: {0}")]
    NoMatchingFunction(String),

    #[error("Ambiguous function call: {0}")]
    AmbiguousFunction(String),

    // Target resolution
    #[error("{0}")]
    InvalidTableReference(String),

    #[error("{0}")]
    NotATableAlias(String),

    #[error("Cannot modify view: {0}")]
    CannotModifyView(String),

    #[error("{0}")]
    UnsupportedTableKind(String),

    // Assignment validation
    #[error("{0}")]
    ForeignColumnAssignment(String),

    #[error("{0}")]
    InvalidAssignmentTarget(String),

    #[error("Key column '{0}' cannot be updated")]
    KeyColumnImmutable(String),

    #[error("Duplicate value assignment to column: '{0}'")]
    DuplicateAssignment(String),

    #[error("Subqueries are not supported as update expressions for column '{0}'")]
    SubqueryNotAllowedInAssignment(String),

    // Casting
    #[error("{0}")]
    IncompatibleTypes(String),

    #[error("{0}")]
    PrecisionLoss(String),

    // Schema inference
    #[error("Partition column name mismatch: {expected} != {actual}")]
    PartitionColumnMismatch { expected: String, actual: String },

    #[error(
        "Number of partition columns ({given}) must be smaller than the \
         number of columns in the select statement ({total})"
    )]
    TooManyPartitionColumns { given: usize, total: usize },

    #[error(
        "CREATE TABLE AS SELECT does not support the {format} file format. \
         Supported formats are: {supported}"
    )]
    UnsupportedInsertFormat { format: String, supported: String },

    #[error("Database does not exist: {0}")]
    DatabaseNotFound(String),

    // Collaborator failures
    #[error("Failed to access catalog metadata: {0}")]
    CatalogAccess(#[from] CatalogError),
}
