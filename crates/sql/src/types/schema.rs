//! Table and column metadata as surfaced by the catalog

use super::data_type::DataType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Catalog identifier for a table.
///
/// Real identifiers are assigned by the catalog service. The reserved
/// [`TableId::INVALID`] value marks in-memory placeholder tables (used while
/// analyzing a CREATE TABLE AS SELECT whose target does not exist yet) and is
/// distinguishable from every resolvable catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableId(pub u32);

impl TableId {
    pub const INVALID: TableId = TableId(u32::MAX);

    pub fn is_valid(&self) -> bool {
        *self != TableId::INVALID
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "<invalid>")
        }
    }
}

/// On-disk file format of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageFormat {
    Parquet,
    Text,
    Avro,
    SequenceFile,
    RcFile,
}

impl fmt::Display for StorageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageFormat::Parquet => write!(f, "PARQUET"),
            StorageFormat::Text => write!(f, "TEXTFILE"),
            StorageFormat::Avro => write!(f, "AVRO"),
            StorageFormat::SequenceFile => write!(f, "SEQUENCEFILE"),
            StorageFormat::RcFile => write!(f, "RCFILE"),
        }
    }
}

/// The storage family a table belongs to. Only keyed tables support row-level
/// mutation; views support nothing but reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableKind {
    /// Key-addressed storage. `key_columns` is the ordered list of key column
    /// names; keys uniquely identify a row and cannot be reassigned.
    Keyed { key_columns: Vec<String> },
    /// Append-only file storage.
    Append,
    /// A logical view over other tables.
    View,
}

/// A table column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name. Can't be empty.
    pub name: String,
    /// Column datatype.
    pub data_type: DataType,
    /// Whether the column allows null values.
    pub nullable: bool,
    /// Estimated number of distinct values, when statistics are available.
    /// Drives equality-predicate selectivity.
    pub distinct_count: Option<u64>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Column {
            name: name.into(),
            data_type,
            nullable: true,
            distinct_count: None,
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_distinct_count(mut self, count: u64) -> Self {
        self.distinct_count = Some(count);
        self
    }
}

/// A table definition as loaded from the catalog.
///
/// `columns` is the canonical column order: key columns appear in key order
/// wherever the kind is keyed, and mutation statements address columns by
/// position in this list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub id: TableId,
    pub db: String,
    pub name: String,
    pub kind: TableKind,
    pub columns: Vec<Column>,
    pub format: StorageFormat,
    pub location: Option<String>,
}

impl Table {
    pub fn new(id: TableId, db: impl Into<String>, name: impl Into<String>) -> Self {
        Table {
            id,
            db: db.into(),
            name: name.into(),
            kind: TableKind::Append,
            columns: Vec::new(),
            format: StorageFormat::Parquet,
            location: None,
        }
    }

    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_kind(mut self, kind: TableKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_format(mut self, format: StorageFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.db, self.name)
    }

    /// Returns the column with the given name and its canonical position.
    pub fn column(&self, name: &str) -> Option<(usize, &Column)> {
        self.columns
            .iter()
            .enumerate()
            .find(|(_, c)| c.name == name)
    }

    /// Ordered key column names. Empty for non-keyed tables.
    pub fn key_column_names(&self) -> &[String] {
        match &self.kind {
            TableKind::Keyed { key_columns } => key_columns,
            _ => &[],
        }
    }

    pub fn is_view(&self) -> bool {
        matches!(self.kind, TableKind::View)
    }

    /// Whether this table's storage family supports row-level mutation.
    pub fn supports_row_mutation(&self) -> bool {
        matches!(self.kind, TableKind::Keyed { .. })
    }
}

// Formats the table as a SQL CREATE TABLE statement.
impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CREATE TABLE {} (", self.qualified_name())?;
        for (i, column) in self.columns.iter().enumerate() {
            write!(f, "  {} {}", column.name, column.data_type)?;
            if !column.nullable {
                write!(f, " NOT NULL")?;
            }
            if i < self.columns.len() - 1 {
                writeln!(f, ",")?;
            }
        }
        writeln!(f, "\n) STORED AS {}", self.format)
    }
}
