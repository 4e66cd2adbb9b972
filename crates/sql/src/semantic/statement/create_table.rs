//! CREATE TABLE descriptors

use crate::error::{Error, Result};
use crate::semantic::analyzer::Analyzer;
use crate::semantic::privilege::Privilege;
use crate::types::schema::StorageFormat;
use crate::types::DataType;

/// A column definition: label plus type.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: DataType) -> ColumnDef {
        ColumnDef {
            name: name.into(),
            data_type,
        }
    }
}

/// A CREATE TABLE statement.
///
/// When wrapped in a CREATE TABLE AS SELECT the column lists are not
/// syntactic input: schema inference derives them from the query and the
/// location may be back-filled with what the catalog would assign.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStmt {
    db: Option<String>,
    name: String,
    column_defs: Vec<ColumnDef>,
    partition_column_defs: Vec<ColumnDef>,
    format: StorageFormat,
    location: Option<String>,
    analyzed: bool,
}

impl CreateTableStmt {
    pub fn new(db: Option<String>, name: impl Into<String>) -> CreateTableStmt {
        CreateTableStmt {
            db,
            name: name.into(),
            column_defs: Vec::new(),
            partition_column_defs: Vec::new(),
            format: StorageFormat::Parquet,
            location: None,
            analyzed: false,
        }
    }

    pub fn with_format(mut self, format: StorageFormat) -> CreateTableStmt {
        self.format = format;
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> CreateTableStmt {
        self.location = Some(location.into());
        self
    }

    pub fn with_columns(mut self, column_defs: Vec<ColumnDef>) -> CreateTableStmt {
        self.column_defs = column_defs;
        self
    }

    /// The explicit database of the CREATE statement, if one was given.
    pub fn db(&self) -> Option<&String> {
        self.db.as_ref()
    }

    /// The database this table is created in, given the session default.
    pub fn database<'a>(&'a self, default_db: &'a str) -> &'a str {
        self.db.as_deref().unwrap_or(default_db)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> StorageFormat {
        self.format
    }

    pub fn location(&self) -> Option<&String> {
        self.location.as_ref()
    }

    pub fn set_location(&mut self, location: String) {
        self.location = Some(location);
    }

    pub fn column_defs(&self) -> &[ColumnDef] {
        &self.column_defs
    }

    pub fn set_column_defs(&mut self, column_defs: Vec<ColumnDef>) {
        self.column_defs = column_defs;
    }

    pub fn partition_column_defs(&self) -> &[ColumnDef] {
        &self.partition_column_defs
    }

    pub fn set_partition_column_defs(&mut self, column_defs: Vec<ColumnDef>) {
        self.partition_column_defs = column_defs;
    }

    pub fn is_analyzed(&self) -> bool {
        self.analyzed
    }

    pub fn analyze(&mut self, analyzer: &mut Analyzer) -> Result<()> {
        if self.analyzed {
            return Ok(());
        }

        if !is_valid_identifier(&self.name) {
            return Err(Error::InvalidTableReference(format!(
                "Invalid table name: '{}'",
                self.name
            )));
        }
        if let Some(db) = &self.db {
            if !is_valid_identifier(db) {
                return Err(Error::InvalidTableReference(format!(
                    "Invalid database name: '{}'",
                    db
                )));
            }
        }

        let db_name = self.database(&analyzer.options().default_db).to_string();
        if analyzer
            .catalog()
            .database(&db_name, Privilege::Any)
            .is_none()
        {
            return Err(Error::DatabaseNotFound(db_name));
        }

        self.analyzed = true;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.analyzed = false;
    }
}

fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
