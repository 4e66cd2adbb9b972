//! CREATE TABLE AS SELECT
//!
//! The target table does not exist while the statement is analyzed, so
//! analysis runs in two phases. A disposable clone of the query is analyzed
//! first, purely to learn the output schema; the create descriptor's columns
//! are derived from it; then a placeholder table mirroring the descriptor is
//! bound as the insert target and the wrapped insert statement is analyzed
//! for real. The placeholder carries the reserved invalid table id, so no
//! downstream component can mistake it for a resolvable catalog entry; the
//! real table is created out-of-band by the DDL executor.
//!
//! An optional PARTITIONED BY clause names columns to partition the new
//! table by. The named columns must be the trailing output columns of the
//! query, in order: a remapping is impossible because the destination table
//! does not exist yet, and the partition column types must be deduced from
//! the query.

use super::create_table::{ColumnDef, CreateTableStmt};
use super::insert::InsertStmt;
use super::select::SelectStmt;
use crate::catalog::TableDescriptor;
use crate::error::{Error, Result};
use crate::semantic::analyzer::Analyzer;
use crate::types::schema::{Column, StorageFormat};
use crate::types::DataType;
use std::sync::Arc;
use tracing::debug;

/// Formats a table may have to be the target of this statement.
const SUPPORTED_INSERT_FORMATS: [StorageFormat; 2] =
    [StorageFormat::Parquet, StorageFormat::Text];

/// Analysis progress of a CREATE TABLE AS SELECT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtasState {
    Unanalyzed,
    /// The descriptor's column lists are derived from the speculative pass.
    SchemaInferred,
    /// A placeholder target mirroring the descriptor is bound.
    TargetBound,
    Analyzed,
}

/// A CREATE TABLE AS SELECT statement.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableAsSelectStmt {
    create: CreateTableStmt,
    /// Columns from the PARTITIONED BY (...) clause, if one was given.
    partition_keys: Option<Vec<String>>,
    insert: InsertStmt,
    state: CtasState,
}

impl CreateTableAsSelectStmt {
    pub fn new(
        create: CreateTableStmt,
        query: SelectStmt,
        partition_keys: Option<Vec<String>>,
    ) -> CreateTableAsSelectStmt {
        let mut target_path = Vec::new();
        if let Some(db) = create.db() {
            target_path.push(db.clone());
        }
        target_path.push(create.name().to_string());
        CreateTableAsSelectStmt {
            create,
            partition_keys,
            insert: InsertStmt::new(target_path, query),
            state: CtasState::Unanalyzed,
        }
    }

    pub fn state(&self) -> CtasState {
        self.state
    }

    pub fn is_analyzed(&self) -> bool {
        self.state == CtasState::Analyzed
    }

    pub fn create_stmt(&self) -> &CreateTableStmt {
        &self.create
    }

    pub fn insert_stmt(&self) -> &InsertStmt {
        &self.insert
    }

    pub fn query(&self) -> &SelectStmt {
        self.insert.query()
    }

    pub fn analyze(&mut self, analyzer: &mut Analyzer) -> Result<()> {
        if self.state == CtasState::Analyzed {
            return Ok(());
        }

        // Phase one: analyze a disposable clone of the query under a scope
        // rooted independently of the enclosing statement, so the throwaway
        // pass cannot register table or column references in the real scope.
        // Tables it finds unloaded are merged back regardless of outcome so
        // the caller can load them and retry.
        let mut speculative_scope = analyzer.disposable_root();
        speculative_scope.set_use_query_column_labels(true);
        let mut speculative = self.insert.query().clone_unanalyzed();
        let outcome = speculative.analyze(&mut speculative_scope);
        analyzer.merge_missing_from(&speculative_scope);
        outcome?;
        if analyzer.has_missing_tables() {
            return Ok(());
        }
        if speculative_scope.subquery_rewrite_pending() {
            analyzer.set_subquery_rewrite_pending(true);
        }
        // Subqueries must be rewritten before schema inference can trust the
        // query's output shape; retry after the rewrite pass has run.
        if analyzer.subquery_rewrite_pending() {
            return Ok(());
        }

        let labels = speculative.col_labels().to_vec();
        let types: Vec<DataType> = speculative
            .result_exprs()
            .iter()
            .map(|e| e.resolved_type().clone())
            .collect();

        // Partition columns must be a strict suffix of the query's output
        // columns, named in the same order.
        let mut regular: Vec<ColumnDef> = labels
            .iter()
            .zip(&types)
            .map(|(label, ty)| ColumnDef::new(label.clone(), ty.clone()))
            .collect();
        let mut partition_defs = Vec::new();
        if let Some(keys) = &self.partition_keys {
            let (given, total) = (keys.len(), labels.len());
            if given >= total {
                return Err(Error::TooManyPartitionColumns { given, total });
            }
            let first = total - given;
            for (j, key) in keys.iter().enumerate() {
                let label = &labels[first + j];
                if key != label {
                    return Err(Error::PartitionColumnMismatch {
                        expected: key.clone(),
                        actual: label.clone(),
                    });
                }
                partition_defs.push(ColumnDef::new(label.clone(), types[first + j].clone()));
            }
            regular.truncate(first);
        }
        self.create.set_column_defs(regular);
        self.create.set_partition_column_defs(partition_defs);
        self.state = CtasState::SchemaInferred;

        self.create.analyze(analyzer)?;

        if !SUPPORTED_INSERT_FORMATS.contains(&self.create.format()) {
            let supported: Vec<String> = SUPPORTED_INSERT_FORMATS
                .iter()
                .map(|f| f.to_string())
                .collect();
            return Err(Error::UnsupportedInsertFormat {
                format: self.create.format().to_string(),
                supported: supported.join(", "),
            });
        }

        // Assign the location the catalog would pick. If the user gave none,
        // copy it back into the descriptor: it will be the insert's write
        // target, so the two must match exactly.
        let db_name = self
            .create
            .database(&analyzer.options().default_db)
            .to_string();
        let catalog = analyzer.catalog();
        if self.create.location().is_none() {
            let location = catalog.table_location(&db_name, self.create.name());
            self.create.set_location(location);
        }

        // Bind a placeholder table for the insert to analyze against. The
        // schema mirrors the descriptor exactly: regular columns first, then
        // partition columns.
        let descriptor = TableDescriptor {
            db: db_name,
            name: self.create.name().to_string(),
            columns: self
                .create
                .column_defs()
                .iter()
                .chain(self.create.partition_column_defs())
                .map(|def| Column::new(def.name.clone(), def.data_type.clone()))
                .collect(),
            format: self.create.format(),
            location: self.create.location().cloned(),
        };
        let table = {
            let mut client = catalog.client();
            client.mirror_table(&descriptor)?
        };
        assert!(
            !table.id.is_valid(),
            "placeholder target must carry the reserved invalid table id"
        );
        assert!(
            table.columns.len() == descriptor.columns.len()
                && table
                    .columns
                    .iter()
                    .zip(&descriptor.columns)
                    .all(|(a, b)| a.name == b.name && a.data_type == b.data_type),
            "placeholder schema must exactly mirror the create descriptor"
        );
        self.state = CtasState::TargetBound;

        debug!(
            table = %format!("{}.{}", table.db, table.name),
            columns = table.columns.len(),
            "bound placeholder target for schema-inferring create"
        );

        self.insert.set_target(Arc::new(table));
        self.insert.analyze(analyzer)?;
        if self.insert.is_analyzed() {
            self.state = CtasState::Analyzed;
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        self.insert.reset();
        self.create.reset();
        self.create.set_column_defs(Vec::new());
        self.create.set_partition_column_defs(Vec::new());
        self.state = CtasState::Unanalyzed;
    }
}
