//! Shared test fixtures: an in-memory catalog and expression builders.

use std::rc::Rc;
use strata_sql::catalog::MemoryCatalog;
use strata_sql::functions::FunctionRegistry;
use strata_sql::semantic::{Analyzer, ArithmeticOp, CompareOp, Expr, Literal};
use strata_sql::types::{Column, DataType, StorageFormat, Table, TableId, TableKind};

/// Builds a catalog with one database and a few representative tables:
///
/// - `users`: keyed (key `id`), mutable
/// - `events`: append-only text table, `code` carries distinct stats
/// - `user_view`: a view over users
/// - `profiles`: keyed, with a struct-typed column
pub fn test_catalog() -> Rc<MemoryCatalog> {
    let catalog = MemoryCatalog::new("/warehouse");
    catalog.add_database("default");

    catalog.add_table(
        Table::new(TableId(1), "default", "users")
            .with_columns(vec![
                Column::new("id", DataType::I64).nullable(false),
                Column::new("name", DataType::Str),
                Column::new("age", DataType::I32),
            ])
            .with_kind(TableKind::Keyed {
                key_columns: vec!["id".into()],
            }),
    );

    catalog.add_table(
        Table::new(TableId(2), "default", "events")
            .with_columns(vec![
                Column::new("id", DataType::I64),
                Column::new("code", DataType::I32).with_distinct_count(50),
                Column::new("flag", DataType::Bool),
                Column::new("note", DataType::Str),
            ])
            .with_format(StorageFormat::Text),
    );

    catalog.add_table(
        Table::new(TableId(3), "default", "user_view")
            .with_columns(vec![
                Column::new("id", DataType::I64),
                Column::new("name", DataType::Str),
            ])
            .with_kind(TableKind::View),
    );

    catalog.add_table(
        Table::new(TableId(4), "default", "profiles")
            .with_columns(vec![
                Column::new("id", DataType::I64).nullable(false),
                Column::new(
                    "details",
                    DataType::Struct(vec![
                        ("nick".into(), DataType::Str),
                        ("age".into(), DataType::I32),
                    ]),
                ),
            ])
            .with_kind(TableKind::Keyed {
                key_columns: vec!["id".into()],
            }),
    );

    Rc::new(catalog)
}

pub fn analyzer_for(catalog: &Rc<MemoryCatalog>) -> Analyzer {
    Analyzer::new(
        Rc::clone(catalog) as Rc<dyn strata_sql::catalog::Catalog>,
        Rc::new(FunctionRegistry::with_builtins()),
    )
}

pub fn col(path: &[&str]) -> Expr {
    Expr::column(path.to_vec())
}

pub fn int(v: i64) -> Expr {
    Expr::literal(Literal::Integer(v))
}

pub fn string(v: &str) -> Expr {
    Expr::literal(Literal::String(v.into()))
}

pub fn boolean(v: bool) -> Expr {
    Expr::literal(Literal::Boolean(v))
}

pub fn null() -> Expr {
    Expr::literal(Literal::Null)
}

pub fn eq(lhs: Expr, rhs: Expr) -> Expr {
    Expr::compare(CompareOp::Eq, lhs, rhs)
}

pub fn add(lhs: Expr, rhs: Expr) -> Expr {
    Expr::arithmetic(ArithmeticOp::Add, lhs, rhs)
}
