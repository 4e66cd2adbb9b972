//! Mutation lowering: UPDATE/DELETE into a projection plus column-index map.

mod common;

use common::*;
use strata_sql::semantic::{
    Expr, ExprKind, FromClause, ModifyStmt, Privilege, SelectItem, SelectStmt, TableRef,
};
use strata_sql::types::DataType;
use strata_sql::Error;

fn users_from() -> FromClause {
    FromClause::new(vec![TableRef::new(vec!["users"])])
}

fn update_users(assignments: Vec<(Expr, Expr)>) -> ModifyStmt {
    ModifyStmt::update(vec!["users"], users_from(), assignments, None, false)
}

#[test]
fn test_update_lowering_projects_keys_then_values() {
    let catalog = test_catalog();
    let mut analyzer = analyzer_for(&catalog);
    let mut stmt = update_users(vec![
        (col(&["users", "name"]), string("x")),
        (col(&["users", "age"]), add(col(&["users", "age"]), int(1))),
    ]);
    stmt.analyze(&mut analyzer).unwrap();
    assert!(stmt.is_analyzed());

    // Projection: key column first, then the assignment values in order.
    let source = stmt.source_stmt().unwrap();
    assert_eq!(source.result_exprs().len(), 3);
    let key = source.result_exprs()[0].ignore_implicit_casts();
    assert!(matches!(key.kind(), ExprKind::ColumnRef { .. }));
    assert_eq!(key.resolved_column().unwrap().column, "id");
    assert_eq!(stmt.referenced_columns(), &[0, 1, 2]);

    // The filter-free projection still carries the FROM clause.
    assert_eq!(source.from_clause().table_refs().len(), 1);
}

#[test]
fn test_key_column_cannot_be_assigned() {
    let catalog = test_catalog();
    let mut analyzer = analyzer_for(&catalog);
    let mut stmt = update_users(vec![(col(&["users", "id"]), int(5))]);
    let err = stmt.analyze(&mut analyzer).unwrap_err();
    assert_eq!(err, Error::KeyColumnImmutable("users.id".into()));
}

#[test]
fn test_duplicate_assignment_rejected() {
    let catalog = test_catalog();
    let mut analyzer = analyzer_for(&catalog);
    let mut stmt = update_users(vec![
        (col(&["users", "name"]), string("x")),
        (col(&["users", "name"]), string("y")),
    ]);
    let err = stmt.analyze(&mut analyzer).unwrap_err();
    assert_eq!(err, Error::DuplicateAssignment("users.name".into()));
}

#[test]
fn test_assignment_must_target_the_target_table() {
    let catalog = test_catalog();
    let mut analyzer = analyzer_for(&catalog);
    let mut stmt = ModifyStmt::update(
        vec!["u"],
        FromClause::new(vec![
            TableRef::new(vec!["users"]).with_alias("u"),
            TableRef::new(vec!["events"]).with_alias("e"),
        ]),
        vec![(col(&["e", "code"]), int(1))],
        None,
        false,
    );
    let err = stmt.analyze(&mut analyzer).unwrap_err();
    assert!(matches!(err, Error::ForeignColumnAssignment(_)));
}

#[test]
fn test_subquery_not_allowed_in_assignment() {
    let catalog = test_catalog();
    let mut analyzer = analyzer_for(&catalog);
    let subquery = SelectStmt::new(
        vec![SelectItem::new(col(&["code"]))],
        FromClause::new(vec![TableRef::new(vec!["events"])]),
        None,
    );
    let mut stmt = update_users(vec![(
        col(&["users", "age"]),
        Expr::subquery(subquery),
    )]);
    let err = stmt.analyze(&mut analyzer).unwrap_err();
    assert_eq!(
        err,
        Error::SubqueryNotAllowedInAssignment("users.age".into())
    );
}

#[test]
fn test_nested_field_is_not_an_assignable_column() {
    let catalog = test_catalog();
    let mut analyzer = analyzer_for(&catalog);
    let mut stmt = ModifyStmt::update(
        vec!["profiles"],
        FromClause::new(vec![TableRef::new(vec!["profiles"])]),
        vec![(col(&["profiles", "details", "nick"]), string("x"))],
        None,
        false,
    );
    let err = stmt.analyze(&mut analyzer).unwrap_err();
    assert!(matches!(err, Error::InvalidAssignmentTarget(_)));
}

#[test]
fn test_views_and_non_keyed_tables_are_immutable() {
    let catalog = test_catalog();

    let mut analyzer = analyzer_for(&catalog);
    let mut stmt = ModifyStmt::update(
        vec!["user_view"],
        FromClause::new(vec![TableRef::new(vec!["user_view"])]),
        vec![(col(&["user_view", "name"]), string("x"))],
        None,
        false,
    );
    let err = stmt.analyze(&mut analyzer).unwrap_err();
    assert!(matches!(err, Error::CannotModifyView(_)));

    let mut analyzer = analyzer_for(&catalog);
    let mut stmt = ModifyStmt::update(
        vec!["events"],
        FromClause::new(vec![TableRef::new(vec!["events"])]),
        vec![(col(&["events", "note"]), string("x"))],
        None,
        false,
    );
    let err = stmt.analyze(&mut analyzer).unwrap_err();
    assert!(matches!(err, Error::UnsupportedTableKind(_)));
}

#[test]
fn test_target_path_resolution_errors() {
    let catalog = test_catalog();

    // Not in the FROM clause at all.
    let mut analyzer = analyzer_for(&catalog);
    let mut stmt = ModifyStmt::update(
        vec!["nosuch"],
        users_from(),
        vec![(col(&["users", "name"]), string("x"))],
        None,
        false,
    );
    let err = stmt.analyze(&mut analyzer).unwrap_err();
    assert!(matches!(err, Error::InvalidTableReference(_)));

    // A path through the alias lands on a column, not a table.
    let mut analyzer = analyzer_for(&catalog);
    let mut stmt = ModifyStmt::update(
        vec!["users", "name"],
        users_from(),
        vec![(col(&["users", "name"]), string("x"))],
        None,
        false,
    );
    let err = stmt.analyze(&mut analyzer).unwrap_err();
    assert!(matches!(err, Error::NotATableAlias(_)));
}

#[test]
fn test_widening_assignment_inserts_cast() {
    let catalog = test_catalog();
    let mut analyzer = analyzer_for(&catalog);
    // 5 types as TINYINT and widens into the INT column through a cast.
    let mut stmt = update_users(vec![(col(&["users", "age"]), int(5))]);
    stmt.analyze(&mut analyzer).unwrap();

    let source = stmt.source_stmt().unwrap();
    let value = &source.result_exprs()[1];
    assert_eq!(value.data_type(), Some(&DataType::I32));
    assert!(matches!(
        value.kind(),
        ExprKind::Cast { implicit: true, .. }
    ));
}

#[test]
fn test_narrowing_assignment_is_precision_loss() {
    let catalog = test_catalog();
    let mut analyzer = analyzer_for(&catalog);
    // 5_000_000_000 types as BIGINT and cannot narrow into the INT column.
    let mut stmt = update_users(vec![(col(&["users", "age"]), int(5_000_000_000))]);
    let err = stmt.analyze(&mut analyzer).unwrap_err();
    assert!(matches!(err, Error::PrecisionLoss(_)));
}

#[test]
fn test_incompatible_assignment_type() {
    let catalog = test_catalog();
    let mut analyzer = analyzer_for(&catalog);
    let mut stmt = update_users(vec![(col(&["users", "age"]), string("x"))]);
    let err = stmt.analyze(&mut analyzer).unwrap_err();
    assert!(matches!(err, Error::IncompatibleTypes(_)));
}

#[test]
fn test_delete_projects_exactly_the_key_columns() {
    let catalog = test_catalog();
    let mut analyzer = analyzer_for(&catalog);
    let mut stmt = ModifyStmt::delete(
        vec!["users"],
        users_from(),
        Some(eq(col(&["users", "age"]), int(30))),
        true,
    );
    stmt.analyze(&mut analyzer).unwrap();
    assert!(stmt.ignore_not_found());

    let source = stmt.source_stmt().unwrap();
    assert_eq!(source.result_exprs().len(), 1);
    assert_eq!(stmt.referenced_columns(), &[0]);
    assert!(source.where_clause().is_some());

    // Write access is the INSERT-level requirement; no separate DELETE
    // requirement exists.
    let requests = analyzer.privilege_requests();
    assert!(requests
        .iter()
        .any(|r| r.table.as_deref() == Some("users") && r.privilege == Privilege::Insert));
}

#[test]
fn test_reset_and_reanalyze_matches_fresh_analysis() {
    let catalog = test_catalog();
    let build = || {
        update_users(vec![
            (col(&["users", "name"]), string("x")),
            (col(&["users", "age"]), int(5)),
        ])
    };

    let mut stmt = build();
    let mut analyzer = analyzer_for(&catalog);
    stmt.analyze(&mut analyzer).unwrap();
    stmt.reset();
    assert!(stmt.source_stmt().is_some());
    assert!(stmt.referenced_columns().is_empty());
    let mut analyzer = analyzer_for(&catalog);
    stmt.analyze(&mut analyzer).unwrap();

    let mut fresh = build();
    let mut analyzer = analyzer_for(&catalog);
    fresh.analyze(&mut analyzer).unwrap();

    assert_eq!(stmt.referenced_columns(), fresh.referenced_columns());
    assert_eq!(
        stmt.source_stmt().unwrap().result_exprs(),
        fresh.source_stmt().unwrap().result_exprs()
    );
    assert_eq!(stmt.target(), fresh.target());
}

#[test]
fn test_missing_target_table_is_recoverable() {
    let catalog = test_catalog();
    catalog.mark_unloaded("default", "users");

    let mut analyzer = analyzer_for(&catalog);
    let mut stmt = update_users(vec![(col(&["users", "name"]), string("x"))]);
    stmt.analyze(&mut analyzer).unwrap();
    assert!(!stmt.is_analyzed());
    assert!(analyzer.missing_tables().contains("default.users"));

    catalog.load("default", "users");
    stmt.reset();
    let mut analyzer = analyzer_for(&catalog);
    stmt.analyze(&mut analyzer).unwrap();
    assert!(stmt.is_analyzed());
}
