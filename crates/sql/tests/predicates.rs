//! Boolean-algebra analysis: operand typing, selectivity, negation.

mod common;

use common::*;
use strata_sql::semantic::{
    create_conjunction, CompoundOp, Expr, ExprKind, FromClause, Literal, SelectItem, SelectStmt,
    TableRef,
};
use strata_sql::Error;

/// Analyzes a predicate in the scope of `FROM events`.
fn analyze_pred(mut pred: Expr) -> Result<Expr, Error> {
    let catalog = test_catalog();
    let mut analyzer = analyzer_for(&catalog);
    let mut from = FromClause::new(vec![TableRef::new(vec!["events"])]);
    from.analyze(&mut analyzer)?;
    pred.analyze(&mut analyzer)?;
    Ok(pred)
}

#[test]
fn test_operands_must_be_boolean_or_null() {
    // `code` is INT, not BOOLEAN.
    let err = analyze_pred(Expr::and(col(&["code"]), col(&["flag"]))).unwrap_err();
    match err {
        Error::TypeError(msg) => {
            assert!(msg.contains("'code'"), "message names the operand: {msg}");
            assert!(msg.contains("'INT'"), "message names the actual type: {msg}");
        }
        other => panic!("expected TypeError, got {other:?}"),
    }

    // NULL operands are fine.
    let pred = analyze_pred(Expr::and(col(&["flag"]), null())).unwrap();
    assert!(pred.is_analyzed());
    assert_eq!(pred.data_type(), Some(&strata_sql::types::DataType::Bool));
}

#[test]
fn test_equality_selectivity_from_distinct_count() {
    // code has 50 distinct values.
    let pred = analyze_pred(eq(col(&["code"]), int(7))).unwrap();
    let sel = pred.selectivity().unwrap();
    assert!((sel - 0.02).abs() < 1e-12);

    // id carries no statistics, so the estimate is unknown.
    let pred = analyze_pred(eq(col(&["id"]), int(7))).unwrap();
    assert_eq!(pred.selectivity(), None);
}

#[test]
fn test_compound_selectivity_algebra() {
    let known = || eq(col(&["code"]), int(7)); // 0.02

    let and = analyze_pred(Expr::and(known(), known())).unwrap();
    assert!((and.selectivity().unwrap() - 0.0004).abs() < 1e-12);

    let or = analyze_pred(Expr::or(known(), known())).unwrap();
    assert!((or.selectivity().unwrap() - (0.02 + 0.02 - 0.0004)).abs() < 1e-12);

    let not = analyze_pred(Expr::not(known())).unwrap();
    assert!((not.selectivity().unwrap() - 0.98).abs() < 1e-12);
}

#[test]
fn test_unknown_selectivity_propagates() {
    let known = || eq(col(&["code"]), int(7));
    let unknown = || eq(col(&["id"]), int(7));

    // One unknown input makes the whole estimate unknown; it never silently
    // becomes a number.
    for pred in [
        Expr::and(known(), unknown()),
        Expr::or(unknown(), known()),
        Expr::not(unknown()),
        Expr::and(known(), Expr::or(unknown(), known())),
    ] {
        let analyzed = analyze_pred(pred).unwrap();
        assert_eq!(analyzed.selectivity(), None);
    }
}

#[test]
fn test_selectivity_stays_in_unit_interval() {
    // TRUE has selectivity 1.0; OR of TRUE with anything clamps at 1.0.
    let pred = analyze_pred(Expr::or(boolean(true), eq(col(&["code"]), int(1)))).unwrap();
    let sel = pred.selectivity().unwrap();
    assert!((0.0..=1.0).contains(&sel));
    assert!((sel - 1.0).abs() < 1e-12);
}

/// Three-valued evaluation of predicates whose leaves are boolean/NULL
/// literals. `None` is SQL NULL.
fn eval(expr: &Expr) -> Option<bool> {
    match expr.kind() {
        ExprKind::Literal(Literal::Boolean(b)) => Some(*b),
        ExprKind::Literal(Literal::Null) => None,
        ExprKind::Compound(CompoundOp::Not) => eval(&expr.children()[0]).map(|v| !v),
        ExprKind::Compound(CompoundOp::And) => {
            match (eval(&expr.children()[0]), eval(&expr.children()[1])) {
                (Some(false), _) | (_, Some(false)) => Some(false),
                (Some(true), Some(true)) => Some(true),
                _ => None,
            }
        }
        ExprKind::Compound(CompoundOp::Or) => {
            match (eval(&expr.children()[0]), eval(&expr.children()[1])) {
                (Some(true), _) | (_, Some(true)) => Some(true),
                (Some(false), Some(false)) => Some(false),
                _ => None,
            }
        }
        other => panic!("evaluator only handles boolean literals and compounds: {other:?}"),
    }
}

fn truth_values() -> [Expr; 3] {
    [boolean(true), boolean(false), null()]
}

#[test]
fn test_de_morgan_under_three_valued_logic() {
    for a in truth_values() {
        for b in truth_values() {
            let and = Expr::and(a.clone(), b.clone());
            assert_eq!(
                eval(&and.negate()),
                eval(&Expr::or(a.negate(), b.negate())),
                "NOT({a} AND {b})"
            );
            let or = Expr::or(a.clone(), b.clone());
            assert_eq!(
                eval(&or.negate()),
                eval(&Expr::and(a.negate(), b.negate())),
                "NOT({a} OR {b})"
            );
        }
    }
}

#[test]
fn test_double_negation_is_value_equivalent() {
    for a in truth_values() {
        for b in truth_values() {
            let pred = Expr::and(a.clone(), Expr::or(b.clone(), a.clone()));
            assert_eq!(eval(&pred.negate().negate()), eval(&pred));
        }
    }
}

#[test]
fn test_create_conjunction_analyzes_as_one_predicate() {
    let conjuncts = vec![
        eq(col(&["code"]), int(1)),
        eq(col(&["code"]), int(2)),
        eq(col(&["code"]), int(3)),
    ];
    let folded = create_conjunction(conjuncts).unwrap();
    let analyzed = analyze_pred(folded).unwrap();
    assert!(analyzed.is_analyzed());
    // 0.02^3, through two nested ANDs.
    assert!((analyzed.selectivity().unwrap() - 0.000008).abs() < 1e-15);
}

#[test]
fn test_where_clause_must_be_boolean() {
    let catalog = test_catalog();
    let mut analyzer = analyzer_for(&catalog);
    let mut stmt = SelectStmt::new(
        vec![SelectItem::new(col(&["id"]))],
        FromClause::new(vec![TableRef::new(vec!["events"])]),
        Some(add(col(&["code"]), int(1))),
    );
    let err = stmt.analyze(&mut analyzer).unwrap_err();
    assert!(matches!(err, Error::TypeError(_)));
}
