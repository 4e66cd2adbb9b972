//! Boolean-algebra analysis for compound predicates

use super::{CompoundOp, Expr, ExprKind};
use crate::error::{Error, Result};
use crate::functions::CompareMode;
use crate::semantic::analyzer::Analyzer;
use crate::types::DataType;
use tracing::trace;

impl Expr {
    /// Analyzes an AND/OR/NOT node. Children are already analyzed.
    ///
    /// Every operand must be boolean or NULL-typed. The builtin signature is
    /// resolved like any other operator, but with boolean/NULL operands it
    /// cannot fail; if it does, that is a bug in the registry, not a user
    /// error.
    pub(super) fn analyze_compound(&mut self, analyzer: &Analyzer) -> Result<()> {
        let ExprKind::Compound(op) = &self.kind else {
            unreachable!("analyze_compound on a non-compound expression")
        };
        let op = *op;
        debug_assert_eq!(self.children().len(), op.arity());

        for child in self.children() {
            let child_type = child.resolved_type();
            if !child_type.is_boolean() && !child_type.is_null() {
                return Err(Error::TypeError(format!(
                    "Operand '{}' part of predicate '{}' should return type \
                     'BOOLEAN' but returns type '{}'",
                    child, self, child_type
                )));
            }
        }

        let arg_types: Vec<DataType> = self
            .children()
            .iter()
            .map(|c| c.resolved_type().clone())
            .collect();
        let registry = analyzer.registry();
        let signature = registry
            .resolve(op.name(), &arg_types, CompareMode::NonStrictSupertype)
            .unwrap_or_else(|e| {
                panic!(
                    "builtin {} must resolve for boolean operands: {}",
                    op.name(),
                    e
                )
            });
        assert!(signature.ret.is_boolean());
        let args = signature.args.clone();
        self.cast_children_to(&args);
        self.data_type = Some(DataType::Bool);

        // Give up if any required child selectivity is unknown; an unknown
        // must never turn into a number.
        self.selectivity = match op {
            CompoundOp::Not => self.children()[0].selectivity().map(|s| 1.0 - s),
            CompoundOp::And => match (
                self.children()[0].selectivity(),
                self.children()[1].selectivity(),
            ) {
                (Some(l), Some(r)) => Some(l * r),
                _ => None,
            },
            CompoundOp::Or => match (
                self.children()[0].selectivity(),
                self.children()[1].selectivity(),
            ) {
                (Some(l), Some(r)) => Some(l + r - l * r),
                _ => None,
            },
        }
        // Absorb floating-point drift.
        .map(|s| s.clamp(0.0, 1.0));

        trace!(predicate = %self, selectivity = ?self.selectivity, "analyzed compound predicate");
        Ok(())
    }
}

/// Folds a list of predicates into a single right-associated AND tree.
/// Returns the sole element unchanged for a single-entry list and `None` for
/// an empty one.
pub fn create_conjunction(mut conjuncts: Vec<Expr>) -> Option<Expr> {
    let mut conjunction = conjuncts.pop()?;
    while let Some(conjunct) = conjuncts.pop() {
        conjunction = Expr::and(conjunct, conjunction);
    }
    Some(conjunction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::expr::{CompareOp, Literal};

    fn pred(name: &str) -> Expr {
        Expr::compare(
            CompareOp::Eq,
            Expr::column(vec![name]),
            Expr::literal(Literal::Integer(1)),
        )
    }

    #[test]
    fn test_create_conjunction_empty() {
        assert_eq!(create_conjunction(vec![]), None);
    }

    #[test]
    fn test_create_conjunction_single_is_unchanged() {
        let p = pred("a");
        assert_eq!(create_conjunction(vec![p.clone()]), Some(p));
    }

    #[test]
    fn test_create_conjunction_right_associated() {
        let (p, q, r) = (pred("a"), pred("b"), pred("c"));
        let folded = create_conjunction(vec![p.clone(), q.clone(), r.clone()]).unwrap();
        assert_eq!(folded, Expr::and(p, Expr::and(q, r)));
    }
}
