//! Builtin operator and function signatures
//!
//! The registry resolves an operator name plus argument types to a concrete
//! builtin signature. Resolution is a pure lookup: candidates are ranked by
//! total implicit-widening cost, the unique cheapest candidate wins, and ties
//! between distinct candidates are ambiguous.

use crate::error::{Error, Result};
use crate::types::DataType;
use std::collections::HashMap;

/// How argument types are matched against a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareMode {
    /// Argument types must be identical.
    Strict,
    /// An argument matches if it is identical or can be implicitly widened to
    /// the declared type (NULL widens to anything).
    NonStrictSupertype,
}

/// A concrete builtin signature.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub name: &'static str,
    pub args: Vec<DataType>,
    pub ret: DataType,
}

/// Registry of builtin operator signatures, keyed by operator name.
pub struct FunctionRegistry {
    builtins: HashMap<&'static str, Vec<Signature>>,
}

impl FunctionRegistry {
    /// Builds the registry with every builtin operator registered.
    pub fn with_builtins() -> Self {
        let mut registry = FunctionRegistry {
            builtins: HashMap::new(),
        };

        use DataType::*;

        // AND and OR are implemented as custom exprs; NOT has a real symbol.
        // All three only ever see boolean (or null) operands.
        registry.register("AND", vec![Bool, Bool], Bool);
        registry.register("OR", vec![Bool, Bool], Bool);
        registry.register("NOT", vec![Bool], Bool);

        let comparable = [
            Bool,
            I8,
            I16,
            I32,
            I64,
            F32,
            F64,
            Decimal(None, None),
            Str,
            Date,
            Timestamp,
        ];
        for op in ["=", "!=", "<", "<=", ">", ">="] {
            for ty in &comparable {
                registry.register(op, vec![ty.clone(), ty.clone()], Bool);
            }
        }

        let numeric = [I8, I16, I32, I64, F32, F64, Decimal(None, None)];
        for op in ["+", "-", "*", "/"] {
            for ty in &numeric {
                registry.register(op, vec![ty.clone(), ty.clone()], ty.clone());
            }
        }

        registry
    }

    fn register(&mut self, name: &'static str, args: Vec<DataType>, ret: DataType) {
        self.builtins
            .entry(name)
            .or_default()
            .push(Signature { name, args, ret });
    }

    /// Resolves `name` applied to `arg_types` to the best-matching builtin
    /// signature under `mode`.
    pub fn resolve(
        &self,
        name: &str,
        arg_types: &[DataType],
        mode: CompareMode,
    ) -> Result<&Signature> {
        let overloads = self
            .builtins
            .get(name)
            .ok_or_else(|| Error::NoMatchingFunction(render_call(name, arg_types)))?;

        // Rank every arity-matching overload by total widening cost.
        let mut best: Option<(u32, &Signature)> = None;
        let mut tied = false;
        for sig in overloads {
            let Some(cost) = match_cost(sig, arg_types, mode) else {
                continue;
            };
            match best {
                Some((best_cost, _)) if cost > best_cost => {}
                Some((best_cost, _)) if cost == best_cost => tied = true,
                _ => {
                    best = Some((cost, sig));
                    tied = false;
                }
            }
        }

        match best {
            None => Err(Error::NoMatchingFunction(render_call(name, arg_types))),
            // An all-NULL argument list matches every overload at equal cost;
            // take the first registration rather than calling it ambiguous.
            Some(_) if tied && !arg_types.iter().all(|t| t.is_null()) => {
                Err(Error::AmbiguousFunction(render_call(name, arg_types)))
            }
            Some((_, sig)) => Ok(sig),
        }
    }
}

/// Cost of calling `sig` with `arg_types`, or `None` if it does not match.
fn match_cost(sig: &Signature, arg_types: &[DataType], mode: CompareMode) -> Option<u32> {
    if sig.args.len() != arg_types.len() {
        return None;
    }
    let mut total = 0;
    for (actual, declared) in arg_types.iter().zip(&sig.args) {
        match mode {
            CompareMode::Strict => {
                if actual != declared {
                    return None;
                }
            }
            CompareMode::NonStrictSupertype => {
                total += actual.widening_cost(declared)?;
            }
        }
    }
    Some(total)
}

fn render_call(name: &str, arg_types: &[DataType]) -> String {
    let args: Vec<String> = arg_types.iter().map(|t| t.to_string()).collect();
    format!("{}({})", name, args.join(", "))
}
