//! Condition expression compiler and virtual machine.
//!
//! Rule conditions are compiled once per rule into a [`CompiledExpr`] and
//! evaluated many times against candidate item pairs. Compilation runs a
//! preflight pass over the parsed tree so unknown properties, unknown
//! functions, and statically-detectable type mismatches surface before any
//! real item is evaluated.

mod ast;
pub(crate) mod grammar;
mod value;

pub use ast::{ArithOp, CompareOp, Expr, Subject, UnaryOp};
pub use value::Value;

use thiserror::Error;
use winnow::Parser;

use crate::board::{Board, Item, Layer, PropertyCatalog};

use ast::predicate_leaves;

/// Errors from expression compilation or evaluation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExprError {
    #[error("parse error at offset {offset}: {message}")]
    Parse { offset: usize, message: String },

    #[error("unknown property '{name}'")]
    UnknownProperty { name: String },

    #[error("unknown function '{name}'")]
    UnknownFunction { name: String },

    #[error("type mismatch: {0}")]
    TypeMismatch(String),
}

/// A compiled, immutable expression. Thread-safe and freely shareable
/// across parallel evaluation loops.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpr {
    root: Expr,
    source: String,
}

/// Everything an evaluation can see: the candidate pair, the query layer,
/// and the board for net and class lookups.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    pub board: &'a Board,
    pub a: &'a Item,
    pub b: Option<&'a Item>,
    pub layer: Option<Layer>,
}

/// Compile an expression source string, preflighting identifier
/// resolution against `catalog`.
///
/// # Errors
///
/// Returns [`ExprError::Parse`] with a source offset for syntax errors
/// (including unbalanced parentheses), and the unknown-name or
/// type-mismatch variants from the preflight pass.
pub fn compile(source: &str, catalog: &dyn PropertyCatalog) -> Result<CompiledExpr, ExprError> {
    let root = grammar::toplevel
        .parse(source)
        .map_err(|e| ExprError::Parse {
            offset: e.offset(),
            message: e.inner().to_string(),
        })?;
    preflight(&root, catalog)?;
    Ok(CompiledExpr {
        root,
        source: source.to_owned(),
    })
}

fn preflight(expr: &Expr, catalog: &dyn PropertyCatalog) -> Result<(), ExprError> {
    match expr {
        Expr::Number(_) | Expr::Str(_) => Ok(()),
        Expr::Property { name, .. } => {
            if catalog.has_property(name) {
                Ok(())
            } else {
                Err(ExprError::UnknownProperty { name: name.clone() })
            }
        }
        Expr::Call { func, .. } => {
            if catalog.has_function(func) {
                Ok(())
            } else {
                Err(ExprError::UnknownFunction { name: func.clone() })
            }
        }
        Expr::Unary(_, inner) => preflight(inner, catalog),
        Expr::Arith(op, a, b) => {
            for side in [a, b] {
                if let Expr::Str(s) = side.as_ref() {
                    if s.trim().parse::<f64>().is_err() {
                        return Err(ExprError::TypeMismatch(format!(
                            "string '{s}' used as operand of '{op:?}'"
                        )));
                    }
                }
            }
            preflight(a, catalog)?;
            preflight(b, catalog)
        }
        Expr::Compare(_, a, b) | Expr::And(a, b) | Expr::Or(a, b) => {
            preflight(a, catalog)?;
            preflight(b, catalog)
        }
    }
}

impl CompiledExpr {
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Specificity contribution of this condition: one point per
    /// predicate leaf (comparison or function call).
    #[must_use]
    pub fn specificity(&self) -> u32 {
        predicate_leaves(&self.root)
    }

    /// Evaluate against a context. Pure: no side effects, and runtime
    /// coercions never fail. The only error paths re-check what
    /// compilation already validated.
    ///
    /// # Errors
    ///
    /// Returns the unknown-name variants if the property inventory the
    /// items expose disagrees with the catalog used at compile time.
    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Value, ExprError> {
        eval(&self.root, ctx)
    }
}

fn eval(expr: &Expr, ctx: &EvalContext<'_>) -> Result<Value, ExprError> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Property { subject, name } => match subject_item(ctx, *subject) {
            // A missing second subject yields a well-defined false value.
            None => Ok(Value::from(false)),
            Some(item) => match item.property(ctx.board, name) {
                Ok(Some(value)) => Ok(value),
                Ok(None) => Ok(Value::from(false)),
                Err(_) => Err(ExprError::UnknownProperty { name: name.clone() }),
            },
        },
        Expr::Call { subject, func, arg } => match subject_item(ctx, *subject) {
            None => Ok(Value::from(false)),
            Some(item) => item
                .call(ctx.board, func, arg.as_deref())
                .map_err(|_| ExprError::UnknownFunction { name: func.clone() }),
        },
        Expr::Unary(UnaryOp::Neg, inner) => Ok(Value::Number(-eval(inner, ctx)?.as_number())),
        Expr::Unary(UnaryOp::Not, inner) => Ok(Value::from(!eval(inner, ctx)?.is_truthy())),
        Expr::Arith(op, a, b) => {
            let a = eval(a, ctx)?.as_number();
            let b = eval(b, ctx)?.as_number();
            Ok(Value::Number(match op {
                ArithOp::Add => a + b,
                ArithOp::Sub => a - b,
                ArithOp::Mul => a * b,
                ArithOp::Div => {
                    if b == 0.0 {
                        0.0
                    } else {
                        a / b
                    }
                }
            }))
        }
        Expr::Compare(op, a, b) => {
            let a = eval(a, ctx)?;
            let b = eval(b, ctx)?;
            Ok(Value::from(a.compare(*op, &b)))
        }
        Expr::And(a, b) => {
            if eval(a, ctx)?.is_truthy() {
                Ok(Value::from(eval(b, ctx)?.is_truthy()))
            } else {
                Ok(Value::from(false))
            }
        }
        Expr::Or(a, b) => {
            if eval(a, ctx)?.is_truthy() {
                Ok(Value::from(true))
            } else {
                Ok(Value::from(eval(b, ctx)?.is_truthy()))
            }
        }
    }
}

fn subject_item<'a>(ctx: &EvalContext<'a>, subject: Subject) -> Option<&'a Item> {
    match subject {
        Subject::A => Some(ctx.a),
        Subject::B => ctx.b,
    }
}
