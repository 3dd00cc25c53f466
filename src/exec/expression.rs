//! # Scalar Expressions
//!
//! The operators treat scalar evaluation as opaque: an [`Expression`] maps
//! a row to a [`Value`]. Projection evaluates a vector of expressions per
//! row, select treats an expression as a predicate (true means keep), sort
//! orderings evaluate expressions as sort keys, and outer-join synthesis
//! computes replacement fields from the outer row.
//!
//! Field references and literals cover most plans; `func` wraps an
//! arbitrary closure for everything else.

use std::fmt;
use std::sync::Arc;

use eyre::Result;

use crate::exec::row::Row;
use crate::types::Value;

pub trait Expression: fmt::Debug + Send + Sync {
    fn eval(&self, row: &dyn Row) -> Result<Value<'static>>;
}

pub type ExpressionRef = Arc<dyn Expression>;

/// Reads one field of the evaluated row.
#[derive(Debug)]
pub struct FieldExpression {
    index: usize,
}

impl Expression for FieldExpression {
    fn eval(&self, row: &dyn Row) -> Result<Value<'static>> {
        row.field(self.index)
    }
}

/// Yields a constant, ignoring the row.
#[derive(Debug)]
pub struct LiteralExpression {
    value: Value<'static>,
}

impl Expression for LiteralExpression {
    fn eval(&self, _row: &dyn Row) -> Result<Value<'static>> {
        Ok(self.value.clone())
    }
}

/// Wraps an arbitrary evaluation function under a display name.
pub struct FnExpression {
    name: &'static str,
    #[allow(clippy::type_complexity)]
    eval: Box<dyn Fn(&dyn Row) -> Result<Value<'static>> + Send + Sync>,
}

impl fmt::Debug for FnExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FnExpression({})", self.name)
    }
}

impl Expression for FnExpression {
    fn eval(&self, row: &dyn Row) -> Result<Value<'static>> {
        (self.eval)(row)
    }
}

pub fn field(index: usize) -> ExpressionRef {
    Arc::new(FieldExpression { index })
}

pub fn literal(value: Value<'static>) -> ExpressionRef {
    Arc::new(LiteralExpression { value })
}

pub fn func(
    name: &'static str,
    eval: impl Fn(&dyn Row) -> Result<Value<'static>> + Send + Sync + 'static,
) -> ExpressionRef {
    Arc::new(FnExpression {
        name,
        eval: Box::new(eval),
    })
}

/// Predicate truthiness: only a boolean true keeps a row.
pub fn is_true(value: &Value<'_>) -> bool {
    matches!(value, Value::Bool(true))
}
