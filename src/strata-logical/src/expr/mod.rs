//! Expression system for logical plans.

mod agg;
pub mod builtin;
mod expression;

pub use agg::{AggFuncDesc, AggFuncKind, AggMode};
pub use expression::{col, lit, Expr, ScalarFunction};
