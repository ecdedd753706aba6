//! Sort operator.

use serde::{Deserialize, Serialize};
use strata_core::PlanId;

use super::{LogicalOp, PlanBase};
use crate::expr::Expr;

/// A sort key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ByItem {
    /// Expression to sort by.
    pub expr: Expr,
    /// Descending if true.
    pub desc: bool,
}

impl ByItem {
    /// Ascending key.
    pub fn asc(expr: Expr) -> Self {
        Self { expr, desc: false }
    }

    /// Descending key.
    pub fn desc(expr: Expr) -> Self {
        Self { expr, desc: true }
    }
}

impl std::fmt::Display for ByItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.desc {
            write!(f, "{}:desc", self.expr)
        } else {
            write!(f, "{}", self.expr)
        }
    }
}

/// Sort operator - row ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    /// Node id, schema and key info. The schema mirrors the input's.
    pub base: PlanBase,
    /// Sort keys in order of precedence.
    pub by_items: Vec<ByItem>,
    /// Input operator.
    pub input: Box<LogicalOp>,
}

impl Sort {
    /// Create a sort over `input`.
    pub fn new(id: PlanId, by_items: Vec<ByItem>, input: LogicalOp) -> Self {
        let schema = input.schema().clone();
        Self {
            base: PlanBase::new(id, schema),
            by_items,
            input: Box::new(input),
        }
    }
}
