//! Selection operator.

use serde::{Deserialize, Serialize};
use strata_core::PlanId;

use super::{LogicalOp, PlanBase};
use crate::expr::Expr;

/// Selection operator - keeps rows satisfying every condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Node id, schema and key info. The schema mirrors the input's.
    pub base: PlanBase,
    /// Conjunctive conditions.
    pub conditions: Vec<Expr>,
    /// Input operator.
    pub input: Box<LogicalOp>,
}

impl Selection {
    /// Create a selection over `input`.
    pub fn new(id: PlanId, conditions: Vec<Expr>, input: LogicalOp) -> Self {
        let schema = input.schema().clone();
        Self {
            base: PlanBase::new(id, schema),
            conditions,
            input: Box::new(input),
        }
    }
}
