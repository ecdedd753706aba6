//! Limit operator.

use serde::{Deserialize, Serialize};
use strata_core::PlanId;

use super::{LogicalOp, PlanBase};

/// Limit operator - skips `offset` rows and returns at most `count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Limit {
    /// Node id, schema and key info. The schema mirrors the input's.
    pub base: PlanBase,
    /// Rows to skip.
    pub offset: u64,
    /// Maximum number of rows returned.
    pub count: u64,
    /// Input operator.
    pub input: Box<LogicalOp>,
}

impl Limit {
    /// Create a limit over `input`.
    pub fn new(id: PlanId, offset: u64, count: u64, input: LogicalOp) -> Self {
        let schema = input.schema().clone();
        Self {
            base: PlanBase::new(id, schema),
            offset,
            count,
            input: Box::new(input),
        }
    }
}
