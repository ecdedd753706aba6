//! Optimization rule trait.

use common_error::StrataResult;
use strata_logical::LogicalOp;

use crate::trace::OptimizeOp;

/// A single optimization rule that can transform a logical plan.
///
/// A rule must return a plan equivalent to its input, tolerate missing
/// key info, and leave a subtree untouched when it cannot rewrite it safely.
pub trait OptimizationRule: Send + Sync {
    /// Get the name of this rule, as used in traces and configuration.
    fn name(&self) -> &'static str;

    /// Get a description of what this rule does.
    fn description(&self) -> &'static str {
        "No description available"
    }

    /// Apply this rule to the plan.
    ///
    /// `opt` allocates ids for new nodes and columns and records trace steps.
    fn optimize(&self, plan: LogicalOp, opt: &mut OptimizeOp<'_>) -> StrataResult<Transformed>;
}

/// The result of applying an optimization rule.
#[derive(Debug, Clone)]
pub struct Transformed {
    /// The (potentially transformed) plan.
    pub plan: LogicalOp,
    /// Whether the plan was actually changed.
    pub changed: bool,
}

impl Transformed {
    /// Create a new transformed result.
    pub fn new(plan: LogicalOp, changed: bool) -> Self {
        Self { plan, changed }
    }

    /// Create a new transformed result indicating the plan was changed.
    pub fn yes(plan: LogicalOp) -> Self {
        Self::new(plan, true)
    }

    /// Create a new transformed result indicating the plan was unchanged.
    pub fn no(plan: LogicalOp) -> Self {
        Self::new(plan, false)
    }
}

impl From<LogicalOp> for Transformed {
    fn from(plan: LogicalOp) -> Self {
        Self::no(plan)
    }
}
