//! Rule-based rewriter for Strata logical plans.
//!
//! Rules run in a fixed order; a [`RuleFlags`] bitmask selects which of them
//! take part in a compilation:
//!
//! | order | flag | rule |
//! |-------|------|------|
//! | 1 | `PRUNE_COLUMNS` | [`ColumnPruner`] |
//! | 2 | `BUILD_KEY_INFO` | [`BuildKeyInfo`] |
//! | 3 | `ELIMINATE_AGG` | [`AggregationEliminator`] |
//! | 4 | `ELIMINATE_PROJECTION` | [`ProjectionEliminator`] |
//! | 5 | `MAX_MIN_ELIMINATE` | [`MaxMinEliminator`] |
//! | 6 | `PUSH_DOWN_AGG` | [`AggregationPushDown`] |
//! | 7 | `PRUNE_COLUMNS_AGAIN` | [`ColumnPruner`] |
//!
//! With tracing enabled, every rule that changes the plan leaves one
//! [`RuleStep`] on the context, holding the plan before the rule and the
//! individual rewrites it made.
//!
//! # Example
//!
//! ```rust
//! use common_config::OptimizerConfig;
//! use strata_core::DataType;
//! use strata_logical::expr::{AggFuncDesc, AggFuncKind};
//! use strata_logical::ops::TableInfo;
//! use strata_logical::PlanBuilder;
//! use strata_optimizer::{optimize, OptimizeContext, RuleFlags};
//!
//! let table = TableInfo::new("test.t")
//!     .with_column("a", DataType::Int64, false)
//!     .with_column("b", DataType::Int64, true);
//!
//! let mut ctx = OptimizeContext::new(OptimizerConfig::default().with_trace(true)).unwrap();
//! let builder = PlanBuilder::scan(ctx.ids_mut(), table);
//! let a = builder.col("a").unwrap();
//! let agg = builder.aggregate(vec![], vec![AggFuncDesc::new(AggFuncKind::Max, vec![a])]);
//! let max = agg.col_at(0).unwrap();
//! let plan = agg.project(vec![max]).build();
//!
//! let plan = optimize(&mut ctx, RuleFlags::all(), plan).unwrap();
//! println!("{}", plan.explain());
//! println!("{}", ctx.optimize_trace().unwrap().format_trace());
//! ```

mod context;
mod rules;
mod trace;

pub use context::OptimizeContext;
pub use rules::{
    AggregationEliminator, AggregationPushDown, BuildKeyInfo, ColumnPruner, MaxMinEliminator,
    OptimizationRule, Optimizer, ProjectionEliminator, RuleEntry, RuleFlags, Transformed,
};
pub use trace::{LogicalOptimizeTrace, OptimizeOp, RuleStep, TraceStep};

use common_error::StrataResult;
use strata_logical::LogicalOp;

/// Run the rules selected by `flags` over `root` with the default registry.
///
/// Stops at the first failing rule; the trace recorded up to that point
/// stays on `ctx`.
pub fn optimize(ctx: &mut OptimizeContext, flags: RuleFlags, root: LogicalOp) -> StrataResult<LogicalOp> {
    Optimizer::new().optimize(ctx, flags, root)
}
