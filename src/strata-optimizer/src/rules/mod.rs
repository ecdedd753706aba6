//! Rewrite rules for logical plans.
//!
//! Each rule is a unit struct implementing [`OptimizationRule`]; the
//! [`Optimizer`] runs them in a fixed registry order selected by
//! [`RuleFlags`].
//!
//! - **Column pruning**: drop output columns no ancestor uses
//! - **Build key info**: derive unique keys and single-row facts
//! - **Aggregation elimination**: drop `DISTINCT` and grouping made
//!   redundant by a unique key
//! - **Projection elimination**: merge or remove redundant projections
//! - **Max/min elimination**: turn scalar `max`/`min` into sort + limit
//! - **Aggregation push-down**: pre-aggregate below joins and unions

mod aggregation_elimination;
mod aggregation_push_down;
mod build_key_info;
mod column_pruning;
mod flags;
mod max_min_elimination;
mod optimizer;
mod projection_elimination;
mod rule;
mod util;

pub use aggregation_elimination::AggregationEliminator;
pub use aggregation_push_down::AggregationPushDown;
pub use build_key_info::BuildKeyInfo;
pub use column_pruning::ColumnPruner;
pub use flags::RuleFlags;
pub use max_min_elimination::MaxMinEliminator;
pub use optimizer::{Optimizer, RuleEntry};
pub use projection_elimination::ProjectionEliminator;
pub use rule::{OptimizationRule, Transformed};
