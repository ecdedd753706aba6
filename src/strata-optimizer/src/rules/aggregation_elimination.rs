//! Aggregation elimination rule.
//!
//! Two rewrites, applied bottom-up to every aggregation:
//! - a `DISTINCT` aggregate whose arguments cover a unique key of the input
//!   drops the `DISTINCT`;
//! - an aggregation whose grouping columns cover a unique key of the input
//!   sees one row per group and becomes a projection.
//!
//! Both read key info and do nothing when none was built.

use std::collections::HashSet;

use common_error::StrataResult;
use strata_core::{ColumnId, KeyInfo, Schema};
use strata_logical::ops::Aggregation;
use strata_logical::LogicalOp;

use super::rule::{OptimizationRule, Transformed};
use super::util::{can_convert_to_projection, convert_agg_to_projection};
use crate::trace::OptimizeOp;

/// Aggregation elimination rule.
pub struct AggregationEliminator;

impl OptimizationRule for AggregationEliminator {
    fn name(&self) -> &'static str {
        "aggregation_eliminate"
    }

    fn description(&self) -> &'static str {
        "Drop DISTINCT and grouping made redundant by a unique key"
    }

    fn optimize(&self, plan: LogicalOp, opt: &mut OptimizeOp<'_>) -> StrataResult<Transformed> {
        let mut changed = false;
        let plan = eliminate(plan, opt, &mut changed)?;
        Ok(Transformed::new(plan, changed))
    }
}

fn eliminate(op: LogicalOp, opt: &mut OptimizeOp<'_>, changed: &mut bool) -> StrataResult<LogicalOp> {
    match op.map_children(|child| eliminate(child, opt, changed))? {
        LogicalOp::Aggregation(agg) => eliminate_aggregation(agg, opt, changed),
        other => Ok(other),
    }
}

/// Simplify one aggregation using the key info of its input.
pub(crate) fn eliminate_aggregation(
    mut agg: Aggregation,
    opt: &mut OptimizeOp<'_>,
    changed: &mut bool,
) -> StrataResult<LogicalOp> {
    *changed |= eliminate_distinct(&mut agg, opt);
    if let Some(key) = group_by_unique_key(&agg) {
        if can_convert_to_projection(&agg) {
            let id = agg.base.id;
            let proj = convert_agg_to_projection(agg, opt)?;
            opt.append_step(
                id,
                "Aggregation",
                || format!("{key} is a unique key"),
                || "aggregation is simplified to a projection".to_string(),
            );
            *changed = true;
            return Ok(proj);
        }
    }
    Ok(LogicalOp::Aggregation(agg))
}

fn covered_key(schema: &Schema, ids: &HashSet<ColumnId>) -> Option<KeyInfo> {
    schema.key_covered_by(ids).cloned()
}

fn eliminate_distinct(agg: &mut Aggregation, opt: &mut OptimizeOp<'_>) -> bool {
    let mut changed = false;
    let input_schema = agg.input.schema();
    for func in agg.agg_funcs.iter_mut().filter(|f| f.has_distinct) {
        let args: Option<HashSet<ColumnId>> = func
            .args
            .iter()
            .map(|a| a.as_column().map(|c| c.id))
            .collect();
        let Some(key) = args.and_then(|ids| covered_key(input_schema, &ids)) else {
            continue;
        };
        func.has_distinct = false;
        let name = func.kind.name();
        opt.append_step(
            agg.base.id,
            "Aggregation",
            || format!("{key} is a unique key"),
            || format!("{name}(distinct ...) is simplified to {name}(...)"),
        );
        changed = true;
    }
    changed
}

fn group_by_unique_key(agg: &Aggregation) -> Option<KeyInfo> {
    let group_cols: HashSet<ColumnId> = agg
        .group_by
        .iter()
        .filter_map(|g| g.as_column().map(|c| c.id))
        .collect();
    if group_cols.is_empty() {
        return None;
    }
    covered_key(agg.input.schema(), &group_cols)
}
