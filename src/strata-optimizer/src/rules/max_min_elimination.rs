//! Max/min elimination rule.
//!
//! A scalar aggregation computing a single `max` or `min` only needs the first
//! row of its input in the right order:
//!
//! ```text
//! Aggregation: max(a)          Aggregation: max(a)
//!   DataSource        ==>        Limit: 1
//!                                  Sort: a desc
//!                                    Selection: not(isnull(a))   -- when a is nullable
//!                                      DataSource
//! ```
//!
//! The aggregation stays on top so that an empty input still yields `NULL`.
//! Several `max`/`min` functions over bare columns are split into one
//! aggregation each, every one reading its own copy of the input, and the
//! single-row results are joined back together.

use common_display::join_display;
use common_error::{StrataError, StrataResult};
use strata_core::{PlanId, Schema};
use strata_logical::expr::AggFuncKind;
use strata_logical::ops::{Aggregation, ByItem, Join, JoinType, Limit, Selection, Sort};
use strata_logical::LogicalOp;

use super::column_pruning::prune_columns;
use super::rule::{OptimizationRule, Transformed};
use super::util::clone_with_fresh_ids;
use crate::trace::OptimizeOp;

/// Max/min elimination rule.
pub struct MaxMinEliminator;

impl OptimizationRule for MaxMinEliminator {
    fn name(&self) -> &'static str {
        "max_min_eliminate"
    }

    fn description(&self) -> &'static str {
        "Compute scalar max/min from the first row of a sorted input"
    }

    fn optimize(&self, plan: LogicalOp, opt: &mut OptimizeOp<'_>) -> StrataResult<Transformed> {
        let mut changed = false;
        let plan = eliminate(plan, opt, &mut changed)?;
        Ok(Transformed::new(plan, changed))
    }
}

fn eliminate(op: LogicalOp, opt: &mut OptimizeOp<'_>, changed: &mut bool) -> StrataResult<LogicalOp> {
    let op = op.map_children(|child| eliminate(child, opt, changed))?;
    let LogicalOp::Aggregation(agg) = op else {
        return Ok(op);
    };
    let applicable = agg.group_by.is_empty()
        && !agg.agg_funcs.is_empty()
        && agg.agg_funcs.iter().all(|f| {
            matches!(f.kind, AggFuncKind::Max | AggFuncKind::Min)
                && f.args.len() == 1
                && f.args[0].ret_type().sorts_like_min_max()
        });
    if !applicable {
        return Ok(LogicalOp::Aggregation(agg));
    }
    if agg.agg_funcs.len() == 1 {
        let (agg, rewritten) = eliminate_single(agg, opt);
        *changed |= rewritten;
        return Ok(LogicalOp::Aggregation(agg));
    }
    if agg.agg_funcs.iter().all(|f| f.args[0].as_column().is_some()) {
        *changed = true;
        return split(agg, opt);
    }
    Ok(LogicalOp::Aggregation(agg))
}

/// Put `Limit 1 <- Sort <- [Selection]` under a single-function aggregation.
fn eliminate_single(mut agg: Aggregation, opt: &mut OptimizeOp<'_>) -> (Aggregation, bool) {
    if matches!(agg.input.as_ref(), LogicalOp::Limit(limit) if limit.count <= 1) {
        return (agg, false);
    }
    let Some(func) = agg.agg_funcs.first() else {
        return (agg, false);
    };
    let Some(arg) = func.args.first().cloned() else {
        return (agg, false);
    };
    let name = func.kind.name();
    let desc = func.kind == AggFuncKind::Max;

    let mut input = *agg.input;
    let mut selection = None;
    let mut sort = None;
    if !arg.columns().is_empty() {
        if arg.nullable() {
            let id = opt.alloc_plan_id();
            let not_null = arg.clone().is_null().logical_not();
            input = LogicalOp::Selection(Selection::new(id, vec![not_null], input));
            selection = Some(id);
        }
        let id = opt.alloc_plan_id();
        let by = if desc { ByItem::desc(arg) } else { ByItem::asc(arg) };
        input = LogicalOp::Sort(Sort::new(id, vec![by], input));
        sort = Some(id);
    }
    let limit = opt.alloc_plan_id();
    agg.input = Box::new(LogicalOp::Limit(Limit::new(limit, 0, 1, input)));

    let agg_id = agg.base.id;
    opt.append_step(
        agg_id,
        "Aggregation",
        || {
            let mut reason = format!("agg[{agg_id}] has only one function[{name}] without group by");
            if selection.is_some() {
                reason.push_str(&format!(
                    ", the columns in agg[{agg_id}] shouldn't be NULL and needs NULL to be filtered out"
                ));
            }
            if sort.is_some() {
                reason.push_str(&format!(", the columns in agg[{agg_id}] should be sorted"));
            }
            reason
        },
        || {
            let mut action = String::new();
            if let Some(id) = selection {
                action.push_str(&format!("add selection[{id}],"));
            }
            if let Some(id) = sort {
                action.push_str(&format!("add sort[{id}],"));
            }
            action.push_str(&format!(
                "add limit[{limit}] during eliminating agg[{agg_id}] {name} function"
            ));
            action
        },
    );
    (agg, true)
}

/// One aggregation per function, each over its own pruned copy of the input,
/// cross-joined back together. The joined schema equals the original one.
fn split(agg: Aggregation, opt: &mut OptimizeOp<'_>) -> StrataResult<LogicalOp> {
    let agg_id = agg.base.id;
    let Aggregation {
        base,
        agg_funcs,
        input,
        ..
    } = agg;

    let mut singles = Vec::with_capacity(agg_funcs.len());
    for (func, column) in agg_funcs.into_iter().zip(base.schema.columns) {
        let id = opt.alloc_plan_id();
        let copy = clone_with_fresh_ids(&input, opt);
        let used = func.args.iter().flat_map(|a| a.column_ids()).collect();
        let (copy, _) = prune_columns(copy, &used, &mut opt.untraced())?;
        let mut single = Aggregation::new(id, vec![], vec![func], Schema::new(vec![column]), copy);
        single.base.max_one_row = true;
        singles.push(single);
    }
    let agg_ids: Vec<PlanId> = singles.iter().map(|a| a.base.id).collect();

    let mut join_ids = Vec::new();
    let mut joined: Option<LogicalOp> = None;
    for single in singles {
        let (single, _) = eliminate_single(single, opt);
        let single = LogicalOp::Aggregation(single);
        joined = Some(match joined {
            None => single,
            Some(left) => {
                let id = opt.alloc_plan_id();
                join_ids.push(id);
                let mut join = Join::new(id, JoinType::Inner, left, single);
                join.base.max_one_row = true;
                LogicalOp::Join(join)
            }
        });
    }
    let joined = joined.ok_or_else(|| StrataError::plan(format!("agg[{agg_id}] has no functions")))?;

    opt.append_step(
        agg_id,
        "Aggregation",
        || {
            format!(
                "each column is sorted and can benefit from index/primary key in agg[{}] and none of them has group by clause",
                join_display(&agg_ids, ",")
            )
        },
        || {
            format!(
                "agg[{agg_id}] splited into aggs[{}], and add joins[{}] to connect them during eliminating agg[{agg_id}] multi min/max functions",
                join_display(&agg_ids, ","),
                join_display(&join_ids, ",")
            )
        },
    );
    Ok(joined)
}
