//! Column pruning rule.
//!
//! Walks the plan top-down with the set of columns the parent needs and
//! drops every output column, projection expression and aggregate function
//! nothing above uses. Columns referenced by a node's own payload (join
//! conditions, grouping items, sort keys) are always kept.

use std::collections::HashSet;

use common_display::join_display;
use common_error::StrataResult;
use log::debug;
use strata_core::{Column, ColumnId, Schema};
use strata_logical::expr::{lit, AggFuncDesc, AggFuncKind, Expr};
use strata_logical::ops::{Aggregation, Projection};
use strata_logical::LogicalOp;

use super::rule::{OptimizationRule, Transformed};
use crate::trace::OptimizeOp;

/// Column pruning rule.
pub struct ColumnPruner;

impl OptimizationRule for ColumnPruner {
    fn name(&self) -> &'static str {
        "column_prune"
    }

    fn description(&self) -> &'static str {
        "Remove output columns that no ancestor uses"
    }

    fn optimize(&self, plan: LogicalOp, opt: &mut OptimizeOp<'_>) -> StrataResult<Transformed> {
        let used = plan.schema().id_set();
        let (plan, changed) = prune_columns(plan, &used, opt)?;
        Ok(Transformed::new(plan, changed))
    }
}

fn column_ids<'e>(exprs: impl IntoIterator<Item = &'e Expr>) -> HashSet<ColumnId> {
    exprs.into_iter().flat_map(Expr::column_ids).collect()
}

fn record_pruned<T: std::fmt::Display>(
    opt: &mut OptimizeOp<'_>,
    op: &LogicalOp,
    what: &str,
    pruned: &[T],
    reason: &str,
) {
    if pruned.is_empty() {
        return;
    }
    opt.append_step_for(
        op,
        || reason.to_string(),
        || {
            format!(
                "{}[{}]'s {what}[{}] have been pruned",
                op.tp(),
                op.id(),
                join_display(pruned, ",")
            )
        },
    );
}

const UNUSED: &str = "columns are not used by the parent";

/// Prune `op` so that it outputs at least `used` (ids absent from its
/// schema are ignored). Returns the new node and whether anything changed.
pub(crate) fn prune_columns(
    op: LogicalOp,
    used: &HashSet<ColumnId>,
    opt: &mut OptimizeOp<'_>,
) -> StrataResult<(LogicalOp, bool)> {
    match op {
        LogicalOp::DataSource(mut ds) => {
            let before = ds.base.schema.columns.len();
            let (mut kept, mut pruned): (Vec<Column>, Vec<Column>) = ds
                .base
                .schema
                .columns
                .drain(..)
                .partition(|c| used.contains(&c.id));
            if kept.is_empty() && !pruned.is_empty() {
                kept.push(pruned.remove(0));
            }
            ds.base.schema.columns = kept;
            ds.base.schema.retain_valid_keys();
            let changed = ds.base.schema.len() != before;
            let op = LogicalOp::DataSource(ds);
            record_pruned(opt, &op, "columns", &pruned, UNUSED);
            Ok((op, changed))
        }
        LogicalOp::Projection(proj) => prune_projection(proj, used, opt),
        LogicalOp::Selection(mut sel) => {
            let mut child_used = used.clone();
            child_used.extend(column_ids(&sel.conditions));
            let (input, changed) = prune_columns(*sel.input, &child_used, opt)?;
            sel.input = Box::new(input);
            let mut op = LogicalOp::Selection(sel);
            op.rebuild_schema();
            Ok((op, changed))
        }
        LogicalOp::Aggregation(agg) => prune_aggregation(agg, used, opt),
        LogicalOp::Sort(mut sort) => {
            let (constant, by_items): (Vec<_>, Vec<_>) =
                sort.by_items.drain(..).partition(|b| b.expr.is_constant());
            sort.by_items = by_items;
            let mut child_used = used.clone();
            child_used.extend(column_ids(sort.by_items.iter().map(|b| &b.expr)));
            let (input, changed) = prune_columns(*sort.input, &child_used, opt)?;
            sort.input = Box::new(input);

            let pruned_items: Vec<String> = constant.iter().map(|b| b.expr.to_string()).collect();
            let mut op = if sort.by_items.is_empty() {
                if !pruned_items.is_empty() {
                    opt.append_step(
                        sort.base.id,
                        "Sort",
                        || "byItems are constant".to_string(),
                        || format!("Sort[{}] is removed, all of its byItems are constant", sort.base.id),
                    );
                }
                *sort.input
            } else {
                let op = LogicalOp::Sort(sort);
                record_pruned(opt, &op, "byItems", &pruned_items, "byItems are constant");
                op
            };
            op.rebuild_schema();
            Ok((op, changed || !pruned_items.is_empty()))
        }
        LogicalOp::Limit(mut limit) => {
            let (input, changed) = prune_columns(*limit.input, used, opt)?;
            limit.input = Box::new(input);
            let mut op = LogicalOp::Limit(limit);
            op.rebuild_schema();
            Ok((op, changed))
        }
        LogicalOp::Join(mut join) => {
            let before = join.base.schema.ids();
            let mut needed = used.clone();
            needed.extend(column_ids(&join.conditions()));
            let (left, left_changed) = prune_columns(*join.left, &needed, opt)?;
            let (right, right_changed) = prune_columns(*join.right, &needed, opt)?;
            join.left = Box::new(left);
            join.right = Box::new(right);
            let mut op = LogicalOp::Join(join);
            op.rebuild_schema();
            let changed = left_changed || right_changed || op.schema().ids() != before;
            Ok((op, changed))
        }
        LogicalOp::Apply(mut apply) => {
            let before = apply.base.schema.ids();
            let mut needed = used.clone();
            needed.extend(column_ids(&apply.conditions));
            needed.extend(apply.correlated_columns.iter().map(|c| c.id));
            let (outer, outer_changed) = prune_columns(*apply.outer, &needed, opt)?;
            let (inner, inner_changed) = prune_columns(*apply.inner, &needed, opt)?;
            apply.outer = Box::new(outer);
            apply.inner = Box::new(inner);
            let mut op = LogicalOp::Apply(apply);
            op.rebuild_schema();
            let changed = outer_changed || inner_changed || op.schema().ids() != before;
            Ok((op, changed))
        }
        LogicalOp::Union(mut union) => {
            let mut positions: Vec<usize> = union
                .base
                .schema
                .columns
                .iter()
                .enumerate()
                .filter(|(_, c)| used.contains(&c.id))
                .map(|(i, _)| i)
                .collect();
            if positions.is_empty() && !union.base.schema.columns.is_empty() {
                // Rows must still be produced; one position is enough.
                positions.push(0);
            }

            let mut changed = positions.len() != union.base.schema.len();
            let mut inputs = Vec::with_capacity(union.inputs.len());
            for input in std::mem::take(&mut union.inputs) {
                let wanted: Vec<Column> = positions
                    .iter()
                    .filter_map(|&i| input.schema().columns.get(i).cloned())
                    .collect();
                let wanted_ids: HashSet<ColumnId> = wanted.iter().map(|c| c.id).collect();
                let (input, child_changed) = prune_columns(input, &wanted_ids, opt)?;
                changed |= child_changed;
                if input.schema().ids() == wanted.iter().map(|c| c.id).collect::<Vec<_>>() {
                    inputs.push(input);
                } else {
                    changed = true;
                    let exprs = wanted.iter().map(|c| Expr::Column(c.clone())).collect();
                    let proj = Projection::new(opt.alloc_plan_id(), exprs, Schema::new(wanted), input);
                    inputs.push(LogicalOp::Projection(proj));
                }
            }
            union.inputs = inputs;

            let pruned: Vec<Column> = union
                .base
                .schema
                .columns
                .iter()
                .enumerate()
                .filter(|(i, _)| !positions.contains(i))
                .map(|(_, c)| c.clone())
                .collect();
            union.base.schema.columns = positions
                .iter()
                .map(|&i| union.base.schema.columns[i].clone())
                .collect();
            union.base.schema.retain_valid_keys();
            let op = LogicalOp::Union(union);
            record_pruned(opt, &op, "columns", &pruned, UNUSED);
            Ok((op, changed))
        }
    }
}

fn prune_projection(
    mut proj: Projection,
    used: &HashSet<ColumnId>,
    opt: &mut OptimizeOp<'_>,
) -> StrataResult<(LogicalOp, bool)> {
    let mut pruned = Vec::new();
    let mut exprs = Vec::with_capacity(proj.exprs.len());
    let mut columns = Vec::with_capacity(proj.exprs.len());
    for (expr, column) in proj.exprs.drain(..).zip(proj.base.schema.columns.drain(..)) {
        if used.contains(&column.id) || expr.has_side_effects() {
            exprs.push(expr);
            columns.push(column);
        } else {
            pruned.push(column);
        }
    }
    proj.exprs = exprs;
    proj.base.schema.columns = columns;
    proj.base.schema.retain_valid_keys();

    let child_used = column_ids(&proj.exprs);
    let (input, child_changed) = prune_columns(*proj.input, &child_used, opt)?;
    proj.input = Box::new(input);
    let op = LogicalOp::Projection(proj);
    record_pruned(opt, &op, "columns", &pruned, UNUSED);
    Ok((op, child_changed || !pruned.is_empty()))
}

fn prune_aggregation(
    mut agg: Aggregation,
    used: &HashSet<ColumnId>,
    opt: &mut OptimizeOp<'_>,
) -> StrataResult<(LogicalOp, bool)> {
    let all_first_row = agg.agg_funcs.iter().all(|f| f.kind == AggFuncKind::FirstRow);
    let mut keep: Vec<bool> = agg
        .agg_funcs
        .iter()
        .zip(&agg.base.schema.columns)
        .map(|(f, c)| used.contains(&c.id) || f.has_side_effects())
        .collect();
    if !keep.iter().any(|k| *k) {
        // Keep one function so the node still yields a row per group.
        if let Some(i) = agg
            .agg_funcs
            .iter()
            .position(|f| f.args.iter().all(Expr::is_constant))
        {
            keep[i] = true;
        }
    }

    let mut pruned_funcs: Vec<AggFuncDesc> = Vec::new();
    let mut funcs = Vec::with_capacity(agg.agg_funcs.len());
    let mut columns = Vec::with_capacity(agg.agg_funcs.len());
    for ((func, column), keep) in agg
        .agg_funcs
        .drain(..)
        .zip(agg.base.schema.columns.drain(..))
        .zip(keep)
    {
        if keep {
            funcs.push(func);
            columns.push(column);
        } else {
            pruned_funcs.push(func);
        }
    }
    let mut changed = !pruned_funcs.is_empty();
    if funcs.is_empty() {
        let kind = if all_first_row {
            AggFuncKind::FirstRow
        } else {
            AggFuncKind::Count
        };
        let func = AggFuncDesc::new(kind, vec![lit(1)]);
        columns.push(Aggregation::output_column(opt.ids(), &func));
        funcs.push(func);
        changed = true;
    }
    agg.agg_funcs = funcs;
    agg.base.schema.columns = columns;
    agg.base.schema.retain_valid_keys();

    let had_group_by = !agg.group_by.is_empty();
    let (constant, mut group_by): (Vec<Expr>, Vec<Expr>) =
        agg.group_by.drain(..).partition(Expr::is_constant);
    let mut pruned_items = constant;
    if group_by.is_empty() && had_group_by {
        // Grouping by constants still yields no row over an empty input.
        let one = lit(1);
        if let Some(pos) = pruned_items.iter().position(|e| *e == one) {
            pruned_items.remove(pos);
        } else {
            debug!("Replacing constant group-by items of agg[{}] by 1", agg.base.id);
        }
        group_by.push(one);
    }
    agg.group_by = group_by;
    changed |= !pruned_items.is_empty();

    let mut child_used = column_ids(&agg.group_by);
    child_used.extend(column_ids(agg.agg_funcs.iter().flat_map(|f| &f.args)));
    let (input, child_changed) = prune_columns(*agg.input, &child_used, opt)?;
    agg.input = Box::new(input);

    let op = LogicalOp::Aggregation(agg);
    record_pruned(opt, &op, "functions", &pruned_funcs, UNUSED);
    record_pruned(opt, &op, "groupByItems", &pruned_items, "groupByItems are constant");
    Ok((op, changed || child_changed))
}
