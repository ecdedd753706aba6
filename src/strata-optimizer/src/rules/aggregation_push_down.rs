//! Aggregation push-down rule.
//!
//! Pre-aggregates rows below a join or a union so fewer rows reach it. The
//! original aggregation stays on top and merges the partial results: every
//! pushed function becomes a final-mode merge of its partial column
//! (`count` merges as `sum`).
//!
//! A projection directly below an aggregation is folded into the
//! aggregation's arguments first, so `Aggregation <- Projection <- Union`
//! can still be pushed. After a push across a join the join's keys are
//! rebuilt, and an aggregation now grouped on a key of the join becomes a
//! projection. Projections left redundant by such a conversion are folded
//! away before the rule returns.
//!
//! Disabled by [`OptimizerConfig::allow_agg_push_down`](common_config::OptimizerConfig).

use std::collections::HashSet;

use common_display::join_display;
use common_error::StrataResult;
use log::debug;
use strata_core::{Column, ColumnId, PlanId, Schema};
use strata_logical::expr::{col, lit, AggFuncDesc, AggFuncKind, Expr};
use strata_logical::ops::{Aggregation, Join, JoinType, Projection, Union};
use strata_logical::LogicalOp;

use super::aggregation_elimination::eliminate_aggregation;
use super::build_key_info::refresh_keys;
use super::projection_elimination::eliminate_projections;
use super::rule::{OptimizationRule, Transformed};
use super::util::{can_convert_to_projection, convert_agg_to_projection};
use crate::trace::OptimizeOp;

/// Aggregation push-down rule.
pub struct AggregationPushDown;

impl OptimizationRule for AggregationPushDown {
    fn name(&self) -> &'static str {
        "aggregation_push_down"
    }

    fn description(&self) -> &'static str {
        "Pre-aggregate below joins and unions"
    }

    fn optimize(&self, plan: LogicalOp, opt: &mut OptimizeOp<'_>) -> StrataResult<Transformed> {
        if !opt.config().allow_agg_push_down {
            debug!("aggregation push-down is disabled");
            return Ok(Transformed::no(plan));
        }
        let mut changed = false;
        let mut converted = false;
        let mut plan = push_down(plan, opt, &mut changed, &mut converted)?;
        if converted {
            plan = eliminate_projections(plan, opt, &mut changed)?;
        }
        Ok(Transformed::new(plan, changed))
    }
}

/// `converted` is set when an aggregation turned into a projection.
fn push_down(
    op: LogicalOp,
    opt: &mut OptimizeOp<'_>,
    changed: &mut bool,
    converted: &mut bool,
) -> StrataResult<LogicalOp> {
    let op = match op {
        LogicalOp::Aggregation(agg) => push_aggregation(agg, opt, changed, converted)?,
        other => other,
    };
    op.map_children(|child| push_down(child, opt, changed, converted))
}

fn push_aggregation(
    mut agg: Aggregation,
    opt: &mut OptimizeOp<'_>,
    changed: &mut bool,
    converted: &mut bool,
) -> StrataResult<LogicalOp> {
    let agg_id = agg.base.id;
    let input = match *agg.input {
        LogicalOp::Projection(proj) => {
            let (input, merged) =
                merge_projection(agg_id, &mut agg.group_by, &mut agg.agg_funcs, proj, opt);
            *changed |= merged;
            input
        }
        other => other,
    };
    let input = match input {
        LogicalOp::Join(join) => {
            let (join, pushed) =
                push_across_join(agg_id, &mut agg.agg_funcs, &agg.group_by, join, opt);
            if pushed {
                *changed = true;
                let (join, _) = refresh_keys(join)?;
                agg.input = Box::new(join);
                let op = eliminate_aggregation(agg, opt, changed)?;
                *converted |= matches!(op, LogicalOp::Projection(_));
                return Ok(op);
            }
            join
        }
        LogicalOp::Union(union) => {
            let (union, pushed) =
                push_across_union(agg_id, &mut agg.agg_funcs, &agg.group_by, union, opt)?;
            *changed |= pushed;
            *converted |= pushed
                && union
                    .inputs
                    .iter()
                    .any(|c| matches!(c, LogicalOp::Projection(_)));
            LogicalOp::Union(union)
        }
        other => other,
    };
    agg.input = Box::new(input);
    Ok(LogicalOp::Aggregation(agg))
}

/// Substitute a deterministic projection into the aggregation above it.
fn merge_projection(
    agg_id: PlanId,
    group_by: &mut Vec<Expr>,
    funcs: &mut [AggFuncDesc],
    proj: Projection,
    opt: &mut OptimizeOp<'_>,
) -> (LogicalOp, bool) {
    if !proj.exprs.iter().all(Expr::is_deterministic) {
        return (LogicalOp::Projection(proj), false);
    }
    let schema = &proj.base.schema;
    let new_group_by: Vec<Expr> = group_by
        .iter()
        .map(|g| g.substitute(schema, &proj.exprs))
        .collect();
    let new_args: Vec<Vec<Expr>> = funcs
        .iter()
        .map(|f| f.args.iter().map(|a| a.substitute(schema, &proj.exprs)).collect())
        .collect();
    *group_by = new_group_by;
    for (func, args) in funcs.iter_mut().zip(new_args) {
        func.args = args;
    }
    let proj_id = proj.base.id;
    opt.append_step(
        agg_id,
        "Aggregation",
        || format!("Proj[{proj_id}] is directly below an agg[{agg_id}] and has no side effects"),
        || {
            format!(
                "proj[{proj_id}] is eliminated, and agg[{agg_id}]'s functions changed into[{}]",
                join_display(funcs.iter(), ",")
            )
        },
    );
    (*proj.input, true)
}

/// Add `column` to `columns` unless already present.
fn add_column(columns: &mut Vec<Column>, column: &Column) {
    if !columns.iter().any(|c| c.id == column.id) {
        columns.push(column.clone());
    }
}

/// Columns each join side must keep grouped on: group-by columns and
/// everything the join conditions read.
fn join_group_columns(group_by: &[Expr], join: &Join) -> [Vec<Column>; 2] {
    let left_ids = join.left.schema().id_set();
    let side_of = |c: &Column| usize::from(!left_ids.contains(&c.id));
    let mut sides: [Vec<Column>; 2] = Default::default();

    let by_membership = group_by.iter().chain(&join.other_conditions);
    for column in by_membership.flat_map(Expr::columns) {
        add_column(&mut sides[side_of(&column)], &column);
    }
    for (left, right) in &join.equal_conditions {
        add_column(&mut sides[0], left);
        add_column(&mut sides[1], right);
    }
    for column in join.left_conditions.iter().flat_map(Expr::columns) {
        add_column(&mut sides[0], &column);
    }
    for column in join.right_conditions.iter().flat_map(Expr::columns) {
        add_column(&mut sides[1], &column);
    }
    sides
}

/// Partial aggregation of `funcs` over `input`, grouped by `group_by`.
///
/// Outputs one fresh column per function followed by the group columns
/// themselves (through `firstrow`), so references above stay valid.
fn partial_aggregation(
    id: PlanId,
    funcs: Vec<AggFuncDesc>,
    group_by: Vec<Expr>,
    schema: Schema,
    input: LogicalOp,
) -> Aggregation {
    let mut all_funcs = funcs;
    all_funcs.extend(
        group_by
            .iter()
            .map(|g| AggFuncDesc::new(AggFuncKind::FirstRow, vec![g.clone()])),
    );
    let group_by = if group_by.is_empty() {
        vec![lit(1)]
    } else {
        group_by
    };
    Aggregation::new(id, group_by, all_funcs, schema, input)
}

fn partial_schema(
    funcs: &[AggFuncDesc],
    group_columns: &[Column],
    opt: &mut OptimizeOp<'_>,
) -> (Vec<Column>, Schema) {
    let partial: Vec<Column> = funcs
        .iter()
        .map(|f| Aggregation::output_column(opt.ids(), f))
        .collect();
    let mut columns = partial.clone();
    columns.extend(group_columns.iter().cloned());
    (partial, Schema::new(columns))
}

fn push_across_join(
    agg_id: PlanId,
    funcs: &mut [AggFuncDesc],
    group_by: &[Expr],
    mut join: Join,
    opt: &mut OptimizeOp<'_>,
) -> (LogicalOp, bool) {
    if !matches!(
        join.join_type,
        JoinType::Inner | JoinType::LeftOuter | JoinType::RightOuter
    ) {
        return (LogicalOp::Join(join), false);
    }
    let join_id = join.base.id;
    let left_ids = join.left.schema().id_set();
    let right_ids = join.right.schema().id_set();

    let mut side_funcs: [Vec<usize>; 2] = Default::default();
    let mut unbound = Vec::new();
    for (i, func) in funcs.iter().enumerate() {
        if !func.is_decomposable_with_join() {
            debug!("agg[{agg_id}]: {func} is not decomposable with join[{join_id}]");
            return (LogicalOp::Join(join), false);
        }
        let ids: HashSet<ColumnId> = func.args.iter().flat_map(Expr::column_ids).collect();
        if ids.is_empty() {
            unbound.push(i);
            continue;
        }
        let from_left = ids.iter().any(|id| left_ids.contains(id));
        let from_right = ids.iter().any(|id| right_ids.contains(id));
        if from_left && from_right {
            debug!("agg[{agg_id}]: {func} reads both sides of join[{join_id}]");
            return (LogicalOp::Join(join), false);
        }
        side_funcs[usize::from(!from_left)].push(i);
    }

    let null_supplying = match join.join_type {
        JoinType::LeftOuter => [false, true],
        JoinType::RightOuter => [true, false],
        _ => [false, false],
    };
    let group_columns = join_group_columns(group_by, &join);
    // Functions reading no column, like count(1), go to the right side
    // unless only the left one can take a partial aggregation.
    let right_open = !null_supplying[1] && accepts_partial(&join.right, &group_columns[1]);
    let left_open = !null_supplying[0] && accepts_partial(&join.left, &group_columns[0]);
    let target = usize::from(right_open || !left_open);
    side_funcs[target].extend(unbound);
    side_funcs[target].sort_unstable();

    let counts_or_sums = side_funcs.clone().map(|indices| {
        indices
            .iter()
            .any(|&i| matches!(funcs[i].kind, AggFuncKind::Count | AggFuncKind::Sum))
    });
    let mut side = JoinSide {
        agg_id,
        join_id,
        funcs,
        opt,
    };

    let mut pushed = false;
    if !counts_or_sums[0] && !null_supplying[1] {
        let (right, done) = side.push(*join.right, &side_funcs[1], &group_columns[1], "right");
        join.right = Box::new(right);
        pushed |= done;
    }
    if !counts_or_sums[1] && !null_supplying[0] {
        let (left, done) = side.push(*join.left, &side_funcs[0], &group_columns[0], "left");
        join.left = Box::new(left);
        pushed |= done;
    }
    let mut op = LogicalOp::Join(join);
    if pushed {
        op.rebuild_schema();
    }
    (op, pushed)
}

/// Whether grouping `child` on `group_columns` can reduce its rows.
fn accepts_partial(child: &LogicalOp, group_columns: &[Column]) -> bool {
    if matches!(child, LogicalOp::Aggregation(_) | LogicalOp::Join(_)) {
        return false;
    }
    let group_ids: HashSet<ColumnId> = group_columns.iter().map(|c| c.id).collect();
    child.schema().key_covered_by(&group_ids).is_none()
}

struct JoinSide<'f, 'o, 'a> {
    agg_id: PlanId,
    join_id: PlanId,
    funcs: &'f mut [AggFuncDesc],
    opt: &'o mut OptimizeOp<'a>,
}

impl JoinSide<'_, '_, '_> {
    /// Put a partial aggregation of `funcs[indices]` on top of `child`.
    fn push(
        &mut self,
        child: LogicalOp,
        indices: &[usize],
        group_columns: &[Column],
        path: &str,
    ) -> (LogicalOp, bool) {
        if indices
            .iter()
            .all(|&i| self.funcs[i].kind == AggFuncKind::FirstRow)
        {
            return (child, false);
        }
        if !accepts_partial(&child, group_columns) {
            return (child, false);
        }

        let funcs: Vec<AggFuncDesc> = indices.iter().map(|&i| self.funcs[i].clone()).collect();
        let id = self.opt.alloc_plan_id();
        let (partial, schema) = partial_schema(&funcs, group_columns, self.opt);
        let group_by = group_columns.iter().map(col).collect();
        let (agg_id, join_id) = (self.agg_id, self.join_id);
        self.opt.append_step(
            agg_id,
            "Aggregation",
            || {
                format!(
                    "agg[{agg_id}]'s functions[{}] are decomposable with join",
                    join_display(funcs.iter(), ",")
                )
            },
            || format!("agg[{agg_id}] pushed down across join[{join_id}], and join {path} path becomes agg[{id}]"),
        );
        let pushed = partial_aggregation(id, funcs, group_by, schema, child);

        for (&i, column) in indices.iter().zip(&partial) {
            self.funcs[i] = self.funcs[i].clone().into_final(col(column));
        }
        (LogicalOp::Aggregation(pushed), true)
    }
}

fn push_across_union(
    agg_id: PlanId,
    funcs: &mut [AggFuncDesc],
    group_by: &[Expr],
    mut union: Union,
    opt: &mut OptimizeOp<'_>,
) -> StrataResult<(Union, bool)> {
    let union_id = union.base.id;
    if funcs.is_empty() || union.inputs.is_empty() {
        return Ok((union, false));
    }
    if let Some(func) = funcs.iter().find(|f| !f.is_decomposable_with_union()) {
        debug!("agg[{agg_id}]: {func} is not decomposable with union[{union_id}]");
        return Ok((union, false));
    }
    let Some(group_columns) = group_by
        .iter()
        .map(|g| g.as_column().cloned())
        .collect::<Option<Vec<_>>>()
    else {
        return Ok((union, false));
    };
    let mut distinct_groups = Vec::with_capacity(group_columns.len());
    group_columns
        .iter()
        .for_each(|c| add_column(&mut distinct_groups, c));

    let (partial, schema) = partial_schema(funcs, &distinct_groups, opt);
    let union_schema = union.base.schema.clone();
    let mut children = Vec::with_capacity(union.inputs.len());
    for branch in std::mem::take(&mut union.inputs) {
        let branch_exprs: Vec<Expr> = branch.schema().columns.iter().map(col).collect();
        let rebase = |e: &Expr| e.substitute(&union_schema, &branch_exprs);
        let branch_funcs = funcs
            .iter()
            .map(|f| {
                let mut f = f.clone();
                f.args = f.args.iter().map(rebase).collect();
                f
            })
            .collect();
        let branch_group: Vec<Expr> = distinct_groups.iter().map(|c| rebase(&col(c))).collect();
        let group_ids: HashSet<ColumnId> = branch_group
            .iter()
            .filter_map(|g| g.as_column().map(|c| c.id))
            .collect();
        let covers_key = branch.schema().key_covered_by(&group_ids).is_some();

        let id = opt.alloc_plan_id();
        let agg = partial_aggregation(id, branch_funcs, branch_group, schema.clone(), branch);
        let child = if covers_key && can_convert_to_projection(&agg) {
            convert_agg_to_projection(agg, opt)?
        } else {
            LogicalOp::Aggregation(agg)
        };
        children.push(child);
    }

    opt.append_step(
        agg_id,
        "Aggregation",
        || {
            format!(
                "agg[{agg_id}] functions[{}] are decomposable with union",
                join_display(funcs.iter(), ",")
            )
        },
        || {
            let labels = children
                .iter()
                .map(|c| format!("[id:{},tp:{}]", c.id(), c.tp()));
            format!(
                "agg[{agg_id}] pushed down, and union[{union_id}]'s children changed into[{}]",
                join_display(labels, ",")
            )
        },
    );
    union.inputs = children;
    union.base.schema = schema;
    for (func, column) in funcs.iter_mut().zip(&partial) {
        *func = func.clone().into_final(col(column));
    }
    Ok((union, true))
}
