//! Projection elimination rule.
//!
//! - A projection directly over another deterministic projection
//!   absorbs it: the child's expressions are substituted into the parent's.
//! - A projection whose expressions are all bare columns is removed when
//!   its parent does not need its output column ids (the root and union
//!   branches keep theirs). Every ancestor then refers to the underlying
//!   columns instead.

use std::collections::HashMap;

use common_display::join_display;
use common_error::StrataResult;
use strata_core::{Column, ColumnId, Schema};
use strata_logical::expr::Expr;
use strata_logical::LogicalOp;

use super::rule::{OptimizationRule, Transformed};
use crate::trace::OptimizeOp;

/// Projection elimination rule.
pub struct ProjectionEliminator;

impl OptimizationRule for ProjectionEliminator {
    fn name(&self) -> &'static str {
        "projection_eliminate"
    }

    fn description(&self) -> &'static str {
        "Merge stacked projections and remove column-only projections"
    }

    fn optimize(&self, plan: LogicalOp, opt: &mut OptimizeOp<'_>) -> StrataResult<Transformed> {
        let mut changed = false;
        let plan = eliminate_projections(plan, opt, &mut changed)?;
        Ok(Transformed::new(plan, changed))
    }
}

/// One elimination pass over the whole plan; the root keeps its projection.
pub(crate) fn eliminate_projections(
    plan: LogicalOp,
    opt: &mut OptimizeOp<'_>,
    changed: &mut bool,
) -> StrataResult<LogicalOp> {
    let mut replace = HashMap::new();
    eliminate(plan, &mut replace, false, opt, changed)
}

fn replace_column(column: &mut Column, replace: &HashMap<ColumnId, Column>) {
    if let Some(new) = replace.get(&column.id) {
        *column = new.clone();
    }
}

fn replace_schema(schema: &mut Schema, replace: &HashMap<ColumnId, Column>) {
    schema
        .columns
        .iter_mut()
        .chain(schema.keys.iter_mut().flat_map(|k| k.0.iter_mut()))
        .for_each(|c| replace_column(c, replace));
}

/// Point every column reference of `op`'s own payload and schema at the
/// replacement columns.
fn replace_columns(op: &mut LogicalOp, replace: &HashMap<ColumnId, Column>) {
    if replace.is_empty() {
        return;
    }
    match op {
        LogicalOp::DataSource(_) | LogicalOp::Union(_) | LogicalOp::Limit(_) => {}
        LogicalOp::Projection(p) => p.exprs.iter_mut().for_each(|e| {
            e.replace_columns(replace);
        }),
        LogicalOp::Selection(s) => s.conditions.iter_mut().for_each(|e| {
            e.replace_columns(replace);
        }),
        LogicalOp::Aggregation(a) => {
            let args = a.agg_funcs.iter_mut().flat_map(|f| f.args.iter_mut());
            a.group_by.iter_mut().chain(args).for_each(|e| {
                e.replace_columns(replace);
            });
        }
        LogicalOp::Join(j) => {
            for (l, r) in &mut j.equal_conditions {
                replace_column(l, replace);
                replace_column(r, replace);
            }
            j.left_conditions
                .iter_mut()
                .chain(j.right_conditions.iter_mut())
                .chain(j.other_conditions.iter_mut())
                .for_each(|e| {
                    e.replace_columns(replace);
                });
        }
        LogicalOp::Apply(a) => {
            a.conditions.iter_mut().for_each(|e| {
                e.replace_columns(replace);
            });
            a.correlated_columns
                .iter_mut()
                .for_each(|c| replace_column(c, replace));
        }
        LogicalOp::Sort(s) => s.by_items.iter_mut().for_each(|b| {
            b.expr.replace_columns(replace);
        }),
    }
    replace_schema(op.schema_mut(), replace);
    if matches!(
        op,
        LogicalOp::Join(_) | LogicalOp::Apply(_) | LogicalOp::Selection(_) | LogicalOp::Sort(_) | LogicalOp::Limit(_)
    ) {
        op.rebuild_schema();
    }
}

fn eliminate(
    op: LogicalOp,
    replace: &mut HashMap<ColumnId, Column>,
    can_eliminate: bool,
    opt: &mut OptimizeOp<'_>,
    changed: &mut bool,
) -> StrataResult<LogicalOp> {
    let child_flag = match op {
        LogicalOp::Union(_) => false,
        LogicalOp::Aggregation(_) | LogicalOp::Projection(_) => true,
        _ => can_eliminate,
    };
    let mut op = op.map_children(|child| eliminate(child, replace, child_flag, opt, changed))?;
    replace_columns(&mut op, replace);

    let LogicalOp::Projection(mut proj) = op else {
        return Ok(op);
    };

    match *proj.input {
        LogicalOp::Projection(child) if child.exprs.iter().all(Expr::is_deterministic) => {
            proj.exprs = proj
                .exprs
                .iter()
                .map(|e| e.substitute(&child.base.schema, &child.exprs))
                .collect();
            proj.input = child.input;
            let (parent_id, child_id) = (proj.base.id, child.base.id);
            let exprs = &proj.exprs;
            opt.append_step(
                parent_id,
                "Projection",
                || format!("Proj[{parent_id}]'s child proj[{child_id}] is redundant"),
                || {
                    format!(
                        "Proj[{child_id}] is eliminated, Proj[{parent_id}]'s expressions changed into[{}]",
                        join_display(exprs, ",")
                    )
                },
            );
            *changed = true;
        }
        input => proj.input = Box::new(input),
    }

    if !(can_eliminate && proj.is_all_columns()) {
        return Ok(LogicalOp::Projection(proj));
    }
    for (column, expr) in proj.base.schema.columns.iter().zip(&proj.exprs) {
        if let Some(source) = expr.as_column() {
            replace.insert(column.id, source.clone());
        }
    }
    let id = proj.base.id;
    opt.append_step(
        id,
        "Projection",
        || format!("Proj[{id}]'s Exprs are all Columns"),
        || format!("Proj[{id}] is eliminated"),
    );
    *changed = true;
    Ok(*proj.input)
}
