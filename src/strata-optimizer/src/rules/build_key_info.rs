//! Build key info rule.
//!
//! Recomputes, bottom-up, every node's unique keys and whether it yields at
//! most one row. Keys start at the table's primary key and NOT NULL unique
//! indexes and are carried upward through the operators that preserve them.

use std::collections::HashSet;

use common_error::StrataResult;
use strata_core::{Column, ColumnId, KeyInfo, Schema};
use strata_logical::expr::{builtin, AggFuncKind, AggMode, Expr};
use strata_logical::ops::JoinType;
use strata_logical::LogicalOp;

use super::rule::{OptimizationRule, Transformed};
use crate::trace::OptimizeOp;

/// Build key info rule.
pub struct BuildKeyInfo;

impl OptimizationRule for BuildKeyInfo {
    fn name(&self) -> &'static str {
        "build_keys"
    }

    fn description(&self) -> &'static str {
        "Derive unique keys and single-row facts for every node"
    }

    fn optimize(&self, plan: LogicalOp, _opt: &mut OptimizeOp<'_>) -> StrataResult<Transformed> {
        let (plan, changed) = refresh_keys(plan)?;
        Ok(Transformed::new(plan, changed))
    }
}

/// Recompute key info for `op` and everything below it. Returns whether
/// anything differed from what the nodes carried.
pub(crate) fn refresh_keys(op: LogicalOp) -> StrataResult<(LogicalOp, bool)> {
    let mut changed = false;
    let op = build_keys(op, &mut changed)?;
    Ok((op, changed))
}

fn build_keys(op: LogicalOp, changed: &mut bool) -> StrataResult<LogicalOp> {
    let mut op = op.map_children(|child| build_keys(child, changed))?;
    let (keys, max_one_row) = derive_keys(&op);
    let base = op.base_mut();
    if base.schema.keys != keys || base.max_one_row != max_one_row {
        base.schema.keys = keys;
        base.max_one_row = max_one_row;
        *changed = true;
    }
    Ok(op)
}

/// Output columns of `schema` with the given ids, if all are present.
fn key_from_ids(schema: &Schema, ids: impl IntoIterator<Item = ColumnId>) -> Option<KeyInfo> {
    ids.into_iter()
        .map(|id| schema.column(id).cloned())
        .collect::<Option<Vec<Column>>>()
        .map(KeyInfo::new)
}

fn push_key(keys: &mut Vec<KeyInfo>, key: KeyInfo) {
    if !key.columns().is_empty() && !keys.contains(&key) {
        keys.push(key);
    }
}

/// Columns compared for equality with a constant in `conditions`.
fn constant_equal_columns(conditions: &[Expr]) -> HashSet<ColumnId> {
    let mut out = HashSet::new();
    for cond in conditions {
        if let Expr::Function(f) = cond {
            if f.name == builtin::EQ && f.args.len() == 2 {
                match (&f.args[0], &f.args[1]) {
                    (Expr::Column(c), other) | (other, Expr::Column(c)) if other.is_constant() => {
                        out.insert(c.id);
                    }
                    _ => {}
                }
            }
        }
    }
    out
}

/// Keys of a child that survive into `schema` unchanged (same column ids).
fn forward_keys(child: &LogicalOp, schema: &Schema) -> Vec<KeyInfo> {
    let mut keys = Vec::new();
    for key in &child.schema().keys {
        if let Some(key) = key_from_ids(schema, key.ids()) {
            push_key(&mut keys, key);
        }
    }
    keys
}

fn derive_keys(op: &LogicalOp) -> (Vec<KeyInfo>, bool) {
    match op {
        LogicalOp::DataSource(ds) => {
            let mut keys = Vec::new();
            for names in ds.table.candidate_keys() {
                let columns: Option<Vec<Column>> = names
                    .iter()
                    .map(|name| ds.column_by_name(name).filter(|c| !c.nullable).cloned())
                    .collect();
                if let Some(columns) = columns {
                    push_key(&mut keys, KeyInfo::new(columns));
                }
            }
            (keys, false)
        }
        LogicalOp::Projection(proj) => {
            let mut keys = Vec::new();
            for key in &proj.input.schema().keys {
                let mapped: Option<Vec<Column>> = key
                    .ids()
                    .map(|id| {
                        proj.exprs
                            .iter()
                            .position(|e| e.as_column().map(|c| c.id) == Some(id))
                            .map(|i| proj.base.schema.columns[i].clone())
                    })
                    .collect();
                if let Some(columns) = mapped {
                    push_key(&mut keys, KeyInfo::new(columns));
                }
            }
            (keys, proj.input.max_one_row())
        }
        LogicalOp::Selection(sel) => {
            let keys = forward_keys(&sel.input, &sel.base.schema);
            let fixed = constant_equal_columns(&sel.conditions);
            let max_one_row = sel.input.max_one_row()
                || sel.input.schema().key_covered_by(&fixed).is_some();
            (keys, max_one_row)
        }
        LogicalOp::Aggregation(agg) => {
            // Output column carrying `firstrow(id)` for a child column id.
            let first_row_output = |id: ColumnId| -> Option<Column> {
                agg.agg_funcs
                    .iter()
                    .zip(&agg.base.schema.columns)
                    .find(|(f, _)| {
                        f.kind == AggFuncKind::FirstRow
                            && f.mode == AggMode::Complete
                            && f.args.first().and_then(Expr::as_column).map(|c| c.id) == Some(id)
                    })
                    .map(|(_, c)| c.clone())
            };
            let mut keys = Vec::new();
            for key in &agg.input.schema().keys {
                if let Some(columns) = key.ids().map(first_row_output).collect::<Option<Vec<_>>>() {
                    push_key(&mut keys, KeyInfo::new(columns));
                }
            }
            let group_cols: Option<Vec<ColumnId>> = agg
                .group_by
                .iter()
                .map(|g| g.as_column().map(|c| c.id))
                .collect();
            if let Some(group_cols) = group_cols.filter(|g| !g.is_empty()) {
                let mapped: Option<Vec<Column>> =
                    group_cols.into_iter().map(first_row_output).collect();
                if let Some(columns) = mapped {
                    push_key(&mut keys, KeyInfo::new(columns));
                }
            }
            let max_one_row = agg.group_by.is_empty() || agg.input.max_one_row();
            (keys, max_one_row)
        }
        LogicalOp::Join(join) => {
            let schema = &join.base.schema;
            if join.join_type.is_semi() {
                return (forward_keys(&join.left, schema), join.left.max_one_row());
            }
            let left_eq: HashSet<ColumnId> = join.equal_conditions.iter().map(|(l, _)| l.id).collect();
            let right_eq: HashSet<ColumnId> = join.equal_conditions.iter().map(|(_, r)| r.id).collect();
            let mut keys = Vec::new();
            // Each left row meets at most one right row when the right side is
            // joined on one of its keys, and the other way round.
            if join.join_type != JoinType::RightOuter
                && join.right.schema().key_covered_by(&right_eq).is_some()
            {
                keys.extend(forward_keys(&join.left, schema));
            }
            if join.join_type != JoinType::LeftOuter
                && join.left.schema().key_covered_by(&left_eq).is_some()
            {
                for key in forward_keys(&join.right, schema) {
                    push_key(&mut keys, key);
                }
            }
            let max_one_row = join.left.max_one_row() && join.right.max_one_row();
            (keys, max_one_row)
        }
        LogicalOp::Apply(apply) => {
            if apply.join_type.is_semi() {
                (forward_keys(&apply.outer, &apply.base.schema), apply.outer.max_one_row())
            } else {
                (Vec::new(), apply.outer.max_one_row() && apply.inner.max_one_row())
            }
        }
        LogicalOp::Union(_) => (Vec::new(), false),
        LogicalOp::Sort(sort) => (
            forward_keys(&sort.input, &sort.base.schema),
            sort.input.max_one_row(),
        ),
        LogicalOp::Limit(limit) => (
            forward_keys(&limit.input, &limit.base.schema),
            limit.count <= 1 || limit.input.max_one_row(),
        ),
    }
}
