//! Validation for logical plans.
//!
//! Structural checks (unique plan ids, schema arity) and scope checks
//! (every column an operator references resolves against its inputs).

use std::collections::HashSet;

use common_error::{StrataError, StrataResult};
use strata_core::{ColumnId, PlanId};

use crate::expr::Expr;
use crate::ops::LogicalOp;

/// Validate `plan`, reporting the first problem found.
pub fn validate_plan(plan: &LogicalOp) -> StrataResult<()> {
    let mut seen = HashSet::new();
    check_ids(plan, &mut seen)?;
    check_scope(plan, &HashSet::new())
}

fn check_ids(op: &LogicalOp, seen: &mut HashSet<PlanId>) -> StrataResult<()> {
    if !seen.insert(op.id()) {
        return Err(StrataError::plan(format!(
            "duplicate plan id {} at {}",
            op.id(),
            op.tp()
        )));
    }
    op.children().into_iter().try_for_each(|c| check_ids(c, seen))
}

fn check_refs<'e>(
    op: &LogicalOp,
    exprs: impl IntoIterator<Item = &'e Expr>,
    visible: &HashSet<ColumnId>,
) -> StrataResult<()> {
    for expr in exprs {
        if let Some(missing) = expr.columns().into_iter().find(|c| !visible.contains(&c.id)) {
            return Err(StrataError::column_not_found(format!(
                "{missing} referenced by {}_{} is not produced by its input",
                op.tp(),
                op.id()
            )));
        }
    }
    Ok(())
}

fn check_arity(op: &LogicalOp, expected: usize) -> StrataResult<()> {
    if op.schema().len() != expected {
        return Err(StrataError::plan(format!(
            "{}_{} outputs {} columns but computes {expected}",
            op.tp(),
            op.id(),
            op.schema().len()
        )));
    }
    Ok(())
}

/// `outer` holds correlated columns visible inside the inner side of an Apply.
fn check_scope(op: &LogicalOp, outer: &HashSet<ColumnId>) -> StrataResult<()> {
    let mut visible: HashSet<ColumnId> = outer.clone();
    for child in op.children() {
        visible.extend(child.schema().ids());
    }

    match op {
        LogicalOp::DataSource(_) => {}
        LogicalOp::Projection(p) => {
            check_arity(op, p.exprs.len())?;
            check_refs(op, &p.exprs, &visible)?;
        }
        LogicalOp::Selection(s) => check_refs(op, &s.conditions, &visible)?,
        LogicalOp::Aggregation(a) => {
            check_arity(op, a.agg_funcs.len())?;
            check_refs(op, &a.group_by, &visible)?;
            check_refs(op, a.agg_funcs.iter().flat_map(|f| &f.args), &visible)?;
        }
        LogicalOp::Join(j) => {
            let left = j.left.schema();
            let right = j.right.schema();
            if let Some((l, r)) = j
                .equal_conditions
                .iter()
                .find(|(l, r)| !left.contains(l.id) || !right.contains(r.id))
            {
                return Err(StrataError::column_not_found(format!(
                    "join_{} equality {l} = {r} does not match its inputs",
                    j.base.id
                )));
            }
            check_refs(op, &j.left_conditions, &visible)?;
            check_refs(op, &j.right_conditions, &visible)?;
            check_refs(op, &j.other_conditions, &visible)?;
        }
        LogicalOp::Apply(a) => {
            check_refs(op, &a.conditions, &visible)?;
            check_scope(&a.outer, outer)?;
            let mut inner_outer = outer.clone();
            inner_outer.extend(a.outer.schema().ids());
            return check_scope(&a.inner, &inner_outer);
        }
        LogicalOp::Union(u) => {
            if u.inputs.is_empty() {
                return Err(StrataError::plan(format!("union_{} has no inputs", u.base.id)));
            }
            if let Some(bad) = u.inputs.iter().find(|i| i.schema().len() != u.base.schema.len()) {
                return Err(StrataError::plan(format!(
                    "union_{} branch {}_{} outputs {} columns, expected {}",
                    u.base.id,
                    bad.tp(),
                    bad.id(),
                    bad.schema().len(),
                    u.base.schema.len()
                )));
            }
        }
        LogicalOp::Sort(s) => check_refs(op, s.by_items.iter().map(|b| &b.expr), &visible)?,
        LogicalOp::Limit(_) => {}
    }

    op.children()
        .into_iter()
        .try_for_each(|c| check_scope(c, outer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::PlanBuilder;
    use crate::expr::lit;
    use crate::ops::{Selection, TableInfo};
    use strata_core::{Column, DataType, IdAllocator};

    fn table() -> TableInfo {
        TableInfo::new("test.t").with_column("a", DataType::Int64, false)
    }

    #[test]
    fn test_valid_plan() {
        let mut ids = IdAllocator::new();
        let builder = PlanBuilder::scan(&mut ids, table());
        let a = builder.col("a").unwrap();
        let plan = builder.filter(vec![a.clone().gt(lit(0))]).project(vec![a]).build();
        assert!(validate_plan(&plan).is_ok());
    }

    #[test]
    fn test_dangling_column() {
        let mut ids = IdAllocator::new();
        let scan = PlanBuilder::scan(&mut ids, table()).build();
        let ghost = Expr::Column(Column::new(99, DataType::Int64));
        let plan = LogicalOp::Selection(Selection::new(5, vec![ghost], scan));

        let err = validate_plan(&plan).unwrap_err();
        assert!(matches!(err, StrataError::ColumnNotFound(_)));
        assert!(err.to_string().contains("Selection_5"));
    }

    #[test]
    fn test_duplicate_ids() {
        let mut ids = IdAllocator::new();
        let scan = PlanBuilder::scan(&mut ids, table()).build();
        let plan = LogicalOp::Selection(Selection::new(1, vec![], scan));
        assert!(matches!(
            validate_plan(&plan),
            Err(StrataError::PlanError(_))
        ));
    }
}
