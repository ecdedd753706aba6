//! Helpers shared by several rules.

use common_error::{StrataError, StrataResult};
use strata_core::DataType;
use strata_logical::expr::{builtin, lit, AggFuncDesc, AggFuncKind, AggMode, Expr};
use strata_logical::ops::{Aggregation, Projection};
use strata_logical::LogicalOp;

use crate::trace::OptimizeOp;

fn cast_to(expr: Expr, ret_type: &DataType) -> Expr {
    if expr.ret_type() == *ret_type {
        expr
    } else {
        Expr::function(builtin::CAST, vec![expr], ret_type.clone())
    }
}

/// The value `func` takes over a group holding exactly one row, as a scalar
/// expression over that row. `None` for functions without such a form.
pub(crate) fn single_row_value(func: &AggFuncDesc) -> Option<Expr> {
    let first = func.args.first().cloned();
    match (func.kind, func.mode) {
        (AggFuncKind::GroupConcat, _) => None,
        (_, AggMode::Final(AggFuncKind::Count)) => {
            let arg = first?;
            Some(if arg.nullable() {
                Expr::function(builtin::IF_NULL, vec![arg, lit(0)], DataType::Int64)
            } else {
                arg
            })
        }
        (AggFuncKind::Count, _) => {
            let nullable: Vec<Expr> = func
                .args
                .iter()
                .filter(|a| a.nullable())
                .map(|a| a.clone().is_null())
                .collect();
            Some(match Expr::disjunction(nullable) {
                None => lit(1),
                Some(cond) => Expr::if_then_else(cond, lit(0), lit(1), DataType::Int64),
            })
        }
        (AggFuncKind::Sum | AggFuncKind::Avg | AggFuncKind::Min | AggFuncKind::Max | AggFuncKind::FirstRow, _) => {
            Some(cast_to(first?, &func.ret_type))
        }
    }
}

/// Whether every function of `agg` has a single-row form.
pub(crate) fn can_convert_to_projection(agg: &Aggregation) -> bool {
    agg.agg_funcs.iter().all(|f| single_row_value(f).is_some())
}

/// Replace an aggregation whose groups hold one row each by a projection
/// with the same output columns.
pub(crate) fn convert_agg_to_projection(
    agg: Aggregation,
    opt: &mut OptimizeOp<'_>,
) -> StrataResult<LogicalOp> {
    let exprs = agg
        .agg_funcs
        .iter()
        .map(|f| {
            single_row_value(f).ok_or_else(|| {
                StrataError::plan(format!("{f} has no single-row form in agg[{}]", agg.base.id))
            })
        })
        .collect::<StrataResult<Vec<_>>>()?;
    let mut proj = Projection::new(opt.alloc_plan_id(), exprs, agg.base.schema, *agg.input);
    proj.base.max_one_row = agg.base.max_one_row;
    Ok(LogicalOp::Projection(proj))
}

/// Deep copy of `op` with fresh plan ids, assigned top-down. Column ids are kept.
pub(crate) fn clone_with_fresh_ids(op: &LogicalOp, opt: &mut OptimizeOp<'_>) -> LogicalOp {
    fn renumber(op: &mut LogicalOp, opt: &mut OptimizeOp<'_>) {
        op.base_mut().id = opt.alloc_plan_id();
        for child in op.children_mut() {
            renumber(child, opt);
        }
    }
    let mut copy = op.clone();
    renumber(&mut copy, opt);
    copy
}
