//! Aggregation operator.

use serde::{Deserialize, Serialize};
use strata_core::{Column, IdAllocator, PlanId, Schema};

use super::{LogicalOp, PlanBase};
use crate::expr::{AggFuncDesc, Expr};

/// Aggregation operator - grouping and aggregation.
///
/// Outputs one column per aggregate function; grouping columns are only
/// visible above through `firstrow` functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    /// Node id, schema and key info.
    pub base: PlanBase,
    /// Grouping expressions.
    pub group_by: Vec<Expr>,
    /// Aggregate functions, parallel to the schema columns.
    pub agg_funcs: Vec<AggFuncDesc>,
    /// Input operator.
    pub input: Box<LogicalOp>,
}

impl Aggregation {
    /// Create an aggregation with an explicit output schema.
    pub fn new(
        id: PlanId,
        group_by: Vec<Expr>,
        agg_funcs: Vec<AggFuncDesc>,
        schema: Schema,
        input: LogicalOp,
    ) -> Self {
        Self {
            base: PlanBase::new(id, schema),
            group_by,
            agg_funcs,
            input: Box::new(input),
        }
    }

    /// A fresh output column for `func`.
    pub fn output_column(ids: &mut IdAllocator, func: &AggFuncDesc) -> Column {
        Column::new(ids.alloc_column_id(), func.ret_type.clone()).with_nullable(func.nullable())
    }

    /// Group-by items that are bare columns.
    pub fn group_by_columns(&self) -> Vec<Column> {
        self.group_by
            .iter()
            .filter_map(|e| e.as_column().cloned())
            .collect()
    }

    /// Columns referenced by the functions and grouping items.
    pub fn used_columns(&self) -> Vec<Column> {
        let mut out = Vec::new();
        for func in &self.agg_funcs {
            func.args.iter().for_each(|a| a.collect_columns(&mut out));
        }
        self.group_by.iter().for_each(|g| g.collect_columns(&mut out));
        out
    }
}
