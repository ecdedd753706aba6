//! Projection operator.

use serde::{Deserialize, Serialize};
use strata_core::{Column, IdAllocator, PlanId, Schema};

use super::{LogicalOp, PlanBase};
use crate::expr::Expr;

/// Projection operator - computes one output column per expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    /// Node id, schema and key info.
    pub base: PlanBase,
    /// Output expressions, parallel to the schema columns.
    pub exprs: Vec<Expr>,
    /// Input operator.
    pub input: Box<LogicalOp>,
}

impl Projection {
    /// Create a projection with an explicit output schema.
    pub fn new(id: PlanId, exprs: Vec<Expr>, schema: Schema, input: LogicalOp) -> Self {
        Self {
            base: PlanBase::new(id, schema),
            exprs,
            input: Box::new(input),
        }
    }

    /// A fresh output column for `expr`; bare columns keep their display name.
    pub fn output_column(ids: &mut IdAllocator, expr: &Expr) -> Column {
        let mut column = Column::new(ids.alloc_column_id(), expr.ret_type())
            .with_nullable(expr.nullable());
        if let Some(source) = expr.as_column() {
            column.name = source.name.clone();
            column.qualifier = source.qualifier.clone();
        }
        column
    }

    /// Whether every expression is a bare column reference.
    pub fn is_all_columns(&self) -> bool {
        self.exprs.iter().all(|e| e.as_column().is_some())
    }
}
