//! Union-all operator.

use serde::{Deserialize, Serialize};
use strata_core::{Column, IdAllocator, PlanId, Schema};

use super::{LogicalOp, PlanBase};

/// Union-all operator - concatenates its inputs positionally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Union {
    /// Node id, schema and key info.
    pub base: PlanBase,
    /// Input branches; each outputs the same number of columns as the union.
    pub inputs: Vec<LogicalOp>,
}

impl Union {
    /// Create a union with an explicit output schema.
    pub fn new(id: PlanId, schema: Schema, inputs: Vec<LogicalOp>) -> Self {
        Self {
            base: PlanBase::new(id, schema),
            inputs,
        }
    }

    /// Fresh output columns for `inputs`: types from the first branch,
    /// nullable if any branch is.
    pub fn output_schema(ids: &mut IdAllocator, inputs: &[LogicalOp]) -> Schema {
        let Some(first) = inputs.first() else {
            return Schema::default();
        };
        let columns = first
            .schema()
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let nullable = inputs
                    .iter()
                    .any(|input| input.schema().columns.get(i).map_or(true, |c| c.nullable));
                Column::new(ids.alloc_column_id(), c.data_type.clone()).with_nullable(nullable)
            })
            .collect();
        Schema::new(columns)
    }
}
