//! Logical operators for query plans.
//!
//! Every node carries a [`PlanBase`]: its plan id, its output schema (with
//! unique keys) and the single-row flag. Nodes own their inputs.

mod aggregate;
mod filter;
mod join;
mod limit;
mod project;
mod scan;
mod sort;
mod union;

pub use aggregate::Aggregation;
pub use filter::Selection;
pub use join::{join_schema, Apply, Join, JoinType};
pub use limit::Limit;
pub use project::Projection;
pub use scan::{DataSource, TableInfo};
pub use sort::{ByItem, Sort};
pub use union::Union;

use common_display::{join_display, TreeNode};
use common_error::StrataResult;
use serde::{Deserialize, Serialize};
use strata_core::{PlanId, Schema};

/// State shared by every operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanBase {
    /// Unique id of the node within its plan.
    pub id: PlanId,
    /// Output columns and unique keys.
    pub schema: Schema,
    /// Whether the node is known to produce at most one row.
    pub max_one_row: bool,
}

impl PlanBase {
    /// Create a base with no single-row guarantee.
    pub fn new(id: PlanId, schema: Schema) -> Self {
        Self {
            id,
            schema,
            max_one_row: false,
        }
    }
}

/// Logical operator in a query plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogicalOp {
    /// Read a table.
    DataSource(DataSource),
    /// Compute expressions.
    Projection(Projection),
    /// Filter rows.
    Selection(Selection),
    /// Group and aggregate.
    Aggregation(Aggregation),
    /// Join two inputs.
    Join(Join),
    /// Correlated join.
    Apply(Apply),
    /// Concatenate inputs.
    Union(Union),
    /// Order rows.
    Sort(Sort),
    /// Bound the row count.
    Limit(Limit),
}

impl LogicalOp {
    /// Shared node state.
    pub fn base(&self) -> &PlanBase {
        match self {
            Self::DataSource(op) => &op.base,
            Self::Projection(op) => &op.base,
            Self::Selection(op) => &op.base,
            Self::Aggregation(op) => &op.base,
            Self::Join(op) => &op.base,
            Self::Apply(op) => &op.base,
            Self::Union(op) => &op.base,
            Self::Sort(op) => &op.base,
            Self::Limit(op) => &op.base,
        }
    }

    /// Mutable shared node state.
    pub fn base_mut(&mut self) -> &mut PlanBase {
        match self {
            Self::DataSource(op) => &mut op.base,
            Self::Projection(op) => &mut op.base,
            Self::Selection(op) => &mut op.base,
            Self::Aggregation(op) => &mut op.base,
            Self::Join(op) => &mut op.base,
            Self::Apply(op) => &mut op.base,
            Self::Union(op) => &mut op.base,
            Self::Sort(op) => &mut op.base,
            Self::Limit(op) => &mut op.base,
        }
    }

    /// Node id.
    pub fn id(&self) -> PlanId {
        self.base().id
    }

    /// Output schema.
    pub fn schema(&self) -> &Schema {
        &self.base().schema
    }

    /// Mutable output schema.
    pub fn schema_mut(&mut self) -> &mut Schema {
        &mut self.base_mut().schema
    }

    /// Whether the node produces at most one row.
    pub fn max_one_row(&self) -> bool {
        self.base().max_one_row
    }

    /// Operator type name.
    pub fn tp(&self) -> &'static str {
        match self {
            Self::DataSource(_) => "DataSource",
            Self::Projection(_) => "Projection",
            Self::Selection(_) => "Selection",
            Self::Aggregation(_) => "Aggregation",
            Self::Join(_) => "Join",
            Self::Apply(_) => "Apply",
            Self::Union(_) => "Union",
            Self::Sort(_) => "Sort",
            Self::Limit(_) => "Limit",
        }
    }

    /// Short name used in trace messages, e.g. `agg[6]`.
    pub fn trace_name(&self) -> &'static str {
        match self {
            Self::DataSource(_) => "ds",
            Self::Projection(_) => "proj",
            Self::Selection(_) => "selection",
            Self::Aggregation(_) => "agg",
            Self::Join(_) => "join",
            Self::Apply(_) => "apply",
            Self::Union(_) => "union",
            Self::Sort(_) => "sort",
            Self::Limit(_) => "limit",
        }
    }

    /// Inputs, left to right.
    pub fn children(&self) -> Vec<&LogicalOp> {
        match self {
            Self::DataSource(_) => vec![],
            Self::Projection(op) => vec![&op.input],
            Self::Selection(op) => vec![&op.input],
            Self::Aggregation(op) => vec![&op.input],
            Self::Join(op) => vec![&op.left, &op.right],
            Self::Apply(op) => vec![&op.outer, &op.inner],
            Self::Union(op) => op.inputs.iter().collect(),
            Self::Sort(op) => vec![&op.input],
            Self::Limit(op) => vec![&op.input],
        }
    }

    /// Mutable inputs, left to right.
    pub fn children_mut(&mut self) -> Vec<&mut LogicalOp> {
        match self {
            Self::DataSource(_) => vec![],
            Self::Projection(op) => vec![&mut op.input],
            Self::Selection(op) => vec![&mut op.input],
            Self::Aggregation(op) => vec![&mut op.input],
            Self::Join(op) => vec![&mut op.left, &mut op.right],
            Self::Apply(op) => vec![&mut op.outer, &mut op.inner],
            Self::Union(op) => op.inputs.iter_mut().collect(),
            Self::Sort(op) => vec![&mut op.input],
            Self::Limit(op) => vec![&mut op.input],
        }
    }

    /// Replace each input with `f(input)`, left to right.
    ///
    /// The node's own schema is left untouched; see [`Self::rebuild_schema`].
    pub fn map_children<F>(self, mut f: F) -> StrataResult<Self>
    where
        F: FnMut(LogicalOp) -> StrataResult<LogicalOp>,
    {
        let mut apply = |input: Box<LogicalOp>| -> StrataResult<Box<LogicalOp>> {
            Ok(Box::new(f(*input)?))
        };
        Ok(match self {
            Self::DataSource(op) => Self::DataSource(op),
            Self::Projection(mut op) => {
                op.input = apply(op.input)?;
                Self::Projection(op)
            }
            Self::Selection(mut op) => {
                op.input = apply(op.input)?;
                Self::Selection(op)
            }
            Self::Aggregation(mut op) => {
                op.input = apply(op.input)?;
                Self::Aggregation(op)
            }
            Self::Join(mut op) => {
                op.left = apply(op.left)?;
                op.right = apply(op.right)?;
                Self::Join(op)
            }
            Self::Apply(mut op) => {
                op.outer = apply(op.outer)?;
                op.inner = apply(op.inner)?;
                Self::Apply(op)
            }
            Self::Union(mut op) => {
                op.inputs = op
                    .inputs
                    .into_iter()
                    .map(|input| apply(Box::new(input)).map(|b| *b))
                    .collect::<StrataResult<_>>()?;
                Self::Union(op)
            }
            Self::Sort(mut op) => {
                op.input = apply(op.input)?;
                Self::Sort(op)
            }
            Self::Limit(mut op) => {
                op.input = apply(op.input)?;
                Self::Limit(op)
            }
        })
    }

    /// Re-derive the schema of nodes whose columns follow their inputs.
    ///
    /// Selection, Sort and Limit take their input's schema; Join and Apply
    /// re-concatenate their inputs. Keys referencing vanished columns are
    /// dropped everywhere.
    pub fn rebuild_schema(&mut self) {
        match self {
            Self::Selection(op) => op.base.schema = op.input.schema().clone(),
            Self::Sort(op) => op.base.schema = op.input.schema().clone(),
            Self::Limit(op) => op.base.schema = op.input.schema().clone(),
            Self::Join(op) => {
                let keys = std::mem::take(&mut op.base.schema.keys);
                op.base.schema = join_schema(op.join_type, op.left.schema(), op.right.schema());
                op.base.schema.keys = keys;
                op.base.schema.retain_valid_keys();
            }
            Self::Apply(op) => {
                let keys = std::mem::take(&mut op.base.schema.keys);
                op.base.schema = join_schema(op.join_type, op.outer.schema(), op.inner.schema());
                op.base.schema.keys = keys;
                op.base.schema.retain_valid_keys();
            }
            _ => self.schema_mut().retain_valid_keys(),
        }
    }

    fn explain_details(&self) -> String {
        match self {
            Self::DataSource(op) => {
                format!("table:{}, columns:{}", op.table.name, op.base.schema)
            }
            Self::Projection(op) => format!("exprs:[{}]", join_display(&op.exprs, ", ")),
            Self::Selection(op) => format!("conditions:[{}]", join_display(&op.conditions, ", ")),
            Self::Aggregation(op) => format!(
                "group by:[{}], funcs:[{}]",
                join_display(&op.group_by, ", "),
                join_display(&op.agg_funcs, ", ")
            ),
            Self::Join(op) => {
                let mut out = op.join_type.name().to_string();
                if !op.is_cartesian() {
                    out.push_str(&format!(", conditions:[{}]", join_display(&op.conditions(), ", ")));
                }
                out
            }
            Self::Apply(op) => format!(
                "{}, correlated:[{}]",
                op.join_type.name(),
                join_display(&op.correlated_columns, ", ")
            ),
            Self::Union(op) => format!("columns:{}", op.base.schema),
            Self::Sort(op) => format!("by:[{}]", join_display(&op.by_items, ", ")),
            Self::Limit(op) => format!("offset:{}, count:{}", op.offset, op.count),
        }
    }
}

impl TreeNode for LogicalOp {
    fn label(&self) -> String {
        format!("{}_{}", self.tp(), self.id())
    }

    fn children(&self) -> Vec<&dyn TreeNode> {
        LogicalOp::children(self)
            .into_iter()
            .map(|c| c as &dyn TreeNode)
            .collect()
    }

    fn details(&self) -> Option<String> {
        Some(self.explain_details())
    }
}
