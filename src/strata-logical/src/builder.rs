//! Fluent construction of logical plans.
//!
//! The builder draws plan and column ids from a caller-owned
//! [`IdAllocator`], in the order operators are added.

use strata_core::{Column, IdAllocator, Schema};

use crate::expr::{AggFuncDesc, Expr};
use crate::ops::{
    Aggregation, Apply, ByItem, DataSource, Join, JoinType, Limit, LogicalOp, Projection,
    Selection, Sort, TableInfo, Union,
};

/// Builder for constructing logical plans fluently.
#[derive(Debug)]
pub struct PlanBuilder<'a> {
    ids: &'a mut IdAllocator,
    plan: LogicalOp,
}

impl<'a> PlanBuilder<'a> {
    /// Start building from a table read.
    pub fn scan(ids: &'a mut IdAllocator, table: TableInfo) -> Self {
        let plan = LogicalOp::DataSource(DataSource::new(ids, table));
        Self { ids, plan }
    }

    /// Continue building on top of an existing plan.
    pub fn from_plan(ids: &'a mut IdAllocator, plan: LogicalOp) -> Self {
        Self { ids, plan }
    }

    /// Output schema of the plan built so far.
    pub fn schema(&self) -> &Schema {
        self.plan.schema()
    }

    /// Reference an output column by name (`a`) or qualified name (`test.t.a`).
    pub fn col(&self, name: &str) -> Option<Expr> {
        self.schema()
            .columns
            .iter()
            .find(|c| c.name.as_deref() == Some(name) || c.to_string() == name)
            .map(|c| Expr::Column(c.clone()))
    }

    /// Reference the `i`-th output column.
    pub fn col_at(&self, i: usize) -> Option<Expr> {
        self.schema().columns.get(i).map(|c| Expr::Column(c.clone()))
    }

    fn wrap(self, f: impl FnOnce(&mut IdAllocator, LogicalOp) -> LogicalOp) -> Self {
        let Self { ids, plan } = self;
        let plan = f(ids, plan);
        Self { ids, plan }
    }

    /// Add a projection; each expression gets a fresh output column.
    pub fn project(self, exprs: Vec<Expr>) -> Self {
        self.wrap(|ids, input| {
            let id = ids.alloc_plan_id();
            let columns = exprs
                .iter()
                .map(|e| Projection::output_column(ids, e))
                .collect();
            LogicalOp::Projection(Projection::new(id, exprs, Schema::new(columns), input))
        })
    }

    /// Add a selection.
    pub fn filter(self, conditions: Vec<Expr>) -> Self {
        self.wrap(|ids, input| {
            LogicalOp::Selection(Selection::new(ids.alloc_plan_id(), conditions, input))
        })
    }

    /// Add an aggregation; each function gets a fresh output column.
    pub fn aggregate(self, group_by: Vec<Expr>, agg_funcs: Vec<AggFuncDesc>) -> Self {
        self.wrap(|ids, input| {
            let id = ids.alloc_plan_id();
            let columns = agg_funcs
                .iter()
                .map(|f| Aggregation::output_column(ids, f))
                .collect();
            LogicalOp::Aggregation(Aggregation::new(
                id,
                group_by,
                agg_funcs,
                Schema::new(columns),
                input,
            ))
        })
    }

    /// Join with `right` on column equalities.
    pub fn join(
        self,
        right: LogicalOp,
        join_type: JoinType,
        equal_conditions: Vec<(Column, Column)>,
    ) -> Self {
        self.wrap(|ids, left| {
            let join = Join::new(ids.alloc_plan_id(), join_type, left, right)
                .with_equal_conditions(equal_conditions);
            LogicalOp::Join(join)
        })
    }

    /// Join with `right` on arbitrary conditions.
    pub fn join_on(self, right: LogicalOp, join_type: JoinType, conditions: Vec<Expr>) -> Self {
        self.wrap(|ids, left| {
            let join = Join::new(ids.alloc_plan_id(), join_type, left, right)
                .with_other_conditions(conditions);
            LogicalOp::Join(join)
        })
    }

    /// Inner join with `right` and no condition.
    pub fn cross_join(self, right: LogicalOp) -> Self {
        self.join(right, JoinType::Inner, Vec::new())
    }

    /// Correlated join with `inner`, which references `correlated` outer columns.
    pub fn apply(self, inner: LogicalOp, join_type: JoinType, correlated: Vec<Column>) -> Self {
        self.wrap(|ids, outer| {
            LogicalOp::Apply(Apply::new(
                ids.alloc_plan_id(),
                join_type,
                outer,
                inner,
                correlated,
            ))
        })
    }

    /// Union-all with `others`; the output gets fresh columns.
    pub fn union_all(self, others: Vec<LogicalOp>) -> Self {
        self.wrap(|ids, first| {
            let id = ids.alloc_plan_id();
            let mut inputs = vec![first];
            inputs.extend(others);
            let schema = Union::output_schema(ids, &inputs);
            LogicalOp::Union(Union::new(id, schema, inputs))
        })
    }

    /// Add a sort.
    pub fn sort(self, by_items: Vec<ByItem>) -> Self {
        self.wrap(|ids, input| LogicalOp::Sort(Sort::new(ids.alloc_plan_id(), by_items, input)))
    }

    /// Add a limit.
    pub fn limit(self, offset: u64, count: u64) -> Self {
        self.wrap(|ids, input| {
            LogicalOp::Limit(Limit::new(ids.alloc_plan_id(), offset, count, input))
        })
    }

    /// Build the final plan.
    pub fn build(self) -> LogicalOp {
        self.plan
    }
}
