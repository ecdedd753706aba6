//! Whole-tree utilities on logical plans.

use common_display::DisplayTree;
use common_error::StrataResult;
use strata_core::PlanId;

use crate::ops::LogicalOp;

impl LogicalOp {
    /// Render the tree, one operator per line.
    ///
    /// ```text
    /// Projection_3 (exprs:[test.t.a])
    /// └─ DataSource_1 (table:test.t, columns:[test.t.a,test.t.b])
    /// ```
    pub fn explain(&self) -> String {
        DisplayTree::new(self).to_string()
    }

    /// Count the number of operators in the plan.
    pub fn operator_count(&self) -> usize {
        1 + self
            .children()
            .iter()
            .map(|c| c.operator_count())
            .sum::<usize>()
    }

    /// Get the maximum depth of the plan tree.
    pub fn depth(&self) -> usize {
        1 + self
            .children()
            .iter()
            .map(|c| c.depth())
            .max()
            .unwrap_or(0)
    }

    /// Check if any operator in the plan satisfies `predicate`.
    pub fn contains_op<F>(&self, predicate: F) -> bool
    where
        F: Fn(&LogicalOp) -> bool,
    {
        fn check<F>(op: &LogicalOp, predicate: &F) -> bool
        where
            F: Fn(&LogicalOp) -> bool,
        {
            predicate(op) || op.children().iter().any(|c| check(c, predicate))
        }
        check(self, &predicate)
    }

    /// Find the operator with plan id `id`.
    pub fn find(&self, id: PlanId) -> Option<&LogicalOp> {
        if self.id() == id {
            return Some(self);
        }
        self.children().into_iter().find_map(|c| c.find(id))
    }

    /// Plan ids in pre-order.
    pub fn plan_ids(&self) -> Vec<PlanId> {
        let mut out = vec![self.id()];
        for child in self.children() {
            out.extend(child.plan_ids());
        }
        out
    }

    /// Apply a fallible function to each operator, children first.
    pub fn transform_up<F>(self, f: &mut F) -> StrataResult<Self>
    where
        F: FnMut(LogicalOp) -> StrataResult<LogicalOp>,
    {
        let op = self.map_children(|child| child.transform_up(f))?;
        f(op)
    }
}

impl std::fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", DisplayTree::new(self))
    }
}
