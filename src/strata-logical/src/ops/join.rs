//! Join and Apply operators.

use serde::{Deserialize, Serialize};
use strata_core::{Column, PlanId, Schema};

use super::{LogicalOp, PlanBase};
use crate::expr::Expr;

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinType {
    /// Inner join (a cross join when it has no conditions).
    Inner,
    /// Left outer join.
    LeftOuter,
    /// Right outer join.
    RightOuter,
    /// Left rows with at least one match.
    Semi,
    /// Left rows without a match.
    AntiSemi,
}

impl JoinType {
    /// Whether only the left columns are output.
    pub const fn is_semi(&self) -> bool {
        matches!(self, Self::Semi | Self::AntiSemi)
    }

    /// Display name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Inner => "inner join",
            Self::LeftOuter => "left outer join",
            Self::RightOuter => "right outer join",
            Self::Semi => "semi join",
            Self::AntiSemi => "anti semi join",
        }
    }
}

/// Output schema of a join of `left` and `right`.
///
/// Columns of a null-supplying side become nullable. Keys are not carried.
pub fn join_schema(join_type: JoinType, left: &Schema, right: &Schema) -> Schema {
    if join_type.is_semi() {
        return Schema::new(left.columns.clone());
    }
    let nullable = |cols: &[Column], force: bool| -> Vec<Column> {
        cols.iter()
            .map(|c| c.clone().with_nullable(c.nullable || force))
            .collect()
    };
    let mut columns = nullable(&left.columns, join_type == JoinType::RightOuter);
    columns.extend(nullable(&right.columns, join_type == JoinType::LeftOuter));
    Schema::new(columns)
}

/// Join operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    /// Node id, schema and key info.
    pub base: PlanBase,
    /// Join type.
    pub join_type: JoinType,
    /// Equality conditions as (left column, right column).
    pub equal_conditions: Vec<(Column, Column)>,
    /// Conditions referencing only the left side.
    pub left_conditions: Vec<Expr>,
    /// Conditions referencing only the right side.
    pub right_conditions: Vec<Expr>,
    /// Remaining conditions.
    pub other_conditions: Vec<Expr>,
    /// Left input.
    pub left: Box<LogicalOp>,
    /// Right input.
    pub right: Box<LogicalOp>,
}

impl Join {
    /// Create an unconditioned join of `left` and `right`.
    pub fn new(id: PlanId, join_type: JoinType, left: LogicalOp, right: LogicalOp) -> Self {
        let schema = join_schema(join_type, left.schema(), right.schema());
        Self {
            base: PlanBase::new(id, schema),
            join_type,
            equal_conditions: Vec::new(),
            left_conditions: Vec::new(),
            right_conditions: Vec::new(),
            other_conditions: Vec::new(),
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Set the equality conditions.
    #[must_use]
    pub fn with_equal_conditions(mut self, conditions: Vec<(Column, Column)>) -> Self {
        self.equal_conditions = conditions;
        self
    }

    /// Set the conditions that reference both sides.
    #[must_use]
    pub fn with_other_conditions(mut self, conditions: Vec<Expr>) -> Self {
        self.other_conditions = conditions;
        self
    }

    /// Whether the join has no condition at all.
    pub fn is_cartesian(&self) -> bool {
        self.equal_conditions.is_empty()
            && self.left_conditions.is_empty()
            && self.right_conditions.is_empty()
            && self.other_conditions.is_empty()
    }

    /// Every condition as an expression.
    pub fn conditions(&self) -> Vec<Expr> {
        let equal = self
            .equal_conditions
            .iter()
            .map(|(l, r)| Expr::Column(l.clone()).equal(Expr::Column(r.clone())));
        equal
            .chain(self.left_conditions.iter().cloned())
            .chain(self.right_conditions.iter().cloned())
            .chain(self.other_conditions.iter().cloned())
            .collect()
    }
}

/// Apply operator - a join whose inner side is re-evaluated per outer row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Apply {
    /// Node id, schema and key info.
    pub base: PlanBase,
    /// Join type.
    pub join_type: JoinType,
    /// Join conditions.
    pub conditions: Vec<Expr>,
    /// Outer columns referenced inside the inner side.
    pub correlated_columns: Vec<Column>,
    /// Outer input.
    pub outer: Box<LogicalOp>,
    /// Inner input.
    pub inner: Box<LogicalOp>,
}

impl Apply {
    /// Create an apply of `inner` for each row of `outer`.
    pub fn new(
        id: PlanId,
        join_type: JoinType,
        outer: LogicalOp,
        inner: LogicalOp,
        correlated_columns: Vec<Column>,
    ) -> Self {
        let schema = join_schema(join_type, outer.schema(), inner.schema());
        Self {
            base: PlanBase::new(id, schema),
            join_type,
            conditions: Vec::new(),
            correlated_columns,
            outer: Box::new(outer),
            inner: Box::new(inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::DataType;

    fn schema(ids: &[u64]) -> Schema {
        Schema::new(
            ids.iter()
                .map(|id| Column::new(*id, DataType::Int64).with_nullable(false))
                .collect(),
        )
    }

    #[test]
    fn test_join_schema_nullability() {
        let left = schema(&[1, 2]);
        let right = schema(&[3]);

        let inner = join_schema(JoinType::Inner, &left, &right);
        assert_eq!(inner.ids(), vec![1, 2, 3]);
        assert!(inner.columns.iter().all(|c| !c.nullable));

        let left_outer = join_schema(JoinType::LeftOuter, &left, &right);
        assert!(!left_outer.columns[0].nullable);
        assert!(left_outer.columns[2].nullable);

        let semi = join_schema(JoinType::Semi, &left, &right);
        assert_eq!(semi.ids(), vec![1, 2]);
    }
}
