//! Aggregate function descriptors.

use serde::{Deserialize, Serialize};
use strata_core::DataType;

use super::Expr;

/// Aggregate function kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggFuncKind {
    /// Count non-null argument rows.
    Count,
    /// Sum of values.
    Sum,
    /// Average value.
    Avg,
    /// Minimum value.
    Min,
    /// Maximum value.
    Max,
    /// Any value of the group; used for grouping columns carried through.
    FirstRow,
    /// Concatenation of the group's values.
    GroupConcat,
}

impl AggFuncKind {
    /// Get the function name for display.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
            Self::FirstRow => "firstrow",
            Self::GroupConcat => "group_concat",
        }
    }

    /// Result type given the first argument's type.
    pub fn result_type(&self, input: &DataType) -> DataType {
        match self {
            Self::Count => DataType::Int64,
            Self::Sum => match input {
                DataType::Int64 | DataType::Bool => DataType::Int64,
                _ => DataType::Float64,
            },
            Self::Avg => DataType::Float64,
            Self::Min | Self::Max | Self::FirstRow => input.clone(),
            Self::GroupConcat => DataType::String,
        }
    }

    /// The function that merges partial results of this one.
    pub const fn merge_kind(&self) -> Self {
        match self {
            Self::Count => Self::Sum,
            other => *other,
        }
    }
}

impl std::fmt::Display for AggFuncKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Whether an aggregate sees raw rows or partial results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggMode {
    /// Aggregates raw input rows.
    #[default]
    Complete,
    /// Merges partial results of the given kind produced by a pushed-down aggregation.
    Final(AggFuncKind),
}

/// An aggregate function call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggFuncDesc {
    /// The aggregate function.
    pub kind: AggFuncKind,
    /// Arguments.
    pub args: Vec<Expr>,
    /// Whether DISTINCT is applied.
    pub has_distinct: bool,
    /// Complete or final (merging) mode.
    pub mode: AggMode,
    /// Result type.
    pub ret_type: DataType,
}

impl AggFuncDesc {
    /// Create a complete-mode aggregate over `args`.
    pub fn new(kind: AggFuncKind, args: Vec<Expr>) -> Self {
        let input = args.first().map_or(DataType::Null, Expr::ret_type);
        Self {
            kind,
            ret_type: kind.result_type(&input),
            args,
            has_distinct: false,
            mode: AggMode::Complete,
        }
    }

    /// Set DISTINCT flag.
    #[must_use]
    pub fn with_distinct(mut self, distinct: bool) -> Self {
        self.has_distinct = distinct;
        self
    }

    /// Whether the result can be NULL.
    pub fn nullable(&self) -> bool {
        !matches!(
            (self.kind, self.mode),
            (AggFuncKind::Count, _) | (_, AggMode::Final(AggFuncKind::Count))
        )
    }

    fn is_splittable(&self) -> bool {
        self.mode == AggMode::Complete
            && !self.has_distinct
            && matches!(
                self.kind,
                AggFuncKind::Count
                    | AggFuncKind::Sum
                    | AggFuncKind::Min
                    | AggFuncKind::Max
                    | AggFuncKind::FirstRow
            )
    }

    /// Whether a partial copy can be evaluated below a join and merged above it.
    pub fn is_decomposable_with_join(&self) -> bool {
        self.is_splittable()
    }

    /// Whether a partial copy can be evaluated under every union branch and merged above it.
    pub fn is_decomposable_with_union(&self) -> bool {
        self.is_splittable()
    }

    /// Whether evaluating the arguments is observable.
    pub fn has_side_effects(&self) -> bool {
        self.args.iter().any(Expr::has_side_effects)
    }

    /// Turn this function into the merge of a partial result stored in `partial`.
    pub fn into_final(mut self, partial: Expr) -> Self {
        let partial_kind = self.kind;
        self.kind = partial_kind.merge_kind();
        self.args = vec![partial];
        self.mode = AggMode::Final(partial_kind);
        self
    }
}

impl std::fmt::Display for AggFuncDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let args: Vec<String> = self.args.iter().map(ToString::to_string).collect();
        let distinct = if self.has_distinct { "distinct " } else { "" };
        write!(f, "{}({distinct}{})", self.kind, args.join(", "))
    }
}
