//! Scalar expressions over plan columns.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use strata_core::{Column, ColumnId, DataType, Schema, Value};

use super::builtin::{self, Volatility};

/// A call to a scalar builtin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarFunction {
    /// Lower-case builtin name (see [`builtin`]).
    pub name: String,
    /// Arguments.
    pub args: Vec<Expr>,
    /// Result type.
    pub ret_type: DataType,
}

/// A scalar expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// A column reference, resolved by id.
    Column(Column),
    /// A literal constant value.
    Literal(Value),
    /// A scalar function call.
    Function(ScalarFunction),
}

/// Create a column reference.
pub fn col(column: &Column) -> Expr {
    Expr::Column(column.clone())
}

/// Create a literal expression.
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Literal(value.into())
}

impl Expr {
    /// Create a function call with an explicit result type.
    pub fn function(name: impl Into<String>, args: Vec<Self>, ret_type: DataType) -> Self {
        Self::Function(ScalarFunction {
            name: name.into().to_ascii_lowercase(),
            args,
            ret_type,
        })
    }

    fn arithmetic(name: &str, left: Self, right: Self) -> Self {
        let ret_type = left
            .ret_type()
            .common_supertype(&right.ret_type())
            .unwrap_or(DataType::Float64);
        Self::function(name, vec![left, right], ret_type)
    }

    /// `self + other`.
    #[must_use]
    pub fn plus(self, other: Self) -> Self {
        Self::arithmetic(builtin::PLUS, self, other)
    }

    /// `self - other`.
    #[must_use]
    pub fn minus(self, other: Self) -> Self {
        Self::arithmetic(builtin::MINUS, self, other)
    }

    /// `self = other`.
    #[must_use]
    pub fn equal(self, other: Self) -> Self {
        Self::function(builtin::EQ, vec![self, other], DataType::Bool)
    }

    /// `self > other`.
    #[must_use]
    pub fn gt(self, other: Self) -> Self {
        Self::function(builtin::GT, vec![self, other], DataType::Bool)
    }

    /// `self < other`.
    #[must_use]
    pub fn lt(self, other: Self) -> Self {
        Self::function(builtin::LT, vec![self, other], DataType::Bool)
    }

    /// `self IS NULL`.
    #[must_use]
    pub fn is_null(self) -> Self {
        Self::function(builtin::IS_NULL, vec![self], DataType::Bool)
    }

    /// `NOT self`.
    #[must_use]
    pub fn logical_not(self) -> Self {
        Self::function(builtin::UNARY_NOT, vec![self], DataType::Bool)
    }

    /// `self OR other`.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::function(builtin::LOGIC_OR, vec![self, other], DataType::Bool)
    }

    /// `IF(cond, then, otherwise)`.
    pub fn if_then_else(cond: Self, then: Self, otherwise: Self, ret_type: DataType) -> Self {
        Self::function(builtin::IF, vec![cond, then, otherwise], ret_type)
    }

    /// Fold a list of conditions into a left-deep `OR` chain.
    pub fn disjunction(mut exprs: Vec<Self>) -> Option<Self> {
        if exprs.is_empty() {
            return None;
        }
        let first = exprs.remove(0);
        Some(exprs.into_iter().fold(first, Self::or))
    }

    /// Result type of this expression.
    pub fn ret_type(&self) -> DataType {
        match self {
            Self::Column(c) => c.data_type.clone(),
            Self::Literal(v) => v.data_type(),
            Self::Function(f) => f.ret_type.clone(),
        }
    }

    /// Whether the expression can evaluate to NULL.
    pub fn nullable(&self) -> bool {
        match self {
            Self::Column(c) => c.nullable,
            Self::Literal(v) => v.is_null(),
            Self::Function(f) => match f.name.as_str() {
                builtin::IS_NULL => false,
                builtin::IF_NULL => f.args.iter().all(Self::nullable),
                builtin::IF => f.args.iter().skip(1).any(Self::nullable),
                name if builtin::propagates_nulls(name) => f.args.iter().any(Self::nullable),
                _ => true,
            },
        }
    }

    /// The column, if this expression is a bare column reference.
    pub fn as_column(&self) -> Option<&Column> {
        match self {
            Self::Column(c) => Some(c),
            _ => None,
        }
    }

    /// Whether the expression references no column and is deterministic.
    pub fn is_constant(&self) -> bool {
        match self {
            Self::Column(_) => false,
            Self::Literal(_) => true,
            Self::Function(f) => {
                builtin::volatility(&f.name) == Volatility::Immutable
                    && f.args.iter().all(Self::is_constant)
            }
        }
    }

    /// Whether evaluating the expression is observable.
    pub fn has_side_effects(&self) -> bool {
        match self {
            Self::Column(_) | Self::Literal(_) => false,
            Self::Function(f) => {
                builtin::volatility(&f.name) == Volatility::SideEffect
                    || f.args.iter().any(Self::has_side_effects)
            }
        }
    }

    /// Whether the expression always returns the same result for the same row.
    pub fn is_deterministic(&self) -> bool {
        match self {
            Self::Column(_) | Self::Literal(_) => true,
            Self::Function(f) => {
                builtin::volatility(&f.name) == Volatility::Immutable
                    && f.args.iter().all(Self::is_deterministic)
            }
        }
    }

    /// Append every referenced column to `out`, in first-seen order, without duplicates.
    pub fn collect_columns(&self, out: &mut Vec<Column>) {
        match self {
            Self::Column(c) => {
                if !out.iter().any(|o| o.id == c.id) {
                    out.push(c.clone());
                }
            }
            Self::Literal(_) => {}
            Self::Function(f) => f.args.iter().for_each(|a| a.collect_columns(out)),
        }
    }

    /// Referenced columns, in first-seen order.
    pub fn columns(&self) -> Vec<Column> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    /// Ids of referenced columns.
    pub fn column_ids(&self) -> HashSet<ColumnId> {
        self.columns().into_iter().map(|c| c.id).collect()
    }

    /// Replace each reference to `schema.columns[i]` with `exprs[i]`.
    #[must_use]
    pub fn substitute(&self, schema: &Schema, exprs: &[Self]) -> Self {
        match self {
            Self::Column(c) => match schema.index_of(c.id) {
                Some(i) if i < exprs.len() => exprs[i].clone(),
                _ => self.clone(),
            },
            Self::Literal(_) => self.clone(),
            Self::Function(f) => Self::Function(ScalarFunction {
                name: f.name.clone(),
                args: f.args.iter().map(|a| a.substitute(schema, exprs)).collect(),
                ret_type: f.ret_type.clone(),
            }),
        }
    }

    /// Swap column references according to `replace`, in place.
    ///
    /// Returns whether anything changed.
    pub fn replace_columns(&mut self, replace: &HashMap<ColumnId, Column>) -> bool {
        match self {
            Self::Column(c) => match replace.get(&c.id) {
                Some(new) if new != c => {
                    *c = new.clone();
                    true
                }
                _ => false,
            },
            Self::Literal(_) => false,
            Self::Function(f) => f
                .args
                .iter_mut()
                .fold(false, |changed, a| a.replace_columns(replace) || changed),
        }
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Column(c) => write!(f, "{c}"),
            Self::Literal(v) => write!(f, "{v}"),
            Self::Function(func) => {
                let args: Vec<String> = func.args.iter().map(ToString::to_string).collect();
                write!(f, "{}({})", func.name, args.join(", "))
            }
        }
    }
}
