//! Data type definitions for Strata schemas.

use serde::{Deserialize, Serialize};

/// Data type for schema columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Null type (unknown or absent).
    Null,
    /// Boolean type.
    Bool,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point.
    Float64,
    /// UTF-8 string.
    String,
    /// Date (days since epoch).
    Date,
    /// Timestamp with microsecond precision.
    Timestamp,
    /// Enumeration over a fixed list of labels.
    Enum(Vec<String>),
}

impl DataType {
    /// Whether `ORDER BY` on this type agrees with `MIN`/`MAX` on it.
    ///
    /// Enumerations sort by label but aggregate by ordinal.
    pub const fn sorts_like_min_max(&self) -> bool {
        !matches!(self, Self::Enum(_))
    }

    /// Get the display name for this type.
    pub fn display_name(&self) -> String {
        match self {
            Self::Null => "Null".to_string(),
            Self::Bool => "Bool".to_string(),
            Self::Int64 => "Int64".to_string(),
            Self::Float64 => "Float64".to_string(),
            Self::String => "String".to_string(),
            Self::Date => "Date".to_string(),
            Self::Timestamp => "Timestamp".to_string(),
            Self::Enum(labels) => format!("Enum({})", labels.join(",")),
        }
    }

    /// Get the common supertype of two types (for type inference).
    pub fn common_supertype(&self, other: &Self) -> Option<Self> {
        if self == other {
            return Some(self.clone());
        }

        match (self, other) {
            (Self::Null, t) | (t, Self::Null) => Some(t.clone()),
            (Self::Int64, Self::Float64) | (Self::Float64, Self::Int64) => Some(Self::Float64),
            _ => None,
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
