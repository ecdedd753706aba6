//! Output columns of plan nodes.

use serde::{Deserialize, Serialize};

use crate::ids::ColumnId;
use crate::types::DataType;

/// A column produced by a plan node.
///
/// Identity is the `id`; name and qualifier only matter for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    /// Unique id within the compilation.
    pub id: ColumnId,
    /// Original column name, if the column comes from a table.
    pub name: Option<String>,
    /// Qualifier of the original name (e.g. `test.t`).
    pub qualifier: Option<String>,
    /// Data type.
    pub data_type: DataType,
    /// Whether this column can contain nulls.
    pub nullable: bool,
}

impl Column {
    /// Create an anonymous, nullable column.
    pub fn new(id: ColumnId, data_type: DataType) -> Self {
        Self {
            id,
            name: None,
            qualifier: None,
            data_type,
            nullable: true,
        }
    }

    /// Set the original name of this column.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the qualifier for this column.
    #[must_use]
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    /// Set nullable for this column.
    #[must_use]
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Check whether two columns are the same column.
    pub fn same(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.qualifier, &self.name) {
            (Some(q), Some(n)) => write!(f, "{q}.{n}"),
            (None, Some(n)) => write!(f, "{n}"),
            _ => write!(f, "Column#{}", self.id),
        }
    }
}
