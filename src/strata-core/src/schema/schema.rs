//! Output schemas and unique-key information.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::Column;
use crate::ids::ColumnId;

/// A set of columns whose values are jointly unique and not null.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyInfo(pub Vec<Column>);

impl KeyInfo {
    /// Create key info from its columns.
    pub fn new(columns: Vec<Column>) -> Self {
        Self(columns)
    }

    /// Columns of this key.
    pub fn columns(&self) -> &[Column] {
        &self.0
    }

    /// Ids of the key columns.
    pub fn ids(&self) -> impl Iterator<Item = ColumnId> + '_ {
        self.0.iter().map(|c| c.id)
    }

    /// Whether every key column is in `cols`.
    pub fn is_covered_by(&self, cols: &HashSet<ColumnId>) -> bool {
        self.0.iter().all(|c| cols.contains(&c.id))
    }
}

impl std::fmt::Display for KeyInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cols: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "[{}]", cols.join(","))
    }
}

/// Output schema of a plan node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Output columns, in order.
    pub columns: Vec<Column>,
    /// Candidate unique keys over `columns`.
    pub keys: Vec<KeyInfo>,
}

impl Schema {
    /// Create a schema with the given columns and no keys.
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            keys: Vec::new(),
        }
    }

    /// Concatenate two schemas; keys are not carried over.
    pub fn merge(left: &Self, right: &Self) -> Self {
        let mut columns = left.columns.clone();
        columns.extend(right.columns.iter().cloned());
        Self::new(columns)
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if the schema is empty.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Find the position of a column by id.
    pub fn index_of(&self, id: ColumnId) -> Option<usize> {
        self.columns.iter().position(|c| c.id == id)
    }

    /// Check whether the schema contains a column.
    pub fn contains(&self, id: ColumnId) -> bool {
        self.index_of(id).is_some()
    }

    /// Look a column up by id.
    pub fn column(&self, id: ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == id)
    }

    /// Column ids, in order.
    pub fn ids(&self) -> Vec<ColumnId> {
        self.columns.iter().map(|c| c.id).collect()
    }

    /// Column ids as a set.
    pub fn id_set(&self) -> HashSet<ColumnId> {
        self.columns.iter().map(|c| c.id).collect()
    }

    /// Positions of `ids` in this schema, or `None` if any is missing.
    pub fn columns_indices(&self, ids: &[ColumnId]) -> Option<Vec<usize>> {
        ids.iter().map(|id| self.index_of(*id)).collect()
    }

    /// First unique key whose columns all appear in `cols`.
    pub fn key_covered_by(&self, cols: &HashSet<ColumnId>) -> Option<&KeyInfo> {
        self.keys.iter().find(|k| k.is_covered_by(cols))
    }

    /// Add a key unless an identical one is already present.
    pub fn add_key(&mut self, key: KeyInfo) {
        if !key.0.is_empty() && !self.keys.contains(&key) {
            self.keys.push(key);
        }
    }

    /// Drop keys that reference columns no longer in the schema.
    pub fn retain_valid_keys(&mut self) {
        let ids = self.id_set();
        self.keys.retain(|k| k.is_covered_by(&ids));
    }

    /// Check whether two schemas expose the same column ids in the same order.
    pub fn same_columns(&self, other: &Self) -> bool {
        self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|(a, b)| a.id == b.id)
    }
}

impl std::fmt::Display for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cols: Vec<String> = self.columns.iter().map(ToString::to_string).collect();
        write!(f, "[{}]", cols.join(","))
    }
}
