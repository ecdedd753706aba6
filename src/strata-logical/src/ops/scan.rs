//! DataSource operator: a table read, the leaf of every plan.

use common_error::{StrataError, StrataResult};
use serde::{Deserialize, Serialize};
use strata_core::{Column, DataType, IdAllocator, Schema};

use super::PlanBase;

/// A column definition in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableColumn {
    /// Column name, unique within the table.
    pub name: String,
    /// Declared type.
    pub data_type: DataType,
    /// Whether NULL is allowed.
    pub nullable: bool,
}

/// Catalog description of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    /// Qualified table name (e.g. `test.t`).
    pub name: String,
    /// Column definitions, in definition order.
    pub columns: Vec<TableColumn>,
    /// Offsets of the primary key columns; empty when the table has none.
    pub primary_key: Vec<usize>,
    /// Unique indexes, each a list of column offsets.
    pub unique_indexes: Vec<Vec<usize>>,
}

impl TableInfo {
    /// Create a table with no columns.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            unique_indexes: Vec::new(),
        }
    }

    /// Add a column definition.
    #[must_use]
    pub fn with_column(mut self, name: &str, data_type: DataType, nullable: bool) -> Self {
        self.columns.push(TableColumn {
            name: name.to_string(),
            data_type,
            nullable,
        });
        self
    }

    fn offsets(&self, names: &[&str]) -> StrataResult<Vec<usize>> {
        names
            .iter()
            .map(|name| {
                self.columns
                    .iter()
                    .position(|c| c.name == *name)
                    .ok_or_else(|| StrataError::column_not_found(format!("{}.{name}", self.name)))
            })
            .collect()
    }

    /// Declare the primary key. Primary key columns are NOT NULL.
    pub fn with_primary_key(mut self, names: &[&str]) -> StrataResult<Self> {
        let offsets = self.offsets(names)?;
        for &offset in &offsets {
            self.columns[offset].nullable = false;
        }
        self.primary_key = offsets;
        Ok(self)
    }

    /// Declare a unique index.
    pub fn with_unique_index(mut self, names: &[&str]) -> StrataResult<Self> {
        let offsets = self.offsets(names)?;
        self.unique_indexes.push(offsets);
        Ok(self)
    }

    /// Primary key (if any) followed by unique indexes, as column names.
    pub fn candidate_keys(&self) -> Vec<Vec<&str>> {
        std::iter::once(&self.primary_key)
            .filter(|pk| !pk.is_empty())
            .chain(self.unique_indexes.iter())
            .map(|key| key.iter().map(|&i| self.columns[i].name.as_str()).collect())
            .collect()
    }
}

/// DataSource operator - reads the (possibly pruned) columns of a table.
///
/// Schema columns carry the table column names, which is how keys are
/// matched back to the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    /// Node id, schema and key info.
    pub base: PlanBase,
    /// The table being read.
    pub table: TableInfo,
}

impl DataSource {
    /// Create a read of every column of `table`, allocating the plan id
    /// and then one column id per table column.
    pub fn new(ids: &mut IdAllocator, table: TableInfo) -> Self {
        let id = ids.alloc_plan_id();
        let columns = table
            .columns
            .iter()
            .map(|def| {
                Column::new(ids.alloc_column_id(), def.data_type.clone())
                    .with_name(def.name.clone())
                    .with_qualifier(table.name.clone())
                    .with_nullable(def.nullable)
            })
            .collect();
        Self {
            base: PlanBase::new(id, Schema::new(columns)),
            table,
        }
    }

    /// The schema column read from table column `name`, if not pruned.
    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.base
            .schema
            .columns
            .iter()
            .find(|c| c.name.as_deref() == Some(name))
    }
}
