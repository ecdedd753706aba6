//! Core data model for the Strata query compiler.
//!
//! This crate provides the fundamental types shared by the logical planner
//! and the rewrite rules:
//! - `Value` and `DataType` for the type system
//! - `Column`, `Schema` and `KeyInfo` for node output descriptions
//! - `IdAllocator` for per-compilation plan and column identifiers

pub mod ids;
pub mod schema;
pub mod types;

pub use ids::{ColumnId, IdAllocator, PlanId};
pub use schema::{Column, KeyInfo, Schema};
pub use types::{DataType, Value};
