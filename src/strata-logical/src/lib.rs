//! Logical plan representation for Strata.
//!
//! `strata-logical` defines the relational operator tree that the optimizer
//! rewrites: a closed set of operators ([`ops::LogicalOp`]), each carrying
//! a plan id, an output schema with unique keys, and a single-row flag.
//!
//! # Example
//!
//! ```rust
//! use strata_core::{DataType, IdAllocator};
//! use strata_logical::expr::{lit, AggFuncDesc, AggFuncKind};
//! use strata_logical::ops::TableInfo;
//! use strata_logical::PlanBuilder;
//!
//! let table = TableInfo::new("test.t")
//!     .with_column("a", DataType::Int64, false)
//!     .with_column("b", DataType::Int64, true);
//!
//! let mut ids = IdAllocator::new();
//! let builder = PlanBuilder::scan(&mut ids, table);
//! let b = builder.col("b").unwrap();
//! let plan = builder
//!     .filter(vec![b.clone().gt(lit(18))])
//!     .aggregate(vec![], vec![AggFuncDesc::new(AggFuncKind::Max, vec![b])])
//!     .build();
//!
//! println!("{}", plan.explain());
//! ```

pub mod builder;
pub mod expr;
pub mod ops;
mod plan;
pub mod validation;

pub use builder::PlanBuilder;
pub use ops::{LogicalOp, PlanBase};
pub use validation::validate_plan;
