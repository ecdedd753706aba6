//! Error types and result aliases for Strata.
//!
//! Every crate in the workspace reports failures through [`StrataError`].

mod error;

pub use error::{StrataError, StrataResult};
