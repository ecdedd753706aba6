//! Column and schema definitions.

mod column;
mod schema;

pub use column::Column;
pub use schema::{KeyInfo, Schema};
