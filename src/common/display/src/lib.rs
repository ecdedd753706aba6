//! Display and visualization utilities for Strata.
//!
//! Provides formatting for logical plans and rewrite traces.

mod tree;

pub use tree::{DisplayTree, TreeNode};

/// Indent a multi-line string.
pub fn indent(s: &str, prefix: &str) -> String {
    s.lines()
        .map(|line| format!("{prefix}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Join displayable items with `sep`.
pub fn join_display<T: std::fmt::Display>(items: impl IntoIterator<Item = T>, sep: &str) -> String {
    items
        .into_iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}
