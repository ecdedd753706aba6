//! Catalog of scalar builtins the rewriter needs to reason about.
//!
//! Evaluation lives elsewhere; the planner only needs to know whether a call
//! may be duplicated, dropped, or moved across operators.

use serde::{Deserialize, Serialize};

/// `a + b`.
pub const PLUS: &str = "plus";
/// `a - b`.
pub const MINUS: &str = "minus";
/// `a * b`.
pub const MUL: &str = "mul";
/// `a = b`.
pub const EQ: &str = "eq";
/// `a < b`.
pub const LT: &str = "lt";
/// `a > b`.
pub const GT: &str = "gt";
/// `a IS NULL`.
pub const IS_NULL: &str = "isnull";
/// `NOT a`.
pub const UNARY_NOT: &str = "not";
/// `a AND b`.
pub const LOGIC_AND: &str = "and";
/// `a OR b`.
pub const LOGIC_OR: &str = "or";
/// `IF(cond, then, else)`.
pub const IF: &str = "if";
/// `IFNULL(a, b)`.
pub const IF_NULL: &str = "ifnull";
/// `CAST(a AS ...)`.
pub const CAST: &str = "cast";

/// Functions whose evaluation changes session or server state.
const SIDE_EFFECT_FUNCTIONS: &[&str] = &[
    "sleep",
    "set_var",
    "nextval",
    "setval",
    "lastval",
    "benchmark",
    "get_lock",
    "release_lock",
    "release_all_locks",
];

/// Functions that may return a different value on every call.
const VOLATILE_FUNCTIONS: &[&str] = &[
    "rand",
    "uuid",
    "uuid_short",
    "now",
    "sysdate",
    "connection_id",
    "found_rows",
    "row_count",
    "last_insert_id",
    "current_user",
    "current_role",
    "user",
    "database",
    "version",
    "get_var",
];

/// Functions that return NULL only when some argument is NULL.
const NULL_PROPAGATING_FUNCTIONS: &[&str] = &[
    PLUS, MINUS, MUL, EQ, LT, GT, UNARY_NOT, LOGIC_AND, LOGIC_OR, CAST,
];

/// How freely a builtin may be moved, merged, or dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Volatility {
    /// Same arguments, same result, no observable effect.
    Immutable,
    /// No observable effect, but the result can differ between calls.
    Volatile,
    /// Evaluating the call is observable.
    SideEffect,
}

/// Classify a builtin by name (case-insensitive).
pub fn volatility(name: &str) -> Volatility {
    let name = name.to_ascii_lowercase();
    if SIDE_EFFECT_FUNCTIONS.contains(&name.as_str()) {
        Volatility::SideEffect
    } else if VOLATILE_FUNCTIONS.contains(&name.as_str()) {
        Volatility::Volatile
    } else {
        Volatility::Immutable
    }
}

/// Whether `name` yields a non-NULL result whenever all its arguments are
/// non-NULL (case-insensitive). Unknown functions are assumed not to.
pub fn propagates_nulls(name: &str) -> bool {
    NULL_PROPAGATING_FUNCTIONS.contains(&name.to_ascii_lowercase().as_str())
}
