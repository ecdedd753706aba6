//! Core error types for Strata.

use thiserror::Error;

/// Result type alias using `StrataError`.
pub type StrataResult<T> = std::result::Result<T, StrataError>;

/// Core error type for Strata operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StrataError {
    /// Type mismatch or invalid type operation.
    #[error("TypeError: {0}")]
    TypeError(String),

    /// Invalid value provided.
    #[error("ValueError: {0}")]
    ValueError(String),

    /// Schema-related error.
    #[error("SchemaError: {0}")]
    SchemaError(String),

    /// A column reference that does not resolve against the input schema.
    #[error("ColumnNotFound: {0}")]
    ColumnNotFound(String),

    /// The plan tree is not in the shape an operation expects.
    #[error("PlanError: {0}")]
    PlanError(String),

    /// A rewrite rule failed; carries the rule name and the underlying cause.
    #[error("rule `{rule}` failed: {source}")]
    RuleFailed {
        /// Name of the failing rule.
        rule: String,
        /// The underlying error.
        #[source]
        source: Box<StrataError>,
    },

    /// Invalid configuration.
    #[error("ConfigError: {0}")]
    ConfigError(String),

    /// Feature not yet implemented.
    #[error("NotImplemented: {0}")]
    NotImplemented(String),

    /// Internal error (bug in Strata).
    #[error("InternalError: {0}")]
    InternalError(String),

    /// JSON serialization error.
    #[error("SerdeJsonError: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl StrataError {
    /// Create a new `TypeError`.
    pub fn type_error<S: Into<String>>(msg: S) -> Self {
        Self::TypeError(msg.into())
    }

    /// Create a new `ValueError`.
    pub fn value_error<S: Into<String>>(msg: S) -> Self {
        Self::ValueError(msg.into())
    }

    /// Create a new `SchemaError`.
    pub fn schema_error<S: Into<String>>(msg: S) -> Self {
        Self::SchemaError(msg.into())
    }

    /// Create a new `ColumnNotFound` error.
    pub fn column_not_found<S: Into<String>>(msg: S) -> Self {
        Self::ColumnNotFound(msg.into())
    }

    /// Create a new `PlanError`.
    pub fn plan<S: Into<String>>(msg: S) -> Self {
        Self::PlanError(msg.into())
    }

    /// Wrap `source` as the failure of rule `rule`.
    pub fn rule_failed<S: Into<String>>(rule: S, source: StrataError) -> Self {
        Self::RuleFailed {
            rule: rule.into(),
            source: Box::new(source),
        }
    }

    /// Create a new `ConfigError`.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a new `NotImplemented` error.
    pub fn not_implemented<S: Into<String>>(msg: S) -> Self {
        Self::NotImplemented(msg.into())
    }

    /// Create a new `InternalError`.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::InternalError(msg.into())
    }

    /// Name of the failing rule, if this error came out of the rewrite pipeline.
    pub fn failing_rule(&self) -> Option<&str> {
        match self {
            Self::RuleFailed { rule, .. } => Some(rule),
            _ => None,
        }
    }
}

/// Ensure a condition holds, returning a `PlanError` if not.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $msg:expr) => {
        if !$cond {
            return Err($crate::StrataError::PlanError($msg.to_string()));
        }
    };
    ($cond:expr, $variant:ident: $($msg:tt)*) => {
        if !$cond {
            return Err($crate::StrataError::$variant(format!($($msg)*)));
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StrataError::type_error("expected Int64, got String");
        assert_eq!(err.to_string(), "TypeError: expected Int64, got String");
    }

    #[test]
    fn test_rule_failed_names_rule() {
        let err = StrataError::rule_failed(
            "aggregation_push_down",
            StrataError::plan("join[5] has 3 children"),
        );
        assert_eq!(err.failing_rule(), Some("aggregation_push_down"));
        assert_eq!(
            err.to_string(),
            "rule `aggregation_push_down` failed: PlanError: join[5] has 3 children"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    fn checked(len: usize) -> StrataResult<usize> {
        ensure!(len == 1, "expected a single child");
        Ok(len)
    }

    fn checked_schema(len: usize) -> StrataResult<usize> {
        ensure!(len > 0, SchemaError: "schema has {} columns", len);
        Ok(len)
    }

    #[test]
    fn test_ensure_macro() {
        assert_eq!(checked(1).unwrap(), 1);
        assert!(matches!(checked(2), Err(StrataError::PlanError(_))));
        assert!(matches!(checked_schema(0), Err(StrataError::SchemaError(_))));
    }

    #[test]
    fn test_error_constructors() {
        let _ = StrataError::value_error("invalid value");
        let _ = StrataError::schema_error("column not found");
        let _ = StrataError::column_not_found("Column#7");
        let _ = StrataError::config("unknown rule");
        let _ = StrataError::not_implemented("feature X");
        let _ = StrataError::internal("unexpected state");
        assert_eq!(StrataError::internal("x").failing_rule(), None);
    }
}
