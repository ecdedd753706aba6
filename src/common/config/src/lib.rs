//! Configuration management for Strata.
//!
//! Provides runtime configuration for the logical rewrite pipeline.

use common_error::StrataResult;
use serde::{Deserialize, Serialize};

/// Global Strata configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrataConfig {
    /// Logical optimizer configuration.
    pub optimizer: OptimizerConfig,
}

impl StrataConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> StrataResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize this configuration as pretty-printed JSON.
    pub fn to_json(&self) -> StrataResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Logical optimizer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Record a rewrite trace for every compilation.
    pub enable_trace: bool,
    /// Rule names that never run, even when their flag is set.
    pub disabled_rules: Vec<String>,
    /// Whether aggregations may be pushed below joins and unions.
    pub allow_agg_push_down: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            enable_trace: false,
            disabled_rules: Vec::new(),
            allow_agg_push_down: true,
        }
    }
}

impl OptimizerConfig {
    /// Enable or disable tracing.
    #[must_use]
    pub fn with_trace(mut self, enable: bool) -> Self {
        self.enable_trace = enable;
        self
    }

    /// Disable the rule with the given name.
    #[must_use]
    pub fn disable_rule(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.disabled_rules.contains(&name) {
            self.disabled_rules.push(name);
        }
        self
    }

    /// Allow or forbid aggregation push-down.
    #[must_use]
    pub fn with_agg_push_down(mut self, allow: bool) -> Self {
        self.allow_agg_push_down = allow;
        self
    }

    /// Check whether a rule is disabled by name.
    pub fn is_rule_disabled(&self, name: &str) -> bool {
        self.disabled_rules.iter().any(|r| r == name)
    }
}
