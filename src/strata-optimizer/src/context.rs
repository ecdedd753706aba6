//! Per-compilation optimizer state.

use common_config::OptimizerConfig;
use common_error::{StrataError, StrataResult};
use strata_core::IdAllocator;

use crate::rules::Optimizer;
use crate::trace::LogicalOptimizeTrace;

/// State owned by one query compilation: the id allocator shared by the
/// plan builder and the rules, the configuration, and the trace.
#[derive(Debug, Clone)]
pub struct OptimizeContext {
    pub(crate) ids: IdAllocator,
    pub(crate) config: OptimizerConfig,
    pub(crate) trace: Option<LogicalOptimizeTrace>,
}

impl OptimizeContext {
    /// Create a context with a fresh id allocator.
    pub fn new(config: OptimizerConfig) -> StrataResult<Self> {
        Self::with_ids(config, IdAllocator::new())
    }

    /// Create a context continuing an existing allocator, e.g. the one the
    /// plan was built with.
    pub fn with_ids(config: OptimizerConfig, ids: IdAllocator) -> StrataResult<Self> {
        let known = Optimizer::new().rule_names();
        if let Some(unknown) = config
            .disabled_rules
            .iter()
            .find(|name| !known.contains(&name.as_str()))
        {
            return Err(StrataError::config(format!(
                "unknown rule `{unknown}` in disabled_rules, expected one of {known:?}"
            )));
        }
        let trace = config.enable_trace.then(LogicalOptimizeTrace::default);
        Ok(Self { ids, config, trace })
    }

    /// The id allocator; build the plan with it so rule-created ids follow.
    pub fn ids_mut(&mut self) -> &mut IdAllocator {
        &mut self.ids
    }

    /// Optimizer configuration.
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Whether rewrites are being traced.
    pub fn trace_enabled(&self) -> bool {
        self.trace.is_some()
    }

    /// The trace collected so far, if tracing is enabled.
    pub fn optimize_trace(&self) -> Option<&LogicalOptimizeTrace> {
        self.trace.as_ref()
    }

    /// Take the collected trace, leaving an empty one behind.
    pub fn take_trace(&mut self) -> Option<LogicalOptimizeTrace> {
        self.trace.as_mut().map(std::mem::take)
    }
}
