//! The driver that runs the rule registry over a logical plan.
//!
//! Rules run once each, in registry order, skipping those whose flag is not
//! selected or that the configuration disables. The first failing rule
//! aborts the pipeline.
//!
//! Once key information has been built, later rules that rewrite the plan
//! are followed by a silent key refresh so that unique keys never go stale.

use common_error::{StrataError, StrataResult};
use log::{debug, trace};
use strata_logical::LogicalOp;

use super::build_key_info::refresh_keys;
use super::{
    AggregationEliminator, AggregationPushDown, BuildKeyInfo, ColumnPruner, MaxMinEliminator,
    OptimizationRule, ProjectionEliminator, RuleFlags,
};
use crate::context::OptimizeContext;
use crate::trace::OptimizeOp;

/// A registry entry: the flag that selects a rule, and the rule.
#[derive(Clone, Copy)]
pub struct RuleEntry {
    /// Flag selecting this entry.
    pub flag: RuleFlags,
    /// The rule.
    pub rule: &'static dyn OptimizationRule,
}

impl std::fmt::Debug for RuleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEntry")
            .field("flag", &self.flag)
            .field("rule", &self.rule.name())
            .finish()
    }
}

static DEFAULT_REGISTRY: [RuleEntry; 7] = [
    RuleEntry {
        flag: RuleFlags::PRUNE_COLUMNS,
        rule: &ColumnPruner,
    },
    RuleEntry {
        flag: RuleFlags::BUILD_KEY_INFO,
        rule: &BuildKeyInfo,
    },
    RuleEntry {
        flag: RuleFlags::ELIMINATE_AGG,
        rule: &AggregationEliminator,
    },
    RuleEntry {
        flag: RuleFlags::ELIMINATE_PROJECTION,
        rule: &ProjectionEliminator,
    },
    RuleEntry {
        flag: RuleFlags::MAX_MIN_ELIMINATE,
        rule: &MaxMinEliminator,
    },
    RuleEntry {
        flag: RuleFlags::PUSH_DOWN_AGG,
        rule: &AggregationPushDown,
    },
    RuleEntry {
        flag: RuleFlags::PRUNE_COLUMNS_AGAIN,
        rule: &ColumnPruner,
    },
];

/// The logical optimizer: an immutable, ordered rule registry.
#[derive(Debug, Clone, Copy)]
pub struct Optimizer {
    registry: &'static [RuleEntry],
}

impl Optimizer {
    /// The standard pipeline.
    pub const fn new() -> Self {
        Self {
            registry: &DEFAULT_REGISTRY,
        }
    }

    /// A pipeline over a custom registry.
    pub const fn with_registry(registry: &'static [RuleEntry]) -> Self {
        Self { registry }
    }

    /// Registry entries in execution order.
    pub fn registry(&self) -> &[RuleEntry] {
        self.registry
    }

    /// Distinct rule names in the registry.
    pub fn rule_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = Vec::new();
        for entry in self.registry {
            if !names.contains(&entry.rule.name()) {
                names.push(entry.rule.name());
            }
        }
        names
    }

    /// Run every selected rule over `root`, in registry order.
    ///
    /// When tracing is enabled on `ctx`, each rule that changed the plan
    /// appends one rule step to the context's trace. On error the trace
    /// keeps the steps recorded before the failing rule.
    pub fn optimize(
        &self,
        ctx: &mut OptimizeContext,
        flags: RuleFlags,
        root: LogicalOp,
    ) -> StrataResult<LogicalOp> {
        let mut plan = root;
        let tracing = ctx.trace.is_some();
        let mut keys_built = false;

        for entry in self.registry {
            let name = entry.rule.name();
            if !flags.contains(entry.flag) {
                trace!("Skipping rule '{name}': flag {:?} not selected", entry.flag);
                continue;
            }
            if ctx.config.is_rule_disabled(name) {
                debug!("Skipping rule '{name}': disabled by configuration");
                continue;
            }

            let before = tracing.then(|| plan.explain());
            let mut opt = OptimizeOp::new(&mut ctx.ids, &ctx.config, tracing);
            let result = entry
                .rule
                .optimize(plan, &mut opt)
                .map_err(|e| StrataError::rule_failed(name, e))?;
            let steps = opt.into_steps();

            debug!("Rule '{name}' ran, changed: {}", result.changed);
            if result.changed {
                if let (Some(trace), Some(before)) = (ctx.trace.as_mut(), before) {
                    trace.append_rule_step(name, before, steps);
                }
            }
            plan = result.plan;

            if entry.flag == RuleFlags::BUILD_KEY_INFO {
                keys_built = true;
            } else if keys_built && result.changed {
                let (refreshed, changed) =
                    refresh_keys(plan).map_err(|e| StrataError::rule_failed(name, e))?;
                trace!("Refreshed key info after '{name}', changed: {changed}");
                plan = refreshed;
            }
        }

        if let Some(trace) = ctx.trace.as_mut() {
            trace.final_plan = Some(plan.explain());
        }
        Ok(plan)
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new()
    }
}
