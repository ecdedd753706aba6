//! Optimization trace: a record of every rewrite the rules performed.
//!
//! The driver appends one [`RuleStep`] per rule that changed the plan; rules
//! append [`TraceStep`]s through [`OptimizeOp`] while they run. Reasons and
//! actions are closures so nothing is formatted when tracing is off.

use common_config::OptimizerConfig;
use common_display::indent;
use common_error::StrataResult;
use serde::{Deserialize, Serialize};
use strata_core::{ColumnId, IdAllocator, PlanId};
use strata_logical::LogicalOp;

/// One recorded rewrite decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceStep {
    /// Id of the node the step is about.
    pub id: PlanId,
    /// Type name of that node.
    pub tp: String,
    /// What changed.
    pub action: String,
    /// Why the change is valid.
    pub reason: String,
    /// Position within its rule step.
    pub index: usize,
}

/// All steps recorded by one rule invocation that changed the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleStep {
    /// Position within the trace.
    pub index: usize,
    /// Name of the rule.
    pub rule_name: String,
    /// Explain text of the plan handed to the rule.
    pub before: String,
    /// Micro-steps, in the order the rule recorded them.
    pub steps: Vec<TraceStep>,
}

/// The trace of one `optimize` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicalOptimizeTrace {
    /// Rule steps in pipeline order.
    pub steps: Vec<RuleStep>,
    /// Explain text of the returned plan; unset if the pipeline failed.
    pub final_plan: Option<String>,
}

impl LogicalOptimizeTrace {
    pub(crate) fn append_rule_step(&mut self, rule_name: &str, before: String, steps: Vec<TraceStep>) {
        let index = self.steps.len();
        self.steps.push(RuleStep {
            index,
            rule_name: rule_name.to_string(),
            before,
            steps,
        });
    }

    /// Rule steps recorded for `rule_name`.
    pub fn rule_steps<'a>(&'a self, rule_name: &'a str) -> impl Iterator<Item = &'a RuleStep> + 'a {
        self.steps.iter().filter(move |s| s.rule_name == rule_name)
    }

    /// Serialize the trace as JSON.
    pub fn to_json(&self) -> StrataResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Render the trace as text.
    pub fn format_trace(&self) -> String {
        let mut output = String::new();
        if self.steps.is_empty() {
            output.push_str("(no rule changed the plan)\n");
        }
        for rule in &self.steps {
            output.push_str(&format!("--- [{}] {} ---\n", rule.index, rule.rule_name));
            output.push_str("before:\n");
            output.push_str(&indent(&rule.before, "  "));
            output.push('\n');
            for step in &rule.steps {
                output.push_str(&format!(
                    "  {}. {}[{}]: {}\n     reason: {}\n",
                    step.index + 1,
                    step.tp,
                    step.id,
                    step.action,
                    step.reason
                ));
            }
        }
        if let Some(plan) = &self.final_plan {
            output.push_str("final plan:\n");
            output.push_str(&indent(plan, "  "));
            output.push('\n');
        }
        output
    }
}

/// Per-rule handle: id allocation, configuration and the step recorder.
pub struct OptimizeOp<'a> {
    ids: &'a mut IdAllocator,
    config: &'a OptimizerConfig,
    steps: Option<Vec<TraceStep>>,
}

impl<'a> OptimizeOp<'a> {
    /// Create a handle; steps are recorded only when `tracing` is set.
    pub fn new(ids: &'a mut IdAllocator, config: &'a OptimizerConfig, tracing: bool) -> Self {
        Self {
            ids,
            config,
            steps: tracing.then(Vec::new),
        }
    }

    /// The compilation's id allocator.
    pub fn ids(&mut self) -> &mut IdAllocator {
        self.ids
    }

    /// Allocate a fresh plan node id.
    pub fn alloc_plan_id(&mut self) -> PlanId {
        self.ids.alloc_plan_id()
    }

    /// Allocate a fresh column id.
    pub fn alloc_column_id(&mut self) -> ColumnId {
        self.ids.alloc_column_id()
    }

    /// Optimizer configuration.
    pub fn config(&self) -> &OptimizerConfig {
        self.config
    }

    /// Whether steps are being recorded.
    pub fn is_tracing(&self) -> bool {
        self.steps.is_some()
    }

    /// Record a step about node `id` of type `tp`.
    pub fn append_step<R, A>(&mut self, id: PlanId, tp: &str, reason: R, action: A)
    where
        R: FnOnce() -> String,
        A: FnOnce() -> String,
    {
        if let Some(steps) = self.steps.as_mut() {
            let index = steps.len();
            steps.push(TraceStep {
                id,
                tp: tp.to_string(),
                action: action(),
                reason: reason(),
                index,
            });
        }
    }

    /// Record a step about `op`.
    pub fn append_step_for<R, A>(&mut self, op: &LogicalOp, reason: R, action: A)
    where
        R: FnOnce() -> String,
        A: FnOnce() -> String,
    {
        self.append_step(op.id(), op.tp(), reason, action);
    }

    /// A handle sharing this one's allocator and configuration that records nothing.
    pub fn untraced(&mut self) -> OptimizeOp<'_> {
        OptimizeOp {
            ids: &mut *self.ids,
            config: self.config,
            steps: None,
        }
    }

    /// Number of steps recorded so far.
    pub fn step_count(&self) -> usize {
        self.steps.as_ref().map_or(0, Vec::len)
    }

    pub(crate) fn into_steps(self) -> Vec<TraceStep> {
        self.steps.unwrap_or_default()
    }
}
