//! Trace tests for strata-optimizer
//!
//! Each case builds a small query plan, runs the pipeline with tracing on and
//! checks the micro-steps the selected rule recorded.

use common_config::OptimizerConfig;
use strata_core::DataType;
use strata_logical::expr::{lit, AggFuncDesc, AggFuncKind, Expr};
use strata_logical::ops::TableInfo;
use strata_logical::{LogicalOp, PlanBuilder};
use strata_optimizer::{optimize, OptimizeContext, RuleFlags};

fn table() -> TableInfo {
    TableInfo::new("test.t")
        .with_column("a", DataType::Int64, false)
        .with_column("b", DataType::Int64, true)
        .with_column("c", DataType::Int64, true)
        .with_column("d", DataType::Int64, true)
        .with_primary_key(&["a"])
        .unwrap()
}

fn traced() -> OptimizeContext {
    OptimizeContext::new(OptimizerConfig::default().with_trace(true)).unwrap()
}

/// Run `flags` over the plan built by `build` and return the steps of
/// `rule` as `(action, reason)` pairs.
fn rule_steps(
    flags: RuleFlags,
    rule: &str,
    build: impl FnOnce(&mut OptimizeContext) -> LogicalOp,
) -> Vec<(String, String)> {
    let mut ctx = traced();
    let plan = build(&mut ctx);
    let out = optimize(&mut ctx, flags, plan).unwrap();
    assert!(matches!(out, LogicalOp::Projection(_)), "root should stay a projection");

    let trace = ctx.optimize_trace().unwrap();
    let mut rule_steps = trace.rule_steps(rule);
    let step = rule_steps
        .next()
        .unwrap_or_else(|| panic!("no step recorded for {rule}:\n{}", trace.format_trace()));
    assert!(rule_steps.next().is_none());
    step.steps
        .iter()
        .map(|s| (s.action.clone(), s.reason.clone()))
        .collect()
}

fn expected(steps: &[(&str, &str)]) -> Vec<(String, String)> {
    steps
        .iter()
        .map(|(a, r)| ((*a).to_string(), (*r).to_string()))
        .collect()
}

/// `select * from t where a in (1,2)`
fn select_star_in_list(ctx: &mut OptimizeContext) -> LogicalOp {
    let builder = PlanBuilder::scan(ctx.ids_mut(), table());
    let a = builder.col("a").unwrap();
    let filtered = builder.filter(vec![a.clone().equal(lit(1)).or(a.equal(lit(2)))]);
    let all = (0..4).map(|i| filtered.col_at(i).unwrap()).collect();
    filtered.project(all).build()
}

#[test]
fn test_step_count_follows_changed_rules() {
    let cases = [
        (RuleFlags::ELIMINATE_AGG | RuleFlags::PUSH_DOWN_AGG, 0),
        (
            RuleFlags::ELIMINATE_AGG
                | RuleFlags::PUSH_DOWN_AGG
                | RuleFlags::PRUNE_COLUMNS
                | RuleFlags::BUILD_KEY_INFO,
            1,
        ),
        (RuleFlags::empty(), 0),
    ];

    for (flags, steps) in cases {
        let mut ctx = traced();
        let plan = select_star_in_list(&mut ctx);
        let out = optimize(&mut ctx, flags, plan).unwrap();
        assert!(matches!(out, LogicalOp::Projection(_)));

        let trace = ctx.optimize_trace().unwrap();
        assert_eq!(trace.steps.len(), steps, "flags {flags:?}");
        assert!(trace.final_plan.is_some());
    }
}

#[test]
fn test_distinct_and_aggregation_elimination() {
    // select min(distinct a) from t group by a
    let steps = rule_steps(
        RuleFlags::BUILD_KEY_INFO | RuleFlags::ELIMINATE_AGG,
        "aggregation_eliminate",
        |ctx| {
            let builder = PlanBuilder::scan(ctx.ids_mut(), table());
            let a = builder.col("a").unwrap();
            let agg = builder.aggregate(
                vec![a.clone()],
                vec![AggFuncDesc::new(AggFuncKind::Min, vec![a]).with_distinct(true)],
            );
            let min = agg.col_at(0).unwrap();
            agg.project(vec![min]).build()
        },
    );
    assert_eq!(
        steps,
        expected(&[
            (
                "min(distinct ...) is simplified to min(...)",
                "[test.t.a] is a unique key",
            ),
            (
                "aggregation is simplified to a projection",
                "[test.t.a] is a unique key",
            ),
        ])
    );
}

#[test]
fn test_projection_merge() {
    // select 1+num from (select 1+a as num from t) t1
    let steps = rule_steps(RuleFlags::ELIMINATE_PROJECTION, "projection_eliminate", |ctx| {
        let builder = PlanBuilder::scan(ctx.ids_mut(), table());
        let a = builder.col("a").unwrap();
        let inner = builder.project(vec![lit(1).plus(a)]);
        let num = inner.col_at(0).unwrap();
        inner.project(vec![lit(1).plus(num)]).build()
    });
    assert_eq!(
        steps,
        expected(&[(
            "Proj[2] is eliminated, Proj[3]'s expressions changed into[plus(1, plus(1, test.t.a))]",
            "Proj[3]'s child proj[2] is redundant",
        )])
    );
}

#[test]
fn test_count_pushed_across_join() {
    // select count(*) from t a, t b, t c
    let flags = RuleFlags::BUILD_KEY_INFO | RuleFlags::PRUNE_COLUMNS | RuleFlags::PUSH_DOWN_AGG;
    let steps = rule_steps(flags, "aggregation_push_down", |ctx| {
        let a = PlanBuilder::scan(ctx.ids_mut(), table()).build();
        let b = PlanBuilder::scan(ctx.ids_mut(), table()).build();
        let ab = PlanBuilder::from_plan(ctx.ids_mut(), a).cross_join(b).build();
        let c = PlanBuilder::scan(ctx.ids_mut(), table()).build();
        let agg = PlanBuilder::from_plan(ctx.ids_mut(), ab)
            .cross_join(c)
            .aggregate(vec![], vec![AggFuncDesc::new(AggFuncKind::Count, vec![lit(1)])]);
        let count = agg.col_at(0).unwrap();
        agg.project(vec![count]).build()
    });
    assert_eq!(
        steps,
        expected(&[(
            "agg[6] pushed down across join[5], and join right path becomes agg[8]",
            "agg[6]'s functions[count(1)] are decomposable with join",
        )])
    );
}

#[test]
fn test_sum_pushed_across_union() {
    // select sum(c1) from (select c c1, d c2 from t a union all select a c1, b c2 from t b) x group by c2
    let flags = RuleFlags::BUILD_KEY_INFO | RuleFlags::PRUNE_COLUMNS | RuleFlags::PUSH_DOWN_AGG;
    let steps = rule_steps(flags, "aggregation_push_down", |ctx| {
        let first = PlanBuilder::scan(ctx.ids_mut(), table());
        let (c, d) = (first.col("c").unwrap(), first.col("d").unwrap());
        let first = first.project(vec![c, d]).build();
        let second = PlanBuilder::scan(ctx.ids_mut(), table());
        let (a, b) = (second.col("a").unwrap(), second.col("b").unwrap());
        let second = second.project(vec![a, b]).build();
        let union = PlanBuilder::from_plan(ctx.ids_mut(), first).union_all(vec![second]);
        let (c1, c2) = (union.col_at(0).unwrap(), union.col_at(1).unwrap());
        let agg = union.aggregate(vec![c2], vec![AggFuncDesc::new(AggFuncKind::Sum, vec![c1])]);
        let sum = agg.col_at(0).unwrap();
        agg.project(vec![sum]).build()
    });
    assert_eq!(
        steps,
        expected(&[
            (
                "agg[6] pushed down, and union[5]'s children changed into[[id:8,tp:Aggregation],[id:9,tp:Aggregation]]",
                "agg[6] functions[sum(Column#13)] are decomposable with union",
            ),
            (
                "proj[2] is eliminated, and agg[8]'s functions changed into[sum(test.t.c),firstrow(test.t.d)]",
                "Proj[2] is directly below an agg[8] and has no side effects",
            ),
            (
                "proj[4] is eliminated, and agg[9]'s functions changed into[sum(test.t.a),firstrow(test.t.b)]",
                "Proj[4] is directly below an agg[9] and has no side effects",
            ),
        ])
    );
}

#[test]
fn test_max_min_split() {
    // select max(a)-min(a) from t
    let flags = RuleFlags::BUILD_KEY_INFO | RuleFlags::PRUNE_COLUMNS | RuleFlags::MAX_MIN_ELIMINATE;
    let steps = rule_steps(flags, "max_min_eliminate", |ctx| {
        let builder = PlanBuilder::scan(ctx.ids_mut(), table());
        let a = builder.col("a").unwrap();
        let agg = builder.aggregate(
            vec![],
            vec![
                AggFuncDesc::new(AggFuncKind::Max, vec![a.clone()]),
                AggFuncDesc::new(AggFuncKind::Min, vec![a]),
            ],
        );
        let (max, min) = (agg.col_at(0).unwrap(), agg.col_at(1).unwrap());
        agg.project(vec![max.minus(min)]).build()
    });
    assert_eq!(
        steps,
        expected(&[
            (
                "add sort[8],add limit[9] during eliminating agg[4] max function",
                "agg[4] has only one function[max] without group by, the columns in agg[4] should be sorted",
            ),
            (
                "add sort[10],add limit[11] during eliminating agg[6] min function",
                "agg[6] has only one function[min] without group by, the columns in agg[6] should be sorted",
            ),
            (
                "agg[2] splited into aggs[4,6], and add joins[12] to connect them during eliminating agg[2] multi min/max functions",
                "each column is sorted and can benefit from index/primary key in agg[4,6] and none of them has group by clause",
            ),
        ])
    );
}

#[test]
fn test_max_of_nullable_column() {
    // select max(b) from t
    let flags = RuleFlags::BUILD_KEY_INFO | RuleFlags::PRUNE_COLUMNS | RuleFlags::MAX_MIN_ELIMINATE;
    let steps = rule_steps(flags, "max_min_eliminate", |ctx| {
        let builder = PlanBuilder::scan(ctx.ids_mut(), table());
        let b = builder.col("b").unwrap();
        let agg = builder.aggregate(vec![], vec![AggFuncDesc::new(AggFuncKind::Max, vec![b])]);
        let max = agg.col_at(0).unwrap();
        agg.project(vec![max]).build()
    });
    assert_eq!(
        steps,
        expected(&[(
            "add selection[4],add sort[5],add limit[6] during eliminating agg[2] max function",
            "agg[2] has only one function[max] without group by, the columns in agg[2] shouldn't be NULL and needs NULL to be filtered out, the columns in agg[2] should be sorted",
        )])
    );
}

#[test]
fn test_trace_serializes_with_camel_case_keys() {
    let mut ctx = traced();
    let plan = select_star_in_list(&mut ctx);
    optimize(&mut ctx, RuleFlags::all(), plan).unwrap();

    let trace = ctx.take_trace().unwrap();
    let json = trace.to_json().unwrap();
    assert!(json.contains("\"ruleName\": \"build_keys\""));
    assert!(json.contains("\"finalPlan\""));

    let text = trace.format_trace();
    assert!(text.contains("build_keys"));
    assert!(text.contains("final plan:"));

    // Taking the trace leaves an empty one for the next compilation.
    assert!(ctx.optimize_trace().unwrap().steps.is_empty());
}

#[test]
fn test_side_effects_keep_projections() {
    let mut ctx = traced();
    let builder = PlanBuilder::scan(ctx.ids_mut(), table());
    let a = builder.col("a").unwrap();
    let inner = builder.project(vec![Expr::function("sleep", vec![a], DataType::Int64)]);
    let r = inner.col_at(0).unwrap();
    let plan = inner.project(vec![r.plus(lit(1))]).build();

    let out = optimize(&mut ctx, RuleFlags::ELIMINATE_PROJECTION, plan).unwrap();
    assert_eq!(out.operator_count(), 3);
    assert!(ctx.optimize_trace().unwrap().steps.is_empty());
}
