//! Pipeline tests for strata-optimizer
//!
//! These run the full rule registry over generated and hand-built plans and
//! check the properties every optimized plan must keep: the root schema, a
//! valid plan, and a fixed point.

use common_config::OptimizerConfig;
use proptest::prelude::*;
use strata_core::{DataType, IdAllocator};
use strata_logical::expr::{lit, AggFuncDesc, AggFuncKind, Expr};
use strata_logical::ops::{JoinType, TableInfo};
use strata_logical::{validate_plan, LogicalOp, PlanBuilder};
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

fn step_count(ctx: &OptimizeContext) -> usize {
    ctx.optimize_trace().map_or(0, |t| t.steps.len())
}

/// Optimize `plan` twice with every rule selected and check the invariants
/// shared by all pipelines.
fn assert_optimizes_to_fixed_point(mut ctx: OptimizeContext, plan: LogicalOp) -> LogicalOp {
    let root_schema = plan.schema().clone();

    let once = optimize(&mut ctx, RuleFlags::all(), plan).unwrap();
    assert_eq!(once.schema().ids(), root_schema.ids());
    validate_plan(&once).unwrap_or_else(|e| panic!("{e}\n{}", once.explain()));

    ctx.take_trace();
    let twice = optimize(&mut ctx, RuleFlags::all(), once.clone()).unwrap();
    let trace = ctx.optimize_trace().unwrap();
    assert!(
        trace.steps.is_empty(),
        "second run changed the plan:\n{}",
        trace.format_trace()
    );
    assert_eq!(twice, once);
    once
}

/// `select count(*) from t a, t b, t c`
fn count_over_three_way_join(ids: &mut IdAllocator) -> LogicalOp {
    let a = PlanBuilder::scan(ids, table()).build();
    let b = PlanBuilder::scan(ids, table()).build();
    let ab = PlanBuilder::from_plan(ids, a).cross_join(b).build();
    let c = PlanBuilder::scan(ids, table()).build();
    let agg = PlanBuilder::from_plan(ids, ab)
        .cross_join(c)
        .aggregate(vec![], vec![AggFuncDesc::new(AggFuncKind::Count, vec![lit(1)])]);
    let count = agg.col_at(0).unwrap();
    agg.project(vec![count]).build()
}

#[test]
fn test_join_push_down_reaches_fixed_point() {
    let mut ctx = traced();
    let plan = count_over_three_way_join(ctx.ids_mut());
    let out = assert_optimizes_to_fixed_point(ctx, plan);
    assert!(out.find(8).is_some());
}

#[test]
fn test_max_min_split_reaches_fixed_point() {
    let mut ctx = traced();
    let builder = PlanBuilder::scan(ctx.ids_mut(), table());
    let (a, b) = (builder.col("a").unwrap(), builder.col("b").unwrap());
    let agg = builder.aggregate(
        vec![],
        vec![
            AggFuncDesc::new(AggFuncKind::Max, vec![a]),
            AggFuncDesc::new(AggFuncKind::Min, vec![b]),
        ],
    );
    let (max, min) = (agg.col_at(0).unwrap(), agg.col_at(1).unwrap());
    let plan = agg.project(vec![max.minus(min)]).build();

    let out = assert_optimizes_to_fixed_point(ctx, plan);
    assert!(out.find(2).is_none(), "the original aggregation should be split");
}

#[test]
fn test_aggregation_on_unique_key_reaches_fixed_point() {
    let mut ctx = traced();
    let builder = PlanBuilder::scan(ctx.ids_mut(), table());
    let (a, b) = (builder.col("a").unwrap(), builder.col("b").unwrap());
    let agg = builder.aggregate(
        vec![a.clone()],
        vec![
            AggFuncDesc::new(AggFuncKind::Count, vec![b]).with_distinct(true),
            AggFuncDesc::new(AggFuncKind::FirstRow, vec![a]),
        ],
    );
    let count = agg.col_at(0).unwrap();
    let plan = agg.project(vec![count]).build();

    let out = assert_optimizes_to_fixed_point(ctx, plan);
    let mut stack = vec![&out];
    while let Some(op) = stack.pop() {
        assert!(!matches!(op, LogicalOp::Aggregation(_)));
        stack.extend(op.children());
    }
}

#[test]
fn test_join_grouped_on_unique_key_reaches_fixed_point() {
    // select count(b.a) from t a join t b on a.a = b.d group by a.a
    let mut ctx = traced();
    let left = PlanBuilder::scan(ctx.ids_mut(), table()).build();
    let right = PlanBuilder::scan(ctx.ids_mut(), table()).build();
    let la = left.schema().columns[0].clone();
    let ra = Expr::Column(right.schema().columns[0].clone());
    let rd = right.schema().columns[3].clone();
    let agg = PlanBuilder::from_plan(ctx.ids_mut(), left)
        .join(right, JoinType::Inner, vec![(la.clone(), rd)])
        .aggregate(
            vec![Expr::Column(la)],
            vec![AggFuncDesc::new(AggFuncKind::Count, vec![ra])],
        );
    let count = agg.col_at(0).unwrap();
    let plan = agg.project(vec![count]).build();

    let out = assert_optimizes_to_fixed_point(ctx, plan);
    let LogicalOp::Projection(root) = &out else {
        panic!("expected projection root");
    };
    assert!(matches!(root.input.as_ref(), LogicalOp::Join(_)), "{}", out.explain());
}

#[test]
fn test_volatile_projection_survives_pipeline() {
    // select x, x from (select rand() x from t)
    let mut ctx = traced();
    let builder = PlanBuilder::scan(ctx.ids_mut(), table());
    let inner = builder.project(vec![Expr::function("rand", vec![], DataType::Float64)]);
    let x = inner.col_at(0).unwrap();
    let plan = inner.project(vec![x.clone(), x]).build();

    let out = assert_optimizes_to_fixed_point(ctx, plan);
    let LogicalOp::Projection(root) = &out else {
        panic!("expected projection root");
    };
    assert!(root.exprs.iter().all(|e| e.as_column().is_some()));
    let LogicalOp::Projection(inner) = root.input.as_ref() else {
        panic!("expected the rand() projection to stay:\n{}", out.explain());
    };
    assert_eq!(inner.exprs.len(), 1);
    assert_eq!(inner.exprs[0].to_string(), "rand()");
}

#[test]
fn test_elimination_needs_key_info() {
    let mut ctx = traced();
    let builder = PlanBuilder::scan(ctx.ids_mut(), table());
    let a = builder.col("a").unwrap();
    let agg = builder.aggregate(
        vec![a.clone()],
        vec![AggFuncDesc::new(AggFuncKind::Min, vec![a]).with_distinct(true)],
    );
    let min = agg.col_at(0).unwrap();
    let plan = agg.project(vec![min]).build();

    let flags = RuleFlags::ELIMINATE_AGG | RuleFlags::PUSH_DOWN_AGG;
    let out = optimize(&mut ctx, flags, plan.clone()).unwrap();
    assert_eq!(out, plan);
    assert_eq!(step_count(&ctx), 0);

    let flags = flags | RuleFlags::BUILD_KEY_INFO;
    let out = optimize(&mut ctx, flags, plan).unwrap();
    assert!(out.find(2).is_none());
    let names: Vec<_> = ctx
        .optimize_trace()
        .unwrap()
        .steps
        .iter()
        .map(|s| s.rule_name.clone())
        .collect();
    assert_eq!(names, vec!["build_keys", "aggregation_eliminate"]);
}

#[test]
fn test_aggregate_reading_both_join_sides_stays_put() {
    let mut ctx = traced();
    let left = PlanBuilder::scan(ctx.ids_mut(), table()).build();
    let right = PlanBuilder::scan(ctx.ids_mut(), table()).build();
    let lb = Expr::Column(left.schema().columns[1].clone());
    let rb = Expr::Column(right.schema().columns[1].clone());
    let agg = PlanBuilder::from_plan(ctx.ids_mut(), left)
        .join_on(right, JoinType::Inner, vec![])
        .aggregate(vec![], vec![AggFuncDesc::new(AggFuncKind::Sum, vec![lb.plus(rb)])]);
    let sum = agg.col_at(0).unwrap();
    let plan = agg.project(vec![sum]).build();

    let out = optimize(&mut ctx, RuleFlags::PUSH_DOWN_AGG, plan.clone()).unwrap();
    assert_eq!(out, plan);
    assert_eq!(step_count(&ctx), 0);
}

#[test]
fn test_max_of_nullable_column_filters_nulls() {
    let mut ctx = traced();
    let builder = PlanBuilder::scan(ctx.ids_mut(), table());
    let b = builder.col("b").unwrap();
    let agg = builder.aggregate(vec![], vec![AggFuncDesc::new(AggFuncKind::Max, vec![b])]);
    let max = agg.col_at(0).unwrap();
    let plan = agg.project(vec![max]).build();

    let out = assert_optimizes_to_fixed_point(ctx, plan);
    let Some(LogicalOp::Selection(sel)) = out.find(4) else {
        panic!("expected a null filter:\n{}", out.explain());
    };
    assert_eq!(sel.conditions[0].to_string(), "not(isnull(test.t.b))");
}

#[test]
fn test_disabled_rule_is_skipped() {
    let config = OptimizerConfig::default()
        .with_trace(true)
        .disable_rule("projection_eliminate");
    let mut ctx = OptimizeContext::new(config).unwrap();
    let builder = PlanBuilder::scan(ctx.ids_mut(), table());
    let a = builder.col("a").unwrap();
    let inner = builder.project(vec![lit(1).plus(a)]);
    let num = inner.col_at(0).unwrap();
    let plan = inner.project(vec![lit(1).plus(num)]).build();

    let out = optimize(&mut ctx, RuleFlags::ELIMINATE_PROJECTION, plan.clone()).unwrap();
    assert_eq!(out, plan);
    assert_eq!(step_count(&ctx), 0);
}

#[test]
fn test_unknown_disabled_rule_is_rejected() {
    let config = OptimizerConfig::default().disable_rule("no_such_rule");
    let err = OptimizeContext::new(config).unwrap_err();
    assert!(err.to_string().contains("no_such_rule"));
}

#[test]
fn test_push_down_respects_config() {
    let mut ctx =
        OptimizeContext::new(OptimizerConfig::default().with_trace(true).with_agg_push_down(false))
            .unwrap();
    let plan = count_over_three_way_join(ctx.ids_mut());

    let out = optimize(&mut ctx, RuleFlags::PUSH_DOWN_AGG, plan.clone()).unwrap();
    assert_eq!(out, plan);
    assert_eq!(step_count(&ctx), 0);
}

#[test]
fn test_untraced_run_matches_traced_run() {
    let mut traced_ctx = traced();
    let plan = count_over_three_way_join(traced_ctx.ids_mut());
    let mut plain_ctx = OptimizeContext::new(OptimizerConfig::default()).unwrap();
    let same = count_over_three_way_join(plain_ctx.ids_mut());
    assert_eq!(plan, same);

    let traced_out = optimize(&mut traced_ctx, RuleFlags::all(), plan).unwrap();
    let plain_out = optimize(&mut plain_ctx, RuleFlags::all(), same).unwrap();
    assert_eq!(traced_out, plain_out);
    assert!(plain_ctx.optimize_trace().is_none());
}

#[derive(Debug, Clone)]
struct QueryShape {
    join: bool,
    group_by: Option<usize>,
    funcs: Vec<(AggFuncKind, usize)>,
    stacked_projection: bool,
}

fn agg_kind() -> impl Strategy<Value = AggFuncKind> {
    prop_oneof![
        Just(AggFuncKind::Count),
        Just(AggFuncKind::Sum),
        Just(AggFuncKind::Max),
        Just(AggFuncKind::Min),
        Just(AggFuncKind::FirstRow),
    ]
}

fn query_shape() -> impl Strategy<Value = QueryShape> {
    (
        any::<bool>(),
        proptest::option::of(0usize..8),
        proptest::collection::vec((agg_kind(), 0usize..8), 1..4),
        any::<bool>(),
    )
        .prop_map(|(join, group_by, funcs, stacked_projection)| QueryShape {
            join,
            group_by,
            funcs,
            stacked_projection,
        })
}

/// Aggregate over `t` (or `t a join t b on a.a = b.d`), projecting every
/// aggregate output, optionally through a second projection.
fn build(ids: &mut IdAllocator, shape: &QueryShape) -> LogicalOp {
    let input = if shape.join {
        let left = PlanBuilder::scan(ids, table()).build();
        let right = PlanBuilder::scan(ids, table()).build();
        let on = (left.schema().columns[0].clone(), right.schema().columns[3].clone());
        PlanBuilder::from_plan(ids, left)
            .join(right, JoinType::Inner, vec![on])
            .build()
    } else {
        PlanBuilder::scan(ids, table()).build()
    };
    let builder = PlanBuilder::from_plan(ids, input);
    let width = builder.schema().len();
    let funcs = shape
        .funcs
        .iter()
        .map(|(kind, i)| AggFuncDesc::new(*kind, vec![builder.col_at(i % width).unwrap()]))
        .collect();
    let group_by = shape
        .group_by
        .map(|i| vec![builder.col_at(i % width).unwrap()])
        .unwrap_or_default();
    let agg = builder.aggregate(group_by, funcs);
    let outputs: Vec<Expr> = (0..shape.funcs.len())
        .map(|i| agg.col_at(i).unwrap())
        .collect();
    let proj = agg.project(outputs);
    if shape.stacked_projection {
        let first = proj.col_at(0).unwrap();
        proj.project(vec![first.plus(lit(1))]).build()
    } else {
        proj.build()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_optimize_keeps_schema_and_reaches_fixed_point(shape in query_shape()) {
        let mut ctx = traced();
        let plan = build(ctx.ids_mut(), &shape);
        let ids_before = plan.schema().ids();

        let once = optimize(&mut ctx, RuleFlags::all(), plan).unwrap();
        prop_assert_eq!(once.schema().ids(), ids_before);
        prop_assert!(validate_plan(&once).is_ok(), "invalid plan:\n{}", once.explain());

        ctx.take_trace();
        let twice = optimize(&mut ctx, RuleFlags::all(), once.clone()).unwrap();
        prop_assert_eq!(step_count(&ctx), 0);
        prop_assert_eq!(twice, once);
    }

    #[test]
    fn prop_empty_flags_leave_plan_untouched(shape in query_shape()) {
        let mut ctx = traced();
        let plan = build(ctx.ids_mut(), &shape);
        let out = optimize(&mut ctx, RuleFlags::empty(), plan.clone()).unwrap();
        prop_assert_eq!(out, plan);
        prop_assert_eq!(step_count(&ctx), 0);
    }
}
