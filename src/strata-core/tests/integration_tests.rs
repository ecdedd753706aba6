//! Integration tests for strata-core
//!
//! These tests cover the data model as the planner uses it without duplicating
//! existing unit tests in individual modules.

use std::collections::HashSet;

use proptest::prelude::*;
use strata_core::*;

fn table_column(id: ColumnId, name: &str, nullable: bool) -> Column {
    Column::new(id, DataType::Int64)
        .with_name(name)
        .with_qualifier("test.t")
        .with_nullable(nullable)
}

#[test]
fn test_value_types_and_display() {
    assert_eq!(Value::from(42).data_type(), DataType::Int64);
    assert_eq!(Value::from(true).data_type(), DataType::Bool);
    assert_eq!(Value::Null.data_type(), DataType::Null);
    assert_eq!(Value::from(7).as_int64(), Some(7));
    assert_eq!(Value::from(1.5).as_int64(), None);

    assert_eq!(Value::Null.to_string(), "<nil>");
    assert_eq!(Value::from(0).to_string(), "0");
}

#[test]
fn test_column_identity_ignores_names() {
    let a = table_column(1, "a", false);
    let renamed = Column::new(1, DataType::Int64).with_name("num");
    assert!(a.same(&renamed));
    assert_ne!(a, renamed);

    assert_eq!(a.to_string(), "test.t.a");
    assert_eq!(Column::new(13, DataType::Int64).to_string(), "Column#13");
}

#[test]
fn test_schema_keys_follow_columns() {
    let mut schema = Schema::new(vec![
        table_column(1, "a", false),
        table_column(2, "b", true),
        table_column(3, "c", true),
    ]);
    schema.add_key(KeyInfo::new(vec![table_column(1, "a", false)]));
    schema.add_key(KeyInfo::new(vec![
        table_column(2, "b", true),
        table_column(3, "c", true),
    ]));
    assert_eq!(schema.keys.len(), 2);
    assert_eq!(schema.keys[0].to_string(), "[test.t.a]");

    let grouped: HashSet<ColumnId> = [2, 3].into_iter().collect();
    let covering = schema.key_covered_by(&grouped).map(ToString::to_string);
    assert_eq!(covering.as_deref(), Some("[test.t.b,test.t.c]"));
    assert!(schema.key_covered_by(&HashSet::from([2])).is_none());

    schema.columns.retain(|c| c.id != 3);
    schema.retain_valid_keys();
    assert_eq!(schema.keys.len(), 1);
    assert_eq!(schema.to_string(), "[test.t.a,test.t.b]");
}

#[test]
fn test_merged_schema_drops_keys() {
    let mut left = Schema::new(vec![table_column(1, "a", false)]);
    left.add_key(KeyInfo::new(left.columns.clone()));
    let right = Schema::new(vec![table_column(2, "a", false)]);

    let merged = Schema::merge(&left, &right);
    assert_eq!(merged.ids(), vec![1, 2]);
    assert!(merged.keys.is_empty());
    assert_eq!(merged.columns_indices(&[2, 1]), Some(vec![1, 0]));
    assert_eq!(merged.columns_indices(&[3]), None);
}

#[test]
fn test_enum_is_not_min_max_orderable() {
    assert!(DataType::Int64.sorts_like_min_max());
    assert!(DataType::String.sorts_like_min_max());
    assert!(!DataType::Enum(vec!["x".into(), "y".into()]).sorts_like_min_max());
    assert_eq!(DataType::Enum(vec!["x".into(), "y".into()]).to_string(), "Enum(x,y)");
}

#[test]
fn test_schema_serialization() {
    let mut schema = Schema::new(vec![table_column(1, "a", false)]);
    schema.add_key(KeyInfo::new(schema.columns.clone()));

    let json = serde_json::to_string(&schema).unwrap();
    let back: Schema = serde_json::from_str(&json).unwrap();
    assert_eq!(back, schema);
}

proptest! {
    #[test]
    fn prop_allocated_ids_are_unique(plans in 0usize..64, columns in 0usize..64) {
        let mut ids = IdAllocator::new();
        let plan_ids: HashSet<PlanId> = (0..plans).map(|_| ids.alloc_plan_id()).collect();
        let column_ids: HashSet<ColumnId> = (0..columns).map(|_| ids.alloc_column_id()).collect();

        prop_assert_eq!(plan_ids.len(), plans);
        prop_assert_eq!(column_ids.len(), columns);
        prop_assert_eq!(ids.peek_plan_id(), plans as PlanId + 1);
    }

    #[test]
    fn prop_retained_keys_are_covered(n in 1u64..8, drop in 0u64..8) {
        let mut schema = Schema::new((1..=n).map(|i| table_column(i, "x", false)).collect());
        for i in 1..=n {
            schema.add_key(KeyInfo::new(vec![table_column(i, "x", false)]));
        }
        schema.columns.retain(|c| c.id != drop);
        schema.retain_valid_keys();

        let ids = schema.id_set();
        prop_assert!(schema.keys.iter().all(|k| k.is_covered_by(&ids)));
        prop_assert_eq!(schema.keys.len(), schema.len());
    }
}
