//! End-to-end pipeline scenarios
//!
//! These tests drive whole chains through the public API and check ordering,
//! boundary, cancellation and failure behaviour.

use rowpipe::pipeline::PipelineSpec;
use rowpipe::{
    Aggregate, CancellationToken, ExecutionContext, Operation, OperationError, Record, Schema,
    SortKey, Table, Value, run_pipeline,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn people() -> Vec<Record> {
    [("Alice", 30), ("Bob", 17), ("Charlie", 25)]
        .into_iter()
        .map(|(name, age)| Record::from([("name", Value::from(name)), ("age", Value::from(age))]))
        .collect()
}

fn people_schema() -> Schema {
    Schema::new(["name", "age"])
}

fn adults() -> Operation {
    Operation::filter(|r| r.get("age").and_then(Value::as_i64).is_some_and(|age| age >= 18))
}

fn person(name: &str, age: i64) -> Record {
    Record::from([("name", Value::from(name)), ("age", Value::from(age))])
}

fn names(records: &[Record]) -> Vec<&str> {
    records
        .iter()
        .filter_map(|r| r.get("name").and_then(Value::as_str))
        .collect()
}

#[test]
fn test_filter_then_sort() {
    let ops = vec![adults(), Operation::sort([SortKey::asc("name")])];
    let output =
        run_pipeline(&ops, &people(), &people_schema(), &ExecutionContext::new()).unwrap();

    assert_eq!(output.records, [person("Alice", 30), person("Charlie", 25)]);
    assert_eq!(output.stats.input_records, 3);
    assert_eq!(output.stats.filtered_count, 1);
    assert_eq!(output.stats.output_records, 2);
    assert_eq!(output.stats.stages_completed(), 2);
}

#[test]
fn test_sort_then_filter_gives_same_set() {
    let ops = vec![Operation::sort([SortKey::asc("name")]), adults()];
    let output =
        run_pipeline(&ops, &people(), &people_schema(), &ExecutionContext::new()).unwrap();
    assert_eq!(output.records, [person("Alice", 30), person("Charlie", 25)]);
}

#[test]
fn test_chain_order_matters() {
    let ctx = ExecutionContext::new();
    let limit_first = vec![Operation::limit(2), adults()];
    let filter_first = vec![adults(), Operation::limit(2)];

    let a = run_pipeline(&limit_first, &people(), &people_schema(), &ctx).unwrap();
    let b = run_pipeline(&filter_first, &people(), &people_schema(), &ctx).unwrap();

    assert_eq!(names(&a.records), ["Alice"]);
    assert_eq!(names(&b.records), ["Alice", "Charlie"]);
}

#[test]
fn test_repeated_runs_are_identical() {
    let ops = vec![
        adults(),
        Operation::add_column("decade", |r| {
            let age = r.get("age").and_then(Value::as_i64).unwrap_or_default();
            Ok(Value::Int(age / 10 * 10))
        }),
        Operation::sort([SortKey::desc("age")]),
    ];
    let source = people();
    let ctx = ExecutionContext::new();

    let first = run_pipeline(&ops, &source, &people_schema(), &ctx).unwrap();
    let second = run_pipeline(&ops, &source, &people_schema(), &ctx).unwrap();

    assert_eq!(first.records, second.records);
    assert_eq!(first.schema, second.schema);
    assert_eq!(first.stats.output_records, second.stats.output_records);
    assert_eq!(first.stats.filtered_count, second.stats.filtered_count);
    assert_eq!(source, people(), "source must be untouched");
}

#[test]
fn test_group_counts_cover_every_record() {
    let inputs: Vec<Vec<Record>> = vec![
        Vec::new(),
        people(),
        (0..50)
            .map(|i| Record::from([("bucket", Value::from(i % 7)), ("v", Value::from(i))]))
            .collect(),
    ];

    for (idx, input) in inputs.iter().enumerate() {
        let key = if idx == 2 { "bucket" } else { "age" };
        let ops = vec![Operation::group_by([key], [("count", Aggregate::count())])];
        let output =
            run_pipeline(&ops, input, &Schema::default(), &ExecutionContext::new()).unwrap();
        let total: i64 = output
            .records
            .iter()
            .filter_map(|r| r.get("count").and_then(Value::as_i64))
            .sum();
        assert_eq!(usize::try_from(total).unwrap(), input.len());
    }
}

#[test]
fn test_group_by_region() {
    let records: Vec<Record> = ["North", "North", "South", "East", "East"]
        .into_iter()
        .zip([10, 20, 30, 40, 50])
        .map(|(region, amount)| {
            Record::from([("region", Value::from(region)), ("amount", Value::from(amount))])
        })
        .collect();
    let ops = vec![Operation::group_by(
        ["region"],
        [("total", Aggregate::sum("amount")), ("count", Aggregate::count())],
    )];

    let output = run_pipeline(
        &ops,
        &records,
        &Schema::new(["region", "amount"]),
        &ExecutionContext::new(),
    )
    .unwrap();

    let summary: Vec<(String, i64, i64)> = output
        .records
        .iter()
        .map(|r| {
            (
                r.get("region").and_then(Value::as_str).unwrap().to_owned(),
                r.get("total").and_then(Value::as_i64).unwrap(),
                r.get("count").and_then(Value::as_i64).unwrap(),
            )
        })
        .collect();
    assert_eq!(
        summary,
        [
            ("North".to_owned(), 30, 2),
            ("South".to_owned(), 30, 1),
            ("East".to_owned(), 90, 2),
        ]
    );
    assert_eq!(output.schema.columns(), ["region", "total", "count"]);
}

#[test]
fn test_limit_boundaries() {
    let ctx = ExecutionContext::new();

    let none = run_pipeline(&[Operation::limit(0)], &people(), &people_schema(), &ctx).unwrap();
    assert!(none.records.is_empty());

    let ops = vec![Operation::sort([SortKey::desc("age")]), Operation::limit(10)];
    let all = run_pipeline(&ops, &people(), &people_schema(), &ctx).unwrap();
    assert_eq!(names(&all.records), ["Alice", "Charlie", "Bob"]);
}

#[test]
fn test_negative_limit_never_applies() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let ops = vec![
        Operation::add_column("seen", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Bool(true))
        }),
        Operation::limit(-1),
    ];

    let err = run_pipeline(&ops, &people(), &people_schema(), &ExecutionContext::new())
        .unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(err.stage, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(err.stats.stages_completed(), 0);
}

#[test]
fn test_cancelled_before_start() {
    let token = CancellationToken::new();
    token.cancel();
    let ctx = ExecutionContext::new().with_token(token);

    let ops = vec![adults(), Operation::sort([SortKey::asc("name")])];
    let err = run_pipeline(&ops, &people(), &people_schema(), &ctx).unwrap_err();

    assert!(err.is_cancellation());
    assert!(matches!(err.cause, OperationError::Cancelled));
    assert_eq!(err.stage, 0);
}

#[test]
fn test_cancelled_mid_stage() {
    let token = CancellationToken::new();
    let trigger = token.clone();
    let config = rowpipe::config::PipelineConfig {
        cancel_check_interval: 1,
        ..Default::default()
    };
    let ctx = ExecutionContext::new().with_token(token).with_config(config);

    let ops = vec![
        Operation::sort([SortKey::asc("name")]),
        Operation::filter(move |r| {
            if r.get("name") == Some(&Value::from("Alice")) {
                trigger.cancel();
            }
            true
        }),
        Operation::limit(1),
    ];
    let err = run_pipeline(&ops, &people(), &people_schema(), &ctx).unwrap_err();

    assert!(err.is_cancellation());
    assert_eq!(err.stage, 1);
    assert_eq!(err.stats.stages_completed(), 1);
}

#[test]
fn test_cancelled_inside_group_by() {
    let token = CancellationToken::new();
    let trigger = token.clone();
    let config = rowpipe::config::PipelineConfig {
        cancel_check_interval: 1,
        ..Default::default()
    };
    let ctx = ExecutionContext::new().with_token(token).with_config(config);

    let ops = vec![
        Operation::sort([SortKey::asc("name")]),
        Operation::group_by(
            ["age"],
            [(
                "stop",
                Aggregate::custom("stop", None, move |_, _| {
                    trigger.cancel();
                    Ok(Value::Null)
                }),
            )],
        ),
        Operation::limit(1),
    ];
    let err = run_pipeline(&ops, &people(), &people_schema(), &ctx).unwrap_err();

    assert!(err.is_cancellation());
    assert_eq!(err.stage, 1);
    assert_eq!(err.operation, "group_by");
    assert_eq!(err.stats.stages_completed(), 1);
}

#[test]
fn test_panicking_callback_stops_the_chain() {
    let later = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&later);
    let ops = vec![
        Operation::add_column("checked", |r| {
            assert!(r.get("name") != Some(&Value::from("Charlie")), "boom");
            Ok(Value::Bool(true))
        }),
        Operation::filter(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        }),
    ];
    let err = run_pipeline(&ops, &people(), &people_schema(), &ExecutionContext::new())
        .unwrap_err();

    assert!(matches!(
        err.cause,
        OperationError::CallbackPanicked {
            record_index: Some(2),
            ..
        }
    ));
    assert_eq!(err.stage, 0);
    assert_eq!(err.context.get("record_index").map(String::as_str), Some("2"));
    assert_eq!(later.load(Ordering::SeqCst), 0);
    assert_eq!(err.to_string(), "Stage 0 (add_column) failed: Callback panicked on record 2: boom");
}

#[test]
fn test_missing_sort_column_context() {
    let ops = vec![adults(), Operation::sort([SortKey::asc("grade")])];
    let err = run_pipeline(&ops, &people(), &people_schema(), &ExecutionContext::new())
        .unwrap_err();

    assert!(!err.is_configuration());
    assert_eq!(err.stage, 1);
    assert_eq!(err.operation, "sort");
    assert_eq!(err.context.get("column").map(String::as_str), Some("grade"));
    assert_eq!(err.stats.stages_completed(), 1);
    assert_eq!(err.stats.filtered_count, 1);
    assert_eq!(
        err.to_string(),
        "Stage 1 (sort) failed: Record 0 has no column 'grade'"
    );
}

#[test]
fn test_failing_callback_is_reported() {
    let ops = vec![Operation::add_column("ratio", |r| {
        let age = r.get("age").and_then(Value::as_i64).unwrap_or_default();
        anyhow::ensure!(age >= 18, "minor in input");
        Ok(Value::Int(age))
    })];
    let err = run_pipeline(&ops, &people(), &people_schema(), &ExecutionContext::new())
        .unwrap_err();

    assert_eq!(err.context.get("record_index").map(String::as_str), Some("1"));
    let source = std::error::Error::source(&err).unwrap();
    assert!(source.to_string().contains("minor in input"));
}

#[test]
fn test_spec_fixture_on_table() {
    let spec = PipelineSpec::from_file("testdata/adults_by_dept.json").unwrap();
    let input: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string("testdata/people.json").unwrap()).unwrap();
    let records: Vec<Record> = serde_json::from_value(input["records"].clone()).unwrap();
    let schema: Schema = serde_json::from_value(input["columns"].clone()).unwrap();

    let table = Table::new(schema, records).with_pipeline(spec.build_pipeline().unwrap());
    let out = table.transform(&ExecutionContext::new()).unwrap();

    let depts: Vec<_> = out
        .records
        .iter()
        .filter_map(|r| r.get("dept").and_then(Value::as_str))
        .collect();
    assert_eq!(depts, ["eng", "hr", "ops"]);
    assert_eq!(out.records[0].get("avg_age"), Some(&Value::Float(27.5)));
    assert_eq!(out.records[0].get("oldest"), Some(&Value::Int(30)));

    let stats = out.transform_stats().unwrap();
    assert_eq!(stats.input_records, 5);
    assert_eq!(stats.filtered_count, 1);
    assert_eq!(stats.output_records, 3);
}
