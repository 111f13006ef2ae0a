use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use fin_core::errors::DslError;
use fin_core::{execute_dsl, DslEngine, ExecutionContext, Model, RunEventKind, Value};
use fin_providers::fixtures::{demo_sources, synthetic_bars};
use fin_providers::memory::InMemoryMarketData;
use serde_json::json;

fn model(doc: serde_json::Value) -> Model {
    serde_json::from_value(doc).expect("model json")
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn returns_model() -> Model {
    model(json!({
        "version": "1.0",
        "steps": [
            {"id": "prices", "operation": "multiply", "params": {"values": "$prices", "value": 1.0}},
            {"id": "changes", "operation": "percent_change", "inputs": ["prices"]},
            {"id": "avg", "operation": "mean", "inputs": ["changes"]}
        ],
        "outputs": {
            "series": [{"id": "chg", "label": "Change", "source": "changes"}],
            "scalars": [{"id": "avg", "label": "Average", "source": "avg", "format": "percent"}]
        }
    }))
}

#[tokio::test]
async fn percent_change_feeds_outputs() {
    let ctx = ExecutionContext::new().with_input("prices", vec![100.0, 110.0, 99.0]);
    let result = execute_dsl(&returns_model(), &ctx).await;
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.steps_executed, 3);

    let output = result.output.unwrap();
    let data = &output.series("chg").unwrap().data;
    assert!(data[0].child("value").unwrap().as_f64().unwrap().is_nan());
    assert!(close(data[1].child("value").unwrap().as_f64().unwrap(), 10.0));
    assert!(close(data[2].child("value").unwrap().as_f64().unwrap(), -10.0));
    assert!(close(output.scalar("avg").unwrap().value.as_f64().unwrap(), 0.0));
    assert!(output.metadata.data_sources.is_empty());
}

#[tokio::test]
async fn steps_run_in_dependency_order() {
    let ctx = ExecutionContext::new().with_input("xs", vec![1.0, 2.0, 3.0])
                                     .with_input("ys", vec![2.0, 4.0, 6.0])
                                     .with_debug(true);
    let m = model(json!({
        "version": "1.0",
        "steps": [
            {"id": "xs", "operation": "multiply", "params": {"values": "$xs", "value": 1}},
            {"id": "ys", "operation": "multiply", "params": {"values": "$ys", "value": 1}},
            {"id": "corr", "operation": "correlation", "inputs": ["xs", "ys"]}
        ],
        "outputs": {"scalars": [{"id": "c", "label": "Correlation", "source": "corr"}]}
    }));
    let result = execute_dsl(&m, &ctx).await;
    assert!(result.success, "{:?}", result.error);
    let trace = result.trace.expect("debug trace");
    assert_eq!(trace.execution_order, vec!["xs", "ys", "corr"]);
    assert!(close(result.output.unwrap().scalar("c").unwrap().value.as_f64().unwrap(), 1.0));
}

#[tokio::test]
async fn repeated_pure_runs_are_deterministic() {
    let ctx = ExecutionContext::new().with_input("prices", vec![100.0, 101.5, 99.0, 104.0, 103.0])
                                     .with_debug(true);
    let m = returns_model();
    let a = execute_dsl(&m, &ctx).await;
    let b = execute_dsl(&m, &ctx).await;
    let fp = |r: &fin_core::ExecutionResult| {
        r.trace.as_ref().and_then(|t| {
                             t.events.iter().find_map(|e| match &e.kind {
                                                RunEventKind::RunCompleted { run_fingerprint } => Some(run_fingerprint.clone()),
                                                _ => None,
                                            })
                         })
    };
    assert!(fp(&a).is_some());
    assert_eq!(fp(&a), fp(&b));
    assert_ne!(a.run_id, b.run_id);
    assert_eq!(a.output.unwrap().series, b.output.unwrap().series);
}

#[tokio::test]
async fn unknown_reference_fails_before_running() {
    let m = model(json!({
        "version": "1.0",
        "steps": [{"id": "avg", "operation": "mean", "inputs": ["ghost"]}],
        "outputs": {"scalars": [{"id": "a", "label": "A", "source": "avg"}]}
    }));
    let result = execute_dsl(&m, &ExecutionContext::new()).await;
    assert!(!result.success);
    assert_eq!(result.steps_executed, 0);
    assert!(result.error.unwrap().contains("unknown step 'ghost'"));
}

#[tokio::test]
async fn two_step_cycle_is_reported() {
    let m = model(json!({
        "version": "1.0",
        "steps": [
            {"id": "a", "operation": "abs", "inputs": ["b"]},
            {"id": "b", "operation": "abs", "inputs": ["a"]}
        ],
        "outputs": {"scalars": [{"id": "x", "label": "X", "source": "a"}]}
    }));
    let result = execute_dsl(&m, &ExecutionContext::new()).await;
    assert!(!result.success);
    assert!(result.failures.iter().any(|e| matches!(e, DslError::CircularDependency { .. })));
}

#[tokio::test]
async fn undefined_variable_names_param_and_variable() {
    let m = model(json!({
        "version": "1.0",
        "steps": [{"id": "roll", "operation": "rolling_mean", "params": {"values": "$prices", "window": 2}}],
        "outputs": {"series": [{"id": "r", "label": "R", "source": "roll"}]}
    }));
    let result = execute_dsl(&m, &ExecutionContext::new()).await;
    assert!(!result.success);
    match result.failures.first() {
        Some(DslError::UndefinedVariable { param, variable, .. }) => {
            assert_eq!(param, "values");
            assert_eq!(variable, "prices");
        }
        other => panic!("unexpected failure: {other:?}"),
    }
}

#[tokio::test]
async fn rolling_mean_over_variable_input() {
    let m = model(json!({
        "version": "1.0",
        "steps": [{"id": "roll", "operation": "rolling_mean", "params": {"values": "$prices", "window": 2}}],
        "outputs": {"series": [{"id": "r", "label": "R", "source": "roll"}]}
    }));
    let ctx = ExecutionContext::new().with_input("prices", vec![1.0, 2.0, 3.0, 4.0]);
    let result = execute_dsl(&m, &ctx).await;
    let output = result.output.expect("output");
    let values: Vec<f64> = output.series("r")
                                 .unwrap()
                                 .data
                                 .iter()
                                 .map(|p| p.child("value").and_then(|v| v.as_f64()).unwrap())
                                 .collect();
    assert!(values[0].is_nan());
    assert_eq!(&values[1..], &[1.5, 2.5, 3.5]);
}

#[tokio::test]
async fn scalar_as_series_degrades_to_warning() {
    let m = model(json!({
        "version": "1.0",
        "steps": [{"id": "total", "operation": "sum", "params": {"values": [1, 2, 3]}}],
        "outputs": {"series": [{"id": "s", "label": "S", "source": "total"}]}
    }));
    let result = execute_dsl(&m, &ExecutionContext::new()).await;
    assert!(result.success);
    let output = result.output.unwrap();
    assert!(output.series("s").unwrap().data.is_empty());
    assert_eq!(output.metadata.warnings.len(), 1);
}

#[tokio::test]
async fn step_failure_is_wrapped_with_step_and_operation() {
    let m = model(json!({
        "version": "1.0",
        "steps": [{"id": "corr", "operation": "correlation", "params": {"values": [1, 2, 3], "other": [1, 2]}}],
        "outputs": {"scalars": [{"id": "c", "label": "C", "source": "corr"}]}
    }));
    let result = execute_dsl(&m, &ExecutionContext::new().with_debug(true)).await;
    assert!(!result.success);
    assert!(result.error.unwrap().starts_with("step 'corr' (correlation) failed"));
    let kinds: Vec<&RunEventKind> = result.trace.as_ref().unwrap().events.iter().map(|e| &e.kind).collect();
    assert!(matches!(kinds.last(), Some(RunEventKind::StepFailed { .. })));
}

#[tokio::test]
async fn timeout_reports_completed_steps() {
    let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let market = InMemoryMarketData::new().with_symbol("SPY", synthetic_bars(start, 20, 100.0, 7))
                                          .with_latency(Duration::from_millis(500));
    let engine = DslEngine::builder().with_market_data(Arc::new(market)).build();
    let m = model(json!({
        "version": "1.0",
        "steps": [
            {"id": "seed", "operation": "abs", "params": {"values": [-1, 2]}},
            {"id": "bars", "operation": "fetch_market_data", "params": {"symbol": "SPY"}},
            {"id": "closes", "operation": "extract_price_series", "inputs": ["bars"]}
        ],
        "outputs": {"series": [{"id": "c", "label": "Close", "source": "closes"}]}
    }));
    let result = engine.execute(&m, &ExecutionContext::new().with_timeout_ms(50)).await;
    assert!(!result.success);
    assert!(result.is_timeout());
    assert_eq!(result.error.as_deref(), Some("execution timed out after 50ms"));
    assert_eq!(result.steps_executed, 1);
    assert!(result.output.is_none());
}

#[tokio::test]
async fn end_to_end_against_demo_sources() {
    let engine = DslEngine::builder().with_sources(demo_sources()).build();
    let m = model(json!({
        "version": "1.0",
        "steps": [
            {"id": "bars", "operation": "fetch_market_data", "params": {"symbol": "$symbol", "lookback_days": 60}},
            {"id": "closes", "operation": "extract_price_series", "inputs": ["bars"]},
            {"id": "dates", "operation": "extract_date_labels", "inputs": ["bars"]},
            {"id": "rets", "operation": "log_return", "inputs": ["closes"]},
            {"id": "vol", "operation": "std", "inputs": ["rets"]},
            {"id": "chain", "operation": "fetch_options_chain", "params": {"symbol": "$symbol"}},
            {"id": "move", "operation": "calculate_expected_move", "inputs": ["chain"]}
        ],
        "outputs": {
            "series": [{"id": "close", "label": "Close", "source": "closes", "type": "line"}],
            "scalars": [
                {"id": "vol", "label": "Volatility", "source": "vol"},
                {"id": "move", "label": "Expected move", "source": "move.expected_move"}
            ]
        }
    }));
    let ctx = ExecutionContext::new().with_input("symbol", "SPY");
    let result = engine.execute(&m, &ctx).await;
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.steps_executed, 7);

    let output = result.output.unwrap();
    assert_eq!(output.series("close").unwrap().data.len(), 60);
    let vol = output.scalar("vol").unwrap().value.as_f64().unwrap();
    assert!(vol > 0.0 && vol.is_finite());
    assert!(matches!(output.scalar("move").unwrap().value, Value::Number(m) if m > 0.0));

    let json = serde_json::to_value(&output).unwrap();
    assert!(json["metadata"]["computed_at"].is_string());
}
