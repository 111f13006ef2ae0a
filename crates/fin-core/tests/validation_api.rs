use fin_core::errors::DslError;
use fin_core::{apply_defaults, list_primitives, validate_dsl_model, validate_inputs, Model, Value};
use indexmap::IndexMap;
use serde_json::json;

fn model(doc: serde_json::Value) -> Model {
    serde_json::from_value(doc).expect("model json")
}

#[test]
fn reports_every_problem_at_once() {
    let m = model(json!({
        "version": "2.0",
        "steps": [
            {"id": "Bad-Id", "operation": "mean", "params": {"values": [1, 2]}},
            {"id": "roll", "operation": "rolling_mean", "params": {"window": 0}, "inputs": ["later"]},
            {"id": "later", "operation": "teleport"}
        ],
        "outputs": {"series": [{"id": "s", "label": "", "source": "nowhere", "type": "pie"}]}
    }));
    let report = validate_dsl_model(&m);
    assert!(!report.valid);
    let messages = report.joined_errors();
    assert!(messages.contains("unsupported version '2.0'"));
    assert!(messages.contains("invalid step id 'Bad-Id'"));
    assert!(messages.contains("declared later"));
    assert!(messages.contains("unknown operation 'teleport'"));
    assert!(messages.contains("is missing a label"));
    assert!(messages.contains("invalid type 'pie'"));
    assert!(report.errors.iter().any(|e| matches!(e, DslError::PrimitiveParam { step_id, .. } if step_id == "roll")));
    assert!(report.errors.iter().any(|e| matches!(e, DslError::UnknownStepReference { reference, .. } if reference == "nowhere")));
}

#[test]
fn unknown_operation_lists_valid_names() {
    let m = model(json!({
        "version": "1.0",
        "steps": [{"id": "x", "operation": "teleport"}],
        "outputs": {"scalars": [{"id": "x", "label": "X", "source": "x"}]}
    }));
    let report = validate_dsl_model(&m);
    match report.errors.as_slice() {
        [DslError::UnknownOperation { valid, .. }] => {
            let expected: Vec<String> = list_primitives().into_iter().map(String::from).collect();
            assert_eq!(valid, &expected);
        }
        other => panic!("unexpected errors: {other:?}"),
    }
}

#[test]
fn oversized_models_only_warn() {
    let mut steps = vec![json!({"id": "s0", "operation": "abs", "params": {"values": [1]}})];
    for i in 1..=50 {
        steps.push(json!({"id": format!("s{i}"), "operation": "abs", "inputs": [format!("s{}", i - 1)]}));
    }
    let m = model(json!({
        "version": "1.0",
        "steps": steps,
        "outputs": {"series": [{"id": "o", "label": "O", "source": "s50"}]}
    }));
    let report = validate_dsl_model(&m);
    assert!(report.valid, "{}", report.joined_errors());
    assert!(report.warnings.iter().any(|w| w.contains("51 steps")));
}

#[test]
fn schema_declared_in_model_drives_input_checks() {
    let m = model(json!({
        "version": "1.0",
        "inputSchema": {"fields": [
            {"name": "symbol", "type": "string", "required": true},
            {"name": "window", "type": "integer", "min": 2, "default": 20}
        ]},
        "steps": [{"id": "bars", "operation": "rolling_mean", "params": {"values": "$prices", "window": "$window"}}],
        "outputs": {"series": [{"id": "o", "label": "O", "source": "bars"}]}
    }));
    let report = validate_dsl_model(&m);
    assert!(report.valid);
    assert!(report.warnings.contains(&"variable 'prices' is not declared in the input schema".to_string()));

    let schema = m.input_schema.as_ref().unwrap();
    let mut inputs = IndexMap::new();
    inputs.insert("window".to_string(), Value::Number(1.0));
    let checked = validate_inputs(&inputs, schema);
    assert!(!checked.valid);
    assert_eq!(checked.errors.len(), 2);

    inputs.shift_remove("window");
    inputs.insert("symbol".to_string(), Value::from("SPY"));
    let filled = apply_defaults(&inputs, schema);
    assert_eq!(filled.get("window"), Some(&Value::Number(20.0)));
    assert!(validate_inputs(&filled, schema).valid);
}
