//! Validación de entradas de ejecución contra un `InputSchema`.
//!
//! Independiente del validador de modelos: quien arma una ejecución la
//! invoca antes de llamar al motor. Los campos no declarados se ignoran y
//! se reportan como warning.
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use super::ValidationReport;
use crate::errors::DslError;
use crate::model::{FieldType, InputField, InputSchema};
use crate::value::Value;

/// Patrones ya compilados; un mismo esquema se valida en cada ejecución.
static PATTERNS: Lazy<Mutex<HashMap<String, Result<Regex, String>>>> = Lazy::new(|| Mutex::new(HashMap::new()));

fn compiled_pattern(pattern: &str) -> Result<Regex, String> {
    let mut cache = PATTERNS.lock().unwrap_or_else(PoisonError::into_inner);
    cache.entry(pattern.to_string())
         .or_insert_with(|| Regex::new(pattern).map_err(|e| e.to_string()))
         .clone()
}

fn field_error(field: &str, message: impl Into<String>) -> DslError {
    DslError::InputSchemaValidation { field: field.to_string(),
                                      message: message.into() }
}

fn type_matches(field_type: FieldType, v: &Value) -> bool {
    match field_type {
        FieldType::Number => matches!(v, Value::Number(n) if n.is_finite()),
        FieldType::Integer => matches!(v, Value::Number(n) if n.is_finite() && n.fract() == 0.0),
        FieldType::String => matches!(v, Value::String(_)),
        // Lo decide la lista de opciones.
        FieldType::Select => true,
        FieldType::Boolean => matches!(v, Value::Bool(_)),
        FieldType::Date => v.as_str().is_some_and(|s| fin_domain::parse_date(s).is_ok()),
        FieldType::Array => v.is_sequence(),
    }
}

fn check_field(field: &InputField, v: &Value, errors: &mut Vec<DslError>) {
    if !type_matches(field.field_type, v) {
        let expected = match field.field_type {
            FieldType::Date => "date (YYYY-MM-DD)",
            other => other.as_str(),
        };
        errors.push(field_error(&field.name, format!("expected {expected}, got {}", v.kind_name())));
        return;
    }

    if let Value::Number(n) = v {
        if let Some(min) = field.min {
            if *n < min {
                errors.push(field_error(&field.name, format!("{n} is below the minimum {min}")));
            }
        }
        if let Some(max) = field.max {
            if *n > max {
                errors.push(field_error(&field.name, format!("{n} is above the maximum {max}")));
            }
        }
    }

    if let (Some(pattern), Value::String(s)) = (&field.pattern, v) {
        match compiled_pattern(pattern) {
            Ok(re) if !re.is_match(s) => {
                errors.push(field_error(&field.name, format!("'{s}' does not match pattern {pattern}")));
            }
            Ok(_) => {}
            Err(e) => errors.push(field_error(&field.name, format!("invalid pattern {pattern}: {e}"))),
        }
    }

    if let Some(options) = &field.options {
        if !options.contains(v) {
            let allowed: Vec<String> = options.iter().map(|o| o.to_json().to_string()).collect();
            errors.push(field_error(&field.name,
                                    format!("{} is not one of the allowed options: {}", v.to_json(), allowed.join(", "))));
        }
    } else if field.field_type == FieldType::Select {
        errors.push(field_error(&field.name, "select field declares no options"));
    }
}

pub fn validate_inputs(inputs: &IndexMap<String, Value>, schema: &InputSchema) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for field in &schema.fields {
        match inputs.get(&field.name) {
            None | Some(Value::Null) => {
                if field.required && field.default.is_none() {
                    errors.push(field_error(&field.name, "is required"));
                }
            }
            Some(v) => check_field(field, v, &mut errors),
        }
    }

    for name in inputs.keys() {
        if schema.field(name).is_none() {
            warnings.push(format!("input '{name}' is not declared in the schema and will be ignored"));
        }
    }

    ValidationReport::new(errors, warnings)
}

/// Completa los campos ausentes con su `default`. No toca los presentes.
pub fn apply_defaults(inputs: &IndexMap<String, Value>, schema: &InputSchema) -> IndexMap<String, Value> {
    let mut out = inputs.clone();
    for field in &schema.fields {
        if let Some(default) = &field.default {
            let missing = matches!(out.get(&field.name), None | Some(Value::Null));
            if missing {
                out.insert(field.name.clone(), default.clone());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> InputSchema {
        InputSchema::new(vec![InputField::new("symbol", FieldType::String).required().with_pattern("^[A-Z]{1,5}$"),
                              InputField::new("window", FieldType::Integer).with_bounds(Some(2.0), Some(200.0)).with_default(20.0),
                              InputField::new("start", FieldType::Date),
                              InputField::new("side", FieldType::Select).with_options(["call", "put"])])
    }

    fn inputs(pairs: Vec<(&str, Value)>) -> IndexMap<String, Value> {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn accepts_well_formed_inputs() {
        let report = validate_inputs(&inputs(vec![("symbol", Value::from("SPY")),
                                                  ("window", Value::Number(50.0)),
                                                  ("start", Value::from("2024-01-02")),
                                                  ("side", Value::from("put"))]),
                                     &schema());
        assert!(report.valid, "{:?}", report.errors);
    }

    #[test]
    fn reports_every_problem() {
        let report = validate_inputs(&inputs(vec![("window", Value::Number(2.5)),
                                                  ("start", Value::from("Jan 2")),
                                                  ("side", Value::from("straddle")),
                                                  ("extra", Value::Bool(true))]),
                                     &schema());
        let msgs = report.error_messages();
        assert_eq!(msgs.len(), 4, "{msgs:?}");
        assert!(msgs.contains(&"input 'symbol': is required".to_string()));
        assert!(msgs.contains(&"input 'window': expected integer, got number".to_string()));
        assert!(msgs.iter().any(|m| m.starts_with("input 'start': expected date")));
        assert!(msgs.iter().any(|m| m.contains("not one of the allowed options")));
        assert_eq!(report.warnings, vec!["input 'extra' is not declared in the schema and will be ignored".to_string()]);
    }

    #[test]
    fn bounds_and_pattern() {
        let report = validate_inputs(&inputs(vec![("symbol", Value::from("spy!")), ("window", Value::Number(500.0))]), &schema());
        let msgs = report.error_messages();
        assert!(msgs.iter().any(|m| m.contains("does not match pattern")));
        assert!(msgs.iter().any(|m| m.contains("above the maximum 200")));
    }

    #[test]
    fn defaults_fill_missing_fields_only() {
        let filled = apply_defaults(&inputs(vec![("symbol", Value::from("SPY"))]), &schema());
        assert_eq!(filled.get("window"), Some(&Value::Number(20.0)));
        let kept = apply_defaults(&inputs(vec![("window", Value::Number(5.0))]), &schema());
        assert_eq!(kept.get("window"), Some(&Value::Number(5.0)));
    }

    #[test]
    fn patterns_compile_once_and_report_invalid_ones() {
        for _ in 0..2 {
            let report = validate_inputs(&inputs(vec![("symbol", Value::from("QQQ"))]), &schema());
            assert!(report.valid, "{:?}", report.errors);
        }
        assert!(PATTERNS.lock().unwrap().get("^[A-Z]{1,5}$").is_some_and(Result::is_ok));

        let broken = InputSchema::new(vec![InputField::new("code", FieldType::String).with_pattern("([A-Z")]);
        for _ in 0..2 {
            let report = validate_inputs(&inputs(vec![("code", Value::from("AB"))]), &broken);
            let msgs = report.error_messages();
            assert_eq!(msgs.len(), 1, "{msgs:?}");
            assert!(msgs[0].starts_with("input 'code': invalid pattern ([A-Z:"), "{msgs:?}");
        }
    }
}
