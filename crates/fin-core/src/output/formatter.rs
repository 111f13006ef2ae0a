//! Formateador de salidas.
//!
//! Cada declaración resuelve su `source` (`"step"` o `"step.campo.0"`)
//! contra los resultados. Una ruta irresoluble es un error; un valor con
//! forma inesperada sólo degrada la salida y deja un warning.
use chrono::{DateTime, NaiveDate, Utc};

use super::types::{ColumnDef, Output, OutputMetadata, ScalarOutput, SeriesOutput, TableOutput};
use crate::engine::StepResults;
use crate::errors::DslError;
use crate::model::{OutputDefinition, ScalarDef, SeriesDef, TableDef};
use crate::value::{Record, Value};

/// Navega `source` por segmentos separados por `.`.
pub fn resolve_source(results: &StepResults, source: &str) -> Result<Value, DslError> {
    let mut segments = source.split('.');
    let head = segments.next().unwrap_or_default();
    let mut current = results.get(head)
                             .cloned()
                             .ok_or_else(|| DslError::OutputResolution { path: head.to_string(),
                                                                         message: "no result for step".into() })?;
    let mut walked = head.to_string();
    for seg in segments {
        walked.push('.');
        walked.push_str(seg);
        current = current.child(seg)
                         .ok_or_else(|| DslError::OutputResolution { path: walked.clone(),
                                                                     message: format!("no field or index '{seg}'") })?;
    }
    Ok(current)
}

/// `"close_price"` / `"closePrice"` -> `"Close Price"`.
pub fn title_case(key: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for ch in key.chars() {
        if ch == '_' || ch == '-' || ch == ' ' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        current.push(ch);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words.iter()
         .map(|w| {
             let mut chars = w.chars();
             match chars.next() {
                 Some(first) => first.to_uppercase().chain(chars).collect(),
                 None => String::new(),
             }
         })
         .collect::<Vec<String>>()
         .join(" ")
}

fn looks_like_date(s: &str) -> bool {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() || DateTime::parse_from_rfc3339(s).is_ok()
}

fn guess_type(v: Option<&Value>) -> &'static str {
    match v {
        Some(Value::Number(_)) => "number",
        Some(Value::Bool(_)) => "boolean",
        Some(Value::String(s)) if looks_like_date(s) => "date",
        _ => "string",
    }
}

fn is_point(v: &Value) -> bool {
    match v {
        Value::Record(r) => {
            (r.contains_key("x") && r.contains_key("y"))
            || ((r.contains_key("index") || r.contains_key("date")) && r.contains_key("value"))
        }
        _ => false,
    }
}

fn point(index: usize, value: f64) -> Value {
    Value::record([("index", Value::Number(index as f64)), ("value", Value::Number(value))])
}

fn format_series(def: &SeriesDef, value: Value, warnings: &mut Vec<String>) -> SeriesOutput {
    let data = match value {
        Value::List(items) if !items.is_empty() && items.iter().all(is_point) => items,
        other => match other.as_series() {
            Some(values) => values.iter().enumerate().map(|(i, &v)| point(i, v)).collect(),
            None => {
                warnings.push(format!("series '{}' source '{}' is a {}, not a numeric sequence; emitted empty",
                                      def.id,
                                      def.source,
                                      other.shape()));
                Vec::new()
            }
        },
    };
    SeriesOutput { id: def.id.clone(),
                   label: def.label.clone(),
                   color: def.color.clone(),
                   series_type: def.series_type.clone(),
                   data }
}

fn format_table(def: &TableDef, value: Value, warnings: &mut Vec<String>) -> TableOutput {
    let rows: Vec<Record> = match value {
        Value::List(items) if items.iter().all(|v| matches!(v, Value::Record(_))) => {
            items.into_iter()
                 .filter_map(|v| match v {
                     Value::Record(r) => Some(r),
                     _ => None,
                 })
                 .collect()
        }
        // Secuencia vacía: tabla vacía sin warning.
        Value::Series(s) if s.is_empty() => Vec::new(),
        other => {
            warnings.push(format!("table '{}' source '{}' is a {}, not a list of rows; emitted empty",
                                  def.id,
                                  def.source,
                                  other.shape()));
            Vec::new()
        }
    };

    let keys: Vec<String> = match &def.columns {
        Some(cols) => cols.clone(),
        None => rows.first().map(|r| r.keys().cloned().collect()).unwrap_or_default(),
    };
    let columns = keys.into_iter()
                      .map(|key| {
                          let sample = rows.iter().find_map(|r| r.get(&key).filter(|v| !matches!(v, Value::Null)));
                          ColumnDef { label: title_case(&key),
                                      column_type: guess_type(sample).to_string(),
                                      key }
                      })
                      .collect();
    TableOutput { id: def.id.clone(),
                  label: def.label.clone(),
                  columns,
                  rows }
}

fn format_scalar(def: &ScalarDef, value: Value, warnings: &mut Vec<String>) -> ScalarOutput {
    let value = match value {
        v @ (Value::Number(_) | Value::String(_)) => v,
        other if other.seq_len() == Some(1) => match other.seq_get(0) {
            Some(v @ (Value::Number(_) | Value::String(_))) => v,
            _ => {
                warnings.push(format!("scalar '{}' source '{}' is not a number or string", def.id, def.source));
                Value::Number(f64::NAN)
            }
        },
        other => {
            warnings.push(format!("scalar '{}' source '{}' is a {}, not a number or string",
                                  def.id,
                                  def.source,
                                  other.shape()));
            Value::Number(f64::NAN)
        }
    };
    ScalarOutput { id: def.id.clone(),
                   label: def.label.clone(),
                   value,
                   format: def.format.clone() }
}

pub fn format_outputs(results: &StepResults, def: &OutputDefinition) -> Result<Output, DslError> {
    let mut warnings = Vec::new();

    let series = match &def.series {
        Some(defs) => {
            let mut out = Vec::with_capacity(defs.len());
            for d in defs {
                out.push(format_series(d, resolve_source(results, &d.source)?, &mut warnings));
            }
            Some(out)
        }
        None => None,
    };
    let tables = match &def.tables {
        Some(defs) => {
            let mut out = Vec::with_capacity(defs.len());
            for d in defs {
                out.push(format_table(d, resolve_source(results, &d.source)?, &mut warnings));
            }
            Some(out)
        }
        None => None,
    };
    let scalars = match &def.scalars {
        Some(defs) => {
            let mut out = Vec::with_capacity(defs.len());
            for d in defs {
                out.push(format_scalar(d, resolve_source(results, &d.source)?, &mut warnings));
            }
            Some(out)
        }
        None => None,
    };

    Ok(Output { series,
                tables,
                scalars,
                metadata: OutputMetadata { computed_at: Utc::now(),
                                           data_sources: Vec::new(),
                                           warnings } })
}
