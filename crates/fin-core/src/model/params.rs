//! Parámetros de step.
//!
//! En el JSON de autoría una cadena que empieza por `$` es una referencia a
//! variable (`"$symbol"`), y `$$` escapa un literal que empieza por `$`.
//! El prefijo se interpreta una sola vez al deserializar: a partir de ahí
//! el motor trabaja con `ParamValue` y nunca vuelve a mirar cadenas.
use indexmap::IndexMap;
use serde::de::Deserializer;
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

use crate::constants::VARIABLE_MARKER;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Valor fijo (ya sin referencias).
    Literal(Value),
    /// Referencia a una variable de `ExecutionContext::inputs`.
    Variable(String),
    /// Lista que contiene al menos una referencia.
    List(Vec<ParamValue>),
    /// Objeto que contiene al menos una referencia.
    Nested(IndexMap<String, ParamValue>),
}

impl ParamValue {
    pub fn literal(value: impl Into<Value>) -> Self {
        ParamValue::Literal(value.into())
    }

    pub fn variable(name: impl Into<String>) -> Self {
        ParamValue::Variable(name.into())
    }

    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            ParamValue::Literal(v) => Some(v),
            _ => None,
        }
    }

    /// Nombres de variables referenciadas (en orden de aparición).
    pub fn variables(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            ParamValue::Literal(_) => {}
            ParamValue::Variable(name) => out.push(name),
            ParamValue::List(items) => items.iter().for_each(|p| p.collect_variables(out)),
            ParamValue::Nested(map) => map.values().for_each(|p| p.collect_variables(out)),
        }
    }

    /// Interpreta JSON de autoría.
    pub fn from_json(json: serde_json::Value) -> ParamValue {
        match json {
            serde_json::Value::String(s) => parse_marked(s),
            serde_json::Value::Array(items) => {
                let parsed: Vec<ParamValue> = items.into_iter().map(ParamValue::from_json).collect();
                if parsed.iter().all(|p| matches!(p, ParamValue::Literal(_))) {
                    ParamValue::Literal(Value::from_items(parsed.into_iter()
                                                                .filter_map(|p| match p {
                                                                    ParamValue::Literal(v) => Some(v),
                                                                    _ => None,
                                                                })
                                                                .collect()))
                } else {
                    ParamValue::List(parsed)
                }
            }
            serde_json::Value::Object(map) => {
                let parsed: IndexMap<String, ParamValue> = map.into_iter().map(|(k, v)| (k, ParamValue::from_json(v))).collect();
                if parsed.values().all(|p| matches!(p, ParamValue::Literal(_))) {
                    ParamValue::Literal(Value::Record(parsed.into_iter()
                                                            .filter_map(|(k, p)| match p {
                                                                ParamValue::Literal(v) => Some((k, v)),
                                                                _ => None,
                                                            })
                                                            .collect()))
                } else {
                    ParamValue::Nested(parsed)
                }
            }
            other => ParamValue::Literal(Value::from_json(other)),
        }
    }

    /// JSON de autoría equivalente (re-escapa literales con `$`).
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ParamValue::Literal(v) => escape_marked(v.to_json()),
            ParamValue::Variable(name) => serde_json::Value::String(format!("{VARIABLE_MARKER}{name}")),
            ParamValue::List(items) => serde_json::Value::Array(items.iter().map(ParamValue::to_json).collect()),
            ParamValue::Nested(map) => serde_json::Value::Object(map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()),
        }
    }
}

/// Inverso de `parse_marked` a cualquier profundidad de un literal.
fn escape_marked(json: serde_json::Value) -> serde_json::Value {
    match json {
        serde_json::Value::String(s) if s.starts_with(VARIABLE_MARKER) => serde_json::Value::String(format!("{VARIABLE_MARKER}{s}")),
        serde_json::Value::Array(items) => serde_json::Value::Array(items.into_iter().map(escape_marked).collect()),
        serde_json::Value::Object(map) => serde_json::Value::Object(map.into_iter().map(|(k, v)| (k, escape_marked(v))).collect()),
        other => other,
    }
}

fn parse_marked(s: String) -> ParamValue {
    match s.strip_prefix(VARIABLE_MARKER) {
        Some(rest) if rest.starts_with(VARIABLE_MARKER) => ParamValue::Literal(Value::String(rest.to_string())),
        Some(rest) => ParamValue::Variable(rest.to_string()),
        None => ParamValue::Literal(Value::String(s)),
    }
}

impl Serialize for ParamValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ParamValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            ParamValue::Nested(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            other => other.to_json().serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ParamValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(ParamValue::from_json)
    }
}

/// Mapa de parámetros de un step (orden de autoría preservado).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepParams(pub IndexMap<String, ParamValue>);

impl StepParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: ParamValue) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    /// Literal asociado a `key`, si existe y no depende de variables.
    pub fn literal(&self, key: &str) -> Option<&Value> {
        self.get(key).and_then(ParamValue::as_literal)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
