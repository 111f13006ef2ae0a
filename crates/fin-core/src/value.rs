//! Valor de tiempo de ejecución intercambiado entre steps.
//!
//! Un step produce un escalar, una secuencia numérica o un registro
//! estructurado. `f64::NAN` es el centinela "no definido": se propaga en
//! lugar de producir errores y se serializa como `null` en JSON.
use indexmap::IndexMap;
use serde::de::Deserializer;
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

pub type Record = IndexMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// Secuencia numérica ordenada (posiciones indefinidas = NaN).
    Series(Vec<f64>),
    /// Secuencia heterogénea (registros, etiquetas de fecha, ...).
    List(Vec<Value>),
    /// Registro con orden de claves estable.
    Record(Record),
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Series(_) => "series",
            Value::List(_) => "list",
            Value::Record(_) => "record",
        }
    }

    /// Descripción corta de la forma del valor, para trazas y warnings.
    pub fn shape(&self) -> String {
        match self {
            Value::Series(v) => format!("series[{}]", v.len()),
            Value::List(v) => format!("list[{}]", v.len()),
            Value::Record(m) => {
                let keys: Vec<&str> = m.keys().map(String::as_str).collect();
                format!("record{{{}}}", keys.join(","))
            }
            other => other.kind_name().to_string(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    /// Vista numérica: `Series` se presta; una `List` de números/nulls se
    /// convierte (null => NaN). Cualquier otra cosa => `None`.
    pub fn as_series(&self) -> Option<Cow<'_, [f64]>> {
        match self {
            Value::Series(v) => Some(Cow::Borrowed(v.as_slice())),
            Value::List(items) => items.iter()
                                       .map(|v| match v {
                                           Value::Number(n) => Some(*n),
                                           Value::Null => Some(f64::NAN),
                                           _ => None,
                                       })
                                       .collect::<Option<Vec<f64>>>()
                                       .map(Cow::Owned),
            _ => None,
        }
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Value::Series(_) | Value::List(_))
    }

    /// Longitud de una secuencia (`Series` o `List`).
    pub fn seq_len(&self) -> Option<usize> {
        match self {
            Value::Series(v) => Some(v.len()),
            Value::List(v) => Some(v.len()),
            _ => None,
        }
    }

    /// Elemento `i` de una secuencia como `Value`.
    pub fn seq_get(&self, i: usize) -> Option<Value> {
        match self {
            Value::Series(v) => v.get(i).map(|n| Value::Number(*n)),
            Value::List(v) => v.get(i).cloned(),
            _ => None,
        }
    }

    /// Navega un segmento: clave de registro o índice numérico de secuencia.
    pub fn child(&self, segment: &str) -> Option<Value> {
        match self {
            Value::Record(r) => r.get(segment).cloned(),
            Value::Series(_) | Value::List(_) => segment.parse::<usize>().ok().and_then(|i| self.seq_get(i)),
            _ => None,
        }
    }

    pub fn record<I, K>(entries: I) -> Value
        where I: IntoIterator<Item = (K, Value)>,
              K: Into<String>
    {
        Value::Record(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Agrupa elementos en una secuencia: números/nulls => `Series`, resto => `List`.
    pub fn from_items(items: Vec<Value>) -> Value {
        let numeric = items.iter().all(|v| matches!(v, Value::Number(_) | Value::Null));
        let any_number = items.iter().any(|v| matches!(v, Value::Number(_)));
        if items.is_empty() || (numeric && any_number) {
            Value::Series(items.iter().map(|v| v.as_f64().unwrap_or(f64::NAN)).collect())
        } else {
            Value::List(items)
        }
    }

    /// Conversión desde JSON genérico.
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::from_items(items.into_iter().map(Value::from_json).collect()),
            serde_json::Value::Object(map) => Value::Record(map.into_iter().map(|(k, v)| (k, Value::from_json(v))).collect()),
        }
    }

    /// Conversión a JSON genérico (NaN/inf => null).
    pub fn to_json(&self) -> serde_json::Value {
        fn num(n: f64) -> serde_json::Value {
            serde_json::Number::from_f64(n).map(serde_json::Value::Number).unwrap_or(serde_json::Value::Null)
        }
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => num(*n),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Series(v) => serde_json::Value::Array(v.iter().map(|n| num(*n)).collect()),
            Value::List(v) => serde_json::Value::Array(v.iter().map(Value::to_json).collect()),
            Value::Record(r) => serde_json::Value::Object(r.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()),
        }
    }

    /// Convierte cualquier tipo serializable (p.ej. registros de dominio).
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Value, serde_json::Error> {
        serde_json::to_value(value).map(Value::from_json)
    }
}

fn finite_or_none(n: f64) -> Option<f64> {
    n.is_finite().then_some(n)
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => match finite_or_none(*n) {
                Some(n) => serializer.serialize_f64(n),
                None => serializer.serialize_none(),
            },
            Value::String(s) => serializer.serialize_str(s),
            Value::Series(v) => {
                let mut seq = serializer.serialize_seq(Some(v.len()))?;
                for n in v {
                    seq.serialize_element(&finite_or_none(*n))?;
                }
                seq.end()
            }
            Value::List(v) => {
                let mut seq = serializer.serialize_seq(Some(v.len()))?;
                for item in v {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Record(r) => {
                let mut map = serializer.serialize_map(Some(r.len()))?;
                for (k, v) in r {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from_json)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::Series(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(r)
    }
}
