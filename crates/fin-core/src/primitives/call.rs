//! Argumentos de una invocación de primitiva.
use std::borrow::Cow;

use fin_providers::DataSources;
use indexmap::IndexMap;

use crate::errors::PrimitiveError;
use crate::value::Value;

/// Parámetros de un step con las variables ya sustituidas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedParams(IndexMap<String, Value>);

impl ResolvedParams {
    pub fn new(values: IndexMap<String, Value>) -> Self {
        Self(values)
    }

    pub fn from_pairs<I, K>(pairs: I) -> Self
        where I: IntoIterator<Item = (K, Value)>,
              K: Into<String>
    {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// `None` si falta o es `null`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|v| !matches!(v, Value::Null))
    }

    pub fn as_map(&self) -> &IndexMap<String, Value> {
        &self.0
    }

    pub fn f64_opt(&self, name: &str) -> Result<Option<f64>, PrimitiveError> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::Number(n)) => Ok(Some(*n)),
            Some(other) => Err(PrimitiveError::invalid(name, format!("expected a number, got {}", other.kind_name()))),
        }
    }

    pub fn f64_or(&self, name: &str, default: f64) -> Result<f64, PrimitiveError> {
        Ok(self.f64_opt(name)?.unwrap_or(default))
    }

    pub fn f64_req(&self, name: &str) -> Result<f64, PrimitiveError> {
        self.f64_opt(name)?.ok_or_else(|| PrimitiveError::invalid(name, "is required"))
    }

    pub fn i64_opt(&self, name: &str) -> Result<Option<i64>, PrimitiveError> {
        match self.f64_opt(name)? {
            None => Ok(None),
            Some(n) if n.is_finite() && n.fract() == 0.0 => Ok(Some(n as i64)),
            Some(n) => Err(PrimitiveError::invalid(name, format!("expected an integer, got {n}"))),
        }
    }

    pub fn usize_opt(&self, name: &str) -> Result<Option<usize>, PrimitiveError> {
        match self.i64_opt(name)? {
            None => Ok(None),
            Some(n) if n >= 0 => Ok(Some(n as usize)),
            Some(n) => Err(PrimitiveError::invalid(name, format!("must be non-negative, got {n}"))),
        }
    }

    pub fn usize_or(&self, name: &str, default: usize) -> Result<usize, PrimitiveError> {
        Ok(self.usize_opt(name)?.unwrap_or(default))
    }

    pub fn usize_req(&self, name: &str) -> Result<usize, PrimitiveError> {
        self.usize_opt(name)?.ok_or_else(|| PrimitiveError::invalid(name, "is required"))
    }

    pub fn str_opt(&self, name: &str) -> Result<Option<&str>, PrimitiveError> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(PrimitiveError::invalid(name, format!("expected a string, got {}", other.kind_name()))),
        }
    }

    pub fn str_or<'a>(&'a self, name: &str, default: &'a str) -> Result<&'a str, PrimitiveError> {
        Ok(self.str_opt(name)?.unwrap_or(default))
    }

    pub fn str_req(&self, name: &str) -> Result<&str, PrimitiveError> {
        match self.str_opt(name)? {
            Some(s) if !s.trim().is_empty() => Ok(s),
            _ => Err(PrimitiveError::invalid(name, "is required")),
        }
    }

    pub fn bool_or(&self, name: &str, default: bool) -> Result<bool, PrimitiveError> {
        match self.get(name) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(PrimitiveError::invalid(name, format!("expected a boolean, got {}", other.kind_name()))),
        }
    }
}

/// Todo lo que recibe `Primitive::execute`.
pub struct PrimitiveCall<'a> {
    pub step_id: &'a str,
    pub params: &'a ResolvedParams,
    /// Resultados de los `inputs` del step, en orden.
    pub args: Vec<&'a Value>,
    pub sources: &'a DataSources,
}

impl<'a> PrimitiveCall<'a> {
    pub fn new(step_id: &'a str, params: &'a ResolvedParams, args: Vec<&'a Value>, sources: &'a DataSources) -> Self {
        Self { step_id,
               params,
               args,
               sources }
    }

    /// Argumento posicional `index` o, si no existe, el primer parámetro
    /// presente de `fallbacks`.
    pub fn value_opt(&self, index: usize, fallbacks: &[&str]) -> Option<&'a Value> {
        let params: &'a ResolvedParams = self.params;
        self.args
            .get(index)
            .copied()
            .or_else(|| fallbacks.iter().find_map(|name| params.get(name)))
    }

    pub fn value(&self, index: usize, fallbacks: &[&str]) -> Result<&'a Value, PrimitiveError> {
        self.value_opt(index, fallbacks).ok_or_else(|| {
            let names: Vec<String> = fallbacks.iter().map(|n| format!("'{n}'")).collect();
            PrimitiveError::MissingArgument(format!("input #{} or parameter {}", index + 1, names.join("/")))
        })
    }

    /// Secuencia numérica: input posicional o parámetro de respaldo.
    pub fn series(&self, index: usize, fallbacks: &[&str]) -> Result<Cow<'a, [f64]>, PrimitiveError> {
        let v = self.value(index, fallbacks)?;
        v.as_series().ok_or_else(|| PrimitiveError::shape("numeric sequence", v.shape()))
    }

    /// Primer operando de una primitiva de una secuencia.
    pub fn first_series(&self) -> Result<Cow<'a, [f64]>, PrimitiveError> {
        self.series(0, &["values"])
    }

    /// Segundo operando: input #2, o parámetro `value`/`other`.
    pub fn second(&self) -> Result<&'a Value, PrimitiveError> {
        self.value(1, &["value", "other"])
    }
}
