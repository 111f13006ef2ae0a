//! Sustitución de variables y resolución de argumentos posicionales.
use indexmap::IndexMap;

use super::StepResults;
use crate::errors::DslError;
use crate::model::{ParamValue, Step};
use crate::primitives::ResolvedParams;
use crate::value::Value;

fn resolve_value(step: &Step, key: &str, p: &ParamValue, inputs: &IndexMap<String, Value>) -> Result<Value, DslError> {
    match p {
        ParamValue::Literal(v) => Ok(v.clone()),
        ParamValue::Variable(name) => inputs.get(name).cloned().ok_or_else(|| DslError::UndefinedVariable {
                                                                   step_id: step.id.clone(),
                                                                   param: key.to_string(),
                                                                   variable: name.clone(),
                                                               }),
        ParamValue::List(items) => {
            let values = items.iter()
                              .map(|item| resolve_value(step, key, item, inputs))
                              .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::from_items(values))
        }
        ParamValue::Nested(map) => {
            let mut record = IndexMap::with_capacity(map.len());
            for (k, item) in map {
                record.insert(k.clone(), resolve_value(step, key, item, inputs)?);
            }
            Ok(Value::Record(record))
        }
    }
}

/// Sustituye cada referencia `$var` por el valor de `inputs`.
pub fn resolve_params(step: &Step, inputs: &IndexMap<String, Value>) -> Result<ResolvedParams, DslError> {
    let mut out = IndexMap::with_capacity(step.params.len());
    for (key, p) in step.params.iter() {
        out.insert(key.clone(), resolve_value(step, key, p, inputs)?);
    }
    Ok(ResolvedParams::new(out))
}

/// Resultados de los `inputs` del step, en orden de declaración.
pub fn resolve_args<'r>(step: &Step, results: &'r StepResults) -> Result<Vec<&'r Value>, DslError> {
    step.inputs
        .iter()
        .map(|id| {
            results.get(id).ok_or_else(|| DslError::UnknownStepReference { context: format!("step '{}' input", step.id),
                                                                           reference: id.clone(),
                                                                           declared_later: false })
        })
        .collect()
}
