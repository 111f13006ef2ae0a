//! Documento de modelo: versión, steps, salidas y esquema de entradas.
use serde::{Deserialize, Serialize};

use super::output::OutputDefinition;
use super::params::StepParams;
use super::schema::InputSchema;

/// Un nodo del grafo: una invocación de primitiva.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub operation: String,
    #[serde(default, skip_serializing_if = "StepParams::is_empty")]
    pub params: StepParams,
    /// Ids de steps anteriores cuyos resultados se pasan como argumentos
    /// posicionales, en este orden.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<String>,
}

impl Step {
    pub fn new(id: impl Into<String>, operation: impl Into<String>) -> Self {
        Self { id: id.into(),
               operation: operation.into(),
               ..Self::default() }
    }

    pub fn with_params(mut self, params: StepParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
        where I: IntoIterator<Item = S>,
              S: Into<String>
    {
        self.inputs = inputs.into_iter().map(Into::into).collect();
        self
    }
}

/// Modelo completo. Los campos ausentes se toman por defecto para que el
/// validador pueda informar de ellos en lugar de fallar al deserializar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub outputs: OutputDefinition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<InputSchema>,
}

impl Model {
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Variables referenciadas por cualquier parámetro, sin repetir.
    pub fn referenced_variables(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for step in &self.steps {
            for (_, p) in step.params.iter() {
                for var in p.variables() {
                    if !out.contains(&var) {
                        out.push(var);
                    }
                }
            }
        }
        out
    }
}
