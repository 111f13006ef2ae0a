use serde::ser::Serializer;
use serde::Serialize;

use crate::errors::DslError;

fn as_messages<S: Serializer>(errors: &[DslError], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(errors.iter().map(ToString::to_string))
}

/// Resultado de una pasada de validación: todos los errores y warnings
/// encontrados, nunca sólo el primero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    #[serde(serialize_with = "as_messages")]
    pub errors: Vec<DslError>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn new(errors: Vec<DslError>, warnings: Vec<String>) -> Self {
        Self { valid: errors.is_empty(),
               errors,
               warnings }
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// Mensajes unidos con `"; "`, tal como se reportan en `ExecutionResult`.
    pub fn joined_errors(&self) -> String {
        self.error_messages().join("; ")
    }
}
