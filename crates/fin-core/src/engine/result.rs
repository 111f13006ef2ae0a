use serde::Serialize;
use uuid::Uuid;

use super::trace::DebugTrace;
use crate::errors::DslError;
use crate::output::Output;

/// Sobre devuelto por cada ejecución, tenga éxito o no.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub run_id: Uuid,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Output>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub runtime_ms: u64,
    pub steps_executed: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<DebugTrace>,
    /// Errores tipados detrás de `error`, para inspección programática.
    #[serde(skip)]
    pub failures: Vec<DslError>,
}

impl ExecutionResult {
    pub fn succeeded(run_id: Uuid, output: Output, runtime_ms: u64, steps_executed: usize, warnings: Vec<String>) -> Self {
        Self { run_id,
               success: true,
               output: Some(output),
               error: None,
               runtime_ms,
               steps_executed,
               warnings,
               trace: None,
               failures: Vec::new() }
    }

    pub fn failed(run_id: Uuid, failures: Vec<DslError>, runtime_ms: u64, steps_executed: usize, warnings: Vec<String>) -> Self {
        let message = failures.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
        Self { run_id,
               success: false,
               output: None,
               error: Some(message),
               runtime_ms,
               steps_executed,
               warnings,
               trace: None,
               failures }
    }

    pub fn with_trace(mut self, trace: Option<DebugTrace>) -> Self {
        self.trace = trace;
        self
    }

    pub fn is_timeout(&self) -> bool {
        self.failures.iter().any(|e| matches!(e, DslError::Timeout { .. }))
    }
}
