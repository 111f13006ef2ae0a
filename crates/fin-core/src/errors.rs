//! Taxonomía de errores del motor.
//!
//! - La fase de validación acumula `DslError` en un `ValidationReport`
//!   (diagnóstico completo, nunca falla rápido).
//! - La fase de ejecución falla en el primer error.
//! - El formateo de salidas degrada a warnings salvo rutas irresolubles.
use fin_domain::DomainError;
use fin_providers::ProviderError;
use thiserror::Error;

fn later_hint(declared_later: bool) -> &'static str {
    if declared_later {
        " (it is declared later; inputs must reference earlier steps)"
    } else {
        ""
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DslError {
    #[error("{0}")]
    StructuralValidation(String),
    #[error("step '{step_id}': {message}")]
    PrimitiveParam { step_id: String, message: String },
    #[error("{context}: unknown operation '{operation}'. Valid operations: {}", valid.join(", "))]
    UnknownOperation {
        context: String,
        operation: String,
        valid: Vec<String>,
    },
    #[error("{context} references unknown step '{reference}'{}", later_hint(*declared_later))]
    UnknownStepReference {
        context: String,
        reference: String,
        declared_later: bool,
    },
    #[error("circular dependency detected: {}", path.join(" -> "))]
    CircularDependency { path: Vec<String> },
    #[error("step '{step_id}' ({operation}) failed: {source}")]
    StepExecution {
        step_id: String,
        operation: String,
        #[source]
        source: PrimitiveError,
    },
    #[error("execution timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("step '{step_id}': parameter '{param}' references undefined variable '{variable}'")]
    UndefinedVariable {
        step_id: String,
        param: String,
        variable: String,
    },
    #[error("cannot resolve output source '{path}': {message}")]
    OutputResolution { path: String, message: String },
    #[error("input '{field}': {message}")]
    InputSchemaValidation { field: String, message: String },
}

/// Fallos de una primitiva individual.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PrimitiveError {
    #[error("invalid parameter '{name}': {message}")]
    InvalidParam { name: String, message: String },
    #[error("missing argument: {0}")]
    MissingArgument(String),
    #[error("sequence length mismatch ({left} vs {right})")]
    LengthMismatch { left: usize, right: usize },
    #[error("expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },
    #[error("index {index} out of range for sequence of length {len}")]
    IndexOutOfRange { index: i64, len: usize },
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("decode error: {0}")]
    Decode(String),
}

impl PrimitiveError {
    pub fn invalid(name: &str, message: impl Into<String>) -> Self {
        PrimitiveError::InvalidParam { name: name.to_string(),
                                       message: message.into() }
    }

    pub fn shape(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        PrimitiveError::Shape { expected: expected.into(),
                                actual: actual.into() }
    }
}

impl From<serde_json::Error> for PrimitiveError {
    fn from(e: serde_json::Error) -> Self {
        PrimitiveError::Decode(e.to_string())
    }
}
