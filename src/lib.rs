//! finflow
//!
//! Fachada del motor de modelos de analítica financiera:
//! - `config`: configuración desde el entorno.
//! - `errors`: errores de la capa de aplicación.
//! - `runner`: carga de ficheros y preparación de ejecuciones (usado por el CLI).
//!
//! El motor vive en `fin-core`; los colaboradores de datos en `fin-providers`.

pub mod config;
pub mod errors;
pub mod runner;

pub use fin_core::{
    execute_dsl, validate_dsl_model, validate_inputs, DslEngine, DslError, ExecutionContext, ExecutionResult, Model,
    ValidationReport, Value,
};
pub use fin_domain;
pub use fin_providers;
