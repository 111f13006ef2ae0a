//! Validación estática de modelos y de entradas de ejecución.

pub mod inputs;
pub mod report;
pub mod validator;

pub use inputs::{apply_defaults, validate_inputs};
pub use report::ValidationReport;
pub use validator::{validate_dsl_model, Validator};
