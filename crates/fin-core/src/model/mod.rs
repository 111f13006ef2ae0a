//! Tipos del documento DSL.

pub mod context;
pub mod dsl;
pub mod output;
pub mod params;
pub mod schema;

pub use context::ExecutionContext;
pub use dsl::{Model, Step};
pub use output::{source_step_id, OutputCategory, OutputDefinition, OutputRef, ScalarDef, SeriesDef, TableDef};
pub use params::{ParamValue, StepParams};
pub use schema::{FieldType, InputField, InputSchema};
