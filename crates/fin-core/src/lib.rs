//! fin-core: motor de modelos DSL de analítica financiera.
pub mod constants;
pub mod engine;
pub mod errors;
pub mod graph;
pub mod hashing;
pub mod model;
pub mod output;
pub mod primitives;
pub mod validation;
pub mod value;

pub use engine::{execute_dsl, DebugTrace, DslEngine, DslEngineBuilder, ExecutionResult, RunEventKind, StepResults};
pub use errors::{DslError, PrimitiveError};
pub use graph::DependencyGraph;
pub use model::{ExecutionContext, InputSchema, Model, OutputDefinition, ParamValue, Step, StepParams};
pub use output::{format_outputs, Output};
pub use primitives::{get_primitive, has_primitive, list_primitives, Primitive, PrimitiveRegistry};
pub use validation::{apply_defaults, validate_dsl_model, validate_inputs, ValidationReport};
pub use value::{Record, Value};
