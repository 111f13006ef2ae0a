//! Motor de ejecución de modelos DSL.

pub mod builder;
pub mod core;
pub mod resolve;
pub mod result;
pub mod trace;

use indexmap::IndexMap;

pub use builder::DslEngineBuilder;
pub use core::{execute_dsl, DslEngine};
pub use result::ExecutionResult;
pub use trace::{DebugTrace, RunEvent, RunEventKind, StepSummary};

use crate::value::Value;

/// Resultados por id de step, en orden de ejecución.
pub type StepResults = IndexMap<String, Value>;
