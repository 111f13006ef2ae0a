//! Conversión de resultados de steps a salidas listas para presentar.

pub mod formatter;
pub mod types;

pub use formatter::{format_outputs, resolve_source, title_case};
pub use types::{ColumnDef, Output, OutputMetadata, ScalarOutput, SeriesOutput, TableOutput};
