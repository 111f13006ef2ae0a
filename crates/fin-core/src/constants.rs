//! Constantes del motor DSL.

/// Única versión de modelo aceptada por el validador.
pub const DSL_VERSION: &str = "1.0";

/// Versión lógica del motor; entra en el fingerprint de cada ejecución.
pub const ENGINE_VERSION: &str = "finflow-1";

/// Por encima de este número de steps el validador sugiere descomponer el modelo.
pub const MAX_RECOMMENDED_STEPS: usize = 50;

/// Timeout global por defecto de una ejecución.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Patrón de identificadores de step.
pub const STEP_ID_PATTERN: &str = "^[a-z][a-z0-9_]*$";

/// Prefijo que marca una referencia a variable en el JSON de autoría.
pub const VARIABLE_MARKER: char = '$';

/// Tipos de serie admitidos en `outputs.series[].type`.
pub const SERIES_TYPES: [&str; 4] = ["line", "area", "bar", "scatter"];
