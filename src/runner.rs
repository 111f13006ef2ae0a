//! Carga de modelos/entradas desde disco y preparación de ejecuciones.
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use log::{info, warn};

use fin_core::{apply_defaults, validate_inputs, DslEngine, ExecutionContext, Model, Value};
use fin_providers::fixtures::demo_sources;

use crate::config::AppConfig;
use crate::errors::AppError;

pub type RunInputs = IndexMap<String, Value>;

fn read(path: &Path) -> Result<String, AppError> {
    fs::read_to_string(path).map_err(|source| AppError::Io { path: path.to_path_buf(),
                                                             source })
}

pub fn load_model(path: &Path) -> Result<Model, AppError> {
    let raw = read(path)?;
    Model::from_json_str(&raw).map_err(|source| AppError::Json { path: path.to_path_buf(),
                                                                 source })
}

/// Objeto JSON `{ nombre: valor }`. Sin fichero, entradas vacías.
pub fn load_inputs(path: Option<&Path>) -> Result<RunInputs, AppError> {
    match path {
        Some(p) => {
            let raw = read(p)?;
            serde_json::from_str(&raw).map_err(|source| AppError::Json { path: p.to_path_buf(),
                                                                         source })
        }
        None => Ok(RunInputs::new()),
    }
}

/// Completa defaults y valida contra el `inputSchema` del modelo (si lo hay).
/// Los warnings del esquema se registran en el log.
pub fn prepare_inputs(model: &Model, inputs: RunInputs) -> Result<RunInputs, AppError> {
    let Some(schema) = &model.input_schema else {
        return Ok(inputs);
    };
    let filled = apply_defaults(&inputs, schema);
    let report = validate_inputs(&filled, schema);
    for w in &report.warnings {
        warn!("{w}");
    }
    if !report.valid {
        return Err(AppError::InvalidInputs(report.joined_errors()));
    }
    Ok(filled)
}

/// Contexto de ejecución: los argumentos explícitos mandan sobre la configuración.
pub fn build_context(inputs: RunInputs, timeout_ms: Option<u64>, debug: bool, config: &AppConfig) -> ExecutionContext {
    ExecutionContext::new().with_inputs(inputs)
                           .with_timeout_ms(timeout_ms.unwrap_or(config.default_timeout_ms))
                           .with_debug(debug || config.debug)
}

/// Motor con los colaboradores en memoria de demostración.
pub fn demo_engine(config: &AppConfig) -> DslEngine {
    info!("using in-memory demo data sources");
    DslEngine::builder().with_sources(demo_sources())
                        .default_timeout_ms(config.default_timeout_ms)
                        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model_with_schema() -> Model {
        serde_json::from_value(json!({
            "version": "1.0",
            "inputSchema": [
                {"name": "symbol", "type": "string", "required": true},
                {"name": "window", "type": "integer", "default": 20}
            ],
            "steps": [{"id": "p", "operation": "get_current_price", "params": {"symbol": "$symbol"}}],
            "outputs": {"scalars": [{"id": "p", "label": "Price", "source": "p"}]}
        })).unwrap()
    }

    #[test]
    fn defaults_are_applied_before_checking() {
        let mut inputs = RunInputs::new();
        inputs.insert("symbol".into(), Value::from("SPY"));
        let prepared = prepare_inputs(&model_with_schema(), inputs).unwrap();
        assert_eq!(prepared.get("window"), Some(&Value::Number(20.0)));
    }

    #[test]
    fn missing_required_input_is_rejected() {
        let err = prepare_inputs(&model_with_schema(), RunInputs::new()).unwrap_err();
        assert_eq!(err.to_string(), "invalid run inputs: input 'symbol': is required");
    }

    #[test]
    fn explicit_flags_override_config() {
        let cfg = AppConfig { default_timeout_ms: 1000,
                              debug: false,
                              log_level: "info".into() };
        let ctx = build_context(RunInputs::new(), None, false, &cfg);
        assert_eq!(ctx.timeout_ms, Some(1000));
        let ctx = build_context(RunInputs::new(), Some(5), true, &cfg);
        assert_eq!(ctx.timeout_ms, Some(5));
        assert!(ctx.debug);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_model(Path::new("does/not/exist.json")).unwrap_err();
        assert!(err.to_string().starts_with("cannot read does/not/exist.json"));
    }
}
