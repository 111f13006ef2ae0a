use std::path::PathBuf;

use thiserror::Error;

/// Errores de la capa de aplicación (CLI, ficheros, configuración).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid run inputs: {0}")]
    InvalidInputs(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_variant_names_the_path() {
        let err = AppError::Io { path: PathBuf::from("model.json"),
                                 source: std::io::Error::other("gone") };
        assert_eq!(err.to_string(), "cannot read model.json: gone");
    }

    #[test]
    fn json_variant_keeps_source() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = AppError::Json { path: PathBuf::from("in.json"),
                                   source };
        assert!(err.to_string().starts_with("invalid JSON in in.json:"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn config_variant_format() {
        assert_eq!(AppError::Config("bad".into()).to_string(), "configuration error: bad");
    }
}
