use thiserror::Error;

/// Errores de validación de registros de dominio.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    #[error("validation error: {0}")]
    ValidationError(String),
    #[error("parse error: {0}")]
    ParseError(String),
}

impl From<chrono::ParseError> for DomainError {
    fn from(e: chrono::ParseError) -> Self {
        DomainError::ParseError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_variant_format() {
        let err = DomainError::ValidationError("high < low".into());
        assert_eq!(err.to_string(), "validation error: high < low");
    }

    #[test]
    fn parse_error_from_chrono() {
        let err: DomainError = chrono::NaiveDate::parse_from_str("2024-13-40", "%Y-%m-%d").unwrap_err().into();
        assert!(matches!(err, DomainError::ParseError(_)));
    }
}
