use fin_domain::DomainError;
use thiserror::Error;

/// Errores devueltos por un colaborador de datos.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProviderError {
    #[error("no data for {0}")]
    NotFound(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("upstream failure: {0}")]
    Upstream(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
}
