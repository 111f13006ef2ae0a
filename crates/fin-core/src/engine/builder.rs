//! Builder para `DslEngine`.
//!
//! ```ignore
//! let engine = DslEngine::builder()
//!     .with_sources(demo_sources())
//!     .default_timeout_ms(5_000)
//!     .build();
//! ```
use std::sync::Arc;

use fin_providers::{DataSources, MacroDataProvider, MarketDataProvider, OptionsProvider};

use super::DslEngine;
use crate::constants::DEFAULT_TIMEOUT_MS;
use crate::primitives::{registry, PrimitiveRegistry};

#[derive(Default)]
pub struct DslEngineBuilder {
    registry: Option<Arc<PrimitiveRegistry>>,
    sources: DataSources,
    default_timeout_ms: Option<u64>,
}

impl DslEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Colaboradores de datos disponibles para las primitivas `fetch_*`.
    pub fn with_sources(mut self, sources: DataSources) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_market_data(mut self, provider: Arc<dyn MarketDataProvider>) -> Self {
        self.sources = self.sources.with_market(provider);
        self
    }

    pub fn with_macro_data(mut self, provider: Arc<dyn MacroDataProvider>) -> Self {
        self.sources = self.sources.with_macro(provider);
        self
    }

    pub fn with_options(mut self, provider: Arc<dyn OptionsProvider>) -> Self {
        self.sources = self.sources.with_options(provider);
        self
    }

    /// Registro alternativo (por defecto el incorporado).
    pub fn with_registry(mut self, registry: Arc<PrimitiveRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Timeout para contextos que no fijan `timeout_ms`.
    pub fn default_timeout_ms(mut self, ms: u64) -> Self {
        self.default_timeout_ms = Some(ms);
        self
    }

    pub fn build(self) -> DslEngine {
        DslEngine { registry: self.registry.unwrap_or_else(registry),
                    sources: self.sources,
                    default_timeout_ms: self.default_timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS) }
    }
}
