//! Conjunto de colaboradores disponibles para una ejecución.
use std::fmt;
use std::sync::Arc;

use crate::{MacroDataProvider, MarketDataProvider, OptionsProvider, ProviderError};

/// Colaboradores configurados. Cada uno es opcional: una primitiva de datos
/// cuyo colaborador falta falla con un error explícito.
#[derive(Clone, Default)]
pub struct DataSources {
    pub market: Option<Arc<dyn MarketDataProvider>>,
    pub macro_data: Option<Arc<dyn MacroDataProvider>>,
    pub options: Option<Arc<dyn OptionsProvider>>,
}

impl DataSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_market(mut self, p: Arc<dyn MarketDataProvider>) -> Self {
        self.market = Some(p);
        self
    }

    pub fn with_macro(mut self, p: Arc<dyn MacroDataProvider>) -> Self {
        self.macro_data = Some(p);
        self
    }

    pub fn with_options(mut self, p: Arc<dyn OptionsProvider>) -> Self {
        self.options = Some(p);
        self
    }

    pub fn market(&self) -> Result<&dyn MarketDataProvider, ProviderError> {
        self.market
            .as_deref()
            .ok_or_else(|| ProviderError::InvalidRequest("no market data provider configured".into()))
    }

    pub fn macro_data(&self) -> Result<&dyn MacroDataProvider, ProviderError> {
        self.macro_data
            .as_deref()
            .ok_or_else(|| ProviderError::InvalidRequest("no macro data provider configured".into()))
    }

    pub fn options(&self) -> Result<&dyn OptionsProvider, ProviderError> {
        self.options
            .as_deref()
            .ok_or_else(|| ProviderError::InvalidRequest("no options provider configured".into()))
    }
}

impl fmt::Debug for DataSources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSources")
         .field("market", &self.market.as_ref().map(|p| p.get_name().to_string()))
         .field("macro_data", &self.macro_data.as_ref().map(|p| p.get_name().to_string()))
         .field("options", &self.options.as_ref().map(|p| p.get_name().to_string()))
         .finish()
    }
}
