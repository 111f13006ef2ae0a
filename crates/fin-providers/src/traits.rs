//! Traits de los colaboradores (mercado, macro, opciones).
//!
//! Todos son `async` porque las implementaciones reales esperan respuestas
//! de red; son `Send + Sync` para poder compartirse entre ejecuciones
//! concurrentes detrás de un `Arc`.
use async_trait::async_trait;
use chrono::NaiveDate;
use fin_domain::{Bar, DateRange, MacroPoint, MacroQuery, OptionChain, OptionContract, OptionType};

use crate::ProviderError;

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn get_name(&self) -> &str;

    /// Barras ordenadas por fecha ascendente dentro del rango.
    async fn get_bars(&self, symbol: &str, range: &DateRange) -> Result<Vec<Bar>, ProviderError>;

    async fn get_current_price(&self, symbol: &str) -> Result<f64, ProviderError>;
}

#[async_trait]
pub trait MacroDataProvider: Send + Sync {
    fn get_name(&self) -> &str;

    /// Puntos (fecha, valor) ordenados por fecha ascendente.
    async fn get_series(&self, indicator: &str, query: &MacroQuery) -> Result<Vec<MacroPoint>, ProviderError>;
}

#[async_trait]
pub trait OptionsProvider: Send + Sync {
    fn get_name(&self) -> &str;

    /// Una o más cadenas; con `expiration` sólo la de ese vencimiento.
    async fn get_chains(&self, symbol: &str, expiration: Option<NaiveDate>) -> Result<Vec<OptionChain>, ProviderError>;

    async fn get_quote(&self,
                       symbol: &str,
                       expiration: NaiveDate,
                       strike: f64,
                       option_type: OptionType)
                       -> Result<OptionContract, ProviderError>;
}
