//! fin-providers: contratos de los colaboradores externos de datos.
//!
//! El motor nunca hace I/O por sí mismo; las primitivas de acceso a datos
//! reciben un `DataSources` con implementaciones de estos traits. Aquí viven
//! también implementaciones en memoria (para tests y para el CLI) y
//! generadores deterministas de datos sintéticos.
pub mod error;
pub mod fixtures;
pub mod memory;
pub mod sources;
pub mod traits;

pub use error::ProviderError;
pub use memory::{InMemoryMacroData, InMemoryMarketData, InMemoryOptions};
pub use sources::DataSources;
pub use traits::{MacroDataProvider, MarketDataProvider, OptionsProvider};
