//! fin-domain: tipos de datos de mercado compartidos entre colaboradores
//! externos (proveedores) y las primitivas de acceso a datos.
//!
//! Estos tipos son registros planos y serializables. No contienen lógica de
//! red ni de almacenamiento; sólo validaciones locales y helpers de cálculo
//! (precio medio, strike ATM, filtrado por rango de fechas).
pub mod error;
pub mod macro_series;
pub mod market;
pub mod options;

pub use error::DomainError;
pub use macro_series::{Frequency, MacroPoint, MacroQuery};
pub use market::{parse_date, Bar, DateRange, PriceField};
pub use options::{Greeks, OptionChain, OptionContract, OptionType};
