//! Cadenas de opciones y contratos individuales.
//!
//! Una `OptionChain` es una instantánea de todos los strikes para un
//! vencimiento concreto. Los helpers de este módulo (precio medio, strike
//! ATM) son puros y no dependen del colaborador que produjo la cadena.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl FromStr for OptionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "call" | "c" => Ok(OptionType::Call),
            "put" | "p" => Ok(OptionType::Put),
            other => Err(DomainError::ParseError(format!("unknown option type '{other}' (expected call or put)"))),
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionType::Call => f.write_str("call"),
            OptionType::Put => f.write_str("put"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
}

/// Un contrato (pata) de la cadena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    pub strike: f64,
    pub option_type: OptionType,
    pub bid: f64,
    pub ask: f64,
    #[serde(default)]
    pub last: Option<f64>,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub open_interest: f64,
    #[serde(default)]
    pub implied_volatility: Option<f64>,
    #[serde(default)]
    pub greeks: Option<Greeks>,
}

impl OptionContract {
    /// Precio medio bid/ask; si el libro está vacío usa el último precio.
    pub fn mid_price(&self) -> Option<f64> {
        if self.bid > 0.0 && self.ask > 0.0 && self.ask >= self.bid {
            Some((self.bid + self.ask) / 2.0)
        } else {
            self.last.filter(|p| p.is_finite() && *p > 0.0)
        }
    }
}

/// Instantánea de la cadena para un vencimiento.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionChain {
    pub symbol: String,
    pub expiration: NaiveDate,
    pub underlying_price: f64,
    pub calls: Vec<OptionContract>,
    pub puts: Vec<OptionContract>,
}

impl OptionChain {
    pub fn legs(&self, option_type: OptionType) -> &[OptionContract] {
        match option_type {
            OptionType::Call => &self.calls,
            OptionType::Put => &self.puts,
        }
    }

    pub fn leg(&self, option_type: OptionType, strike: f64) -> Option<&OptionContract> {
        self.legs(option_type).iter().find(|c| (c.strike - strike).abs() < 1e-9)
    }

    /// Strike más cercano al precio del subyacente entre los strikes que
    /// existen en calls o puts. En empate gana el strike menor.
    pub fn atm_strike(&self) -> Option<f64> {
        self.calls
            .iter()
            .chain(self.puts.iter())
            .map(|c| c.strike)
            .filter(|s| s.is_finite())
            .fold(None, |best: Option<f64>, s| match best {
                None => Some(s),
                Some(b) => {
                    let (db, ds) = ((b - self.underlying_price).abs(), (s - self.underlying_price).abs());
                    if ds < db || (ds == db && s < b) {
                        Some(s)
                    } else {
                        Some(b)
                    }
                }
            })
    }
}
