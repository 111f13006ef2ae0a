//! Barras OHLCV y rangos de fechas.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::DomainError;

/// Formato de fecha usado en todo el sistema (ISO-8601, sólo fecha).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parsea una fecha `YYYY-MM-DD`.
pub fn parse_date(raw: &str) -> Result<NaiveDate, DomainError> {
    Ok(NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)?)
}

/// Barra diaria de precio/volumen de un símbolo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Crea una barra validando coherencia básica de precios.
    ///
    /// # Errores
    /// `DomainError::ValidationError` si algún precio no es finito o negativo,
    /// o si `high < low`.
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Result<Self, DomainError> {
        for (name, v) in [("open", open), ("high", high), ("low", low), ("close", close), ("volume", volume)] {
            if !v.is_finite() || v < 0.0 {
                return Err(DomainError::ValidationError(format!("bar {date}: {name} must be a finite non-negative number")));
            }
        }
        if high < low {
            return Err(DomainError::ValidationError(format!("bar {date}: high ({high}) < low ({low})")));
        }
        Ok(Self { date,
                  open,
                  high,
                  low,
                  close,
                  volume })
    }

    pub fn price(&self, field: PriceField) -> f64 {
        match field {
            PriceField::Open => self.open,
            PriceField::High => self.high,
            PriceField::Low => self.low,
            PriceField::Close => self.close,
        }
    }
}

/// Campo de precio extraíble de una barra.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
}

impl PriceField {
    pub const ALL: [&'static str; 4] = ["open", "high", "low", "close"];

    pub fn as_str(&self) -> &'static str {
        match self {
            PriceField::Open => "open",
            PriceField::High => "high",
            PriceField::Low => "low",
            PriceField::Close => "close",
        }
    }
}

impl FromStr for PriceField {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(PriceField::Open),
            "high" => Ok(PriceField::High),
            "low" => Ok(PriceField::Low),
            "close" => Ok(PriceField::Close),
            other => Err(DomainError::ParseError(format!("unknown price field '{other}' (expected one of: {})",
                                                         PriceField::ALL.join(", ")))),
        }
    }
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rango de fechas cerrado; los extremos ausentes no acotan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self, DomainError> {
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(DomainError::ValidationError(format!("date range start {s} is after end {e}")));
            }
        }
        Ok(Self { start, end })
    }

    /// Construye el rango desde cadenas opcionales `YYYY-MM-DD`.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, DomainError> {
        let start = start.map(parse_date).transpose()?;
        let end = end.map(parse_date).transpose()?;
        Self::new(start, end)
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn bar_rejects_inverted_range() {
        let err = Bar::new(d("2024-01-02"), 10.0, 9.0, 11.0, 10.0, 100.0).unwrap_err();
        assert!(err.to_string().contains("high"));
    }

    #[test]
    fn bar_rejects_nan_price() {
        assert!(Bar::new(d("2024-01-02"), f64::NAN, 11.0, 9.0, 10.0, 100.0).is_err());
    }

    #[test]
    fn price_field_roundtrip() {
        let f: PriceField = "high".parse().unwrap();
        assert_eq!(f, PriceField::High);
        assert!("adj_close".parse::<PriceField>().is_err());
    }

    #[test]
    fn date_range_contains_is_inclusive() {
        let r = DateRange::parse(Some("2024-01-01"), Some("2024-01-31")).unwrap();
        assert!(r.contains(d("2024-01-01")));
        assert!(r.contains(d("2024-01-31")));
        assert!(!r.contains(d("2024-02-01")));
        assert!(DateRange::unbounded().contains(d("1999-12-31")));
    }

    #[test]
    fn date_range_rejects_reversed_bounds() {
        assert!(DateRange::parse(Some("2024-02-01"), Some("2024-01-01")).is_err());
    }
}
