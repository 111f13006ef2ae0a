//! Datos sintéticos deterministas para tests, demos y el CLI.
//!
//! Mismo seed => mismos datos, byte a byte. No pretende ser realista, sólo
//! estable y con forma plausible (paseo aleatorio, sonrisa de volatilidad).
use chrono::{Datelike, Duration as ChronoDuration, NaiveDate, Weekday};
use fin_domain::{Bar, Greeks, MacroPoint, OptionChain, OptionContract, OptionType};
use std::sync::Arc;

use crate::{DataSources, InMemoryMacroData, InMemoryMarketData, InMemoryOptions};

/// Generador congruencial lineal (constantes de Knuth/MMIX).
#[derive(Debug, Clone)]
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed ^ 0x9E37_79B9_7F4A_7C15)
    }

    /// Uniforme en [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniforme en [-1, 1).
    pub fn next_signed(&mut self) -> f64 {
        self.next_f64() * 2.0 - 1.0
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// `days` barras en días hábiles a partir de `start`.
pub fn synthetic_bars(start: NaiveDate, days: usize, start_price: f64, seed: u64) -> Vec<Bar> {
    let mut rng = Lcg::new(seed);
    let mut out = Vec::with_capacity(days);
    let mut date = start;
    let mut close = start_price;
    while out.len() < days {
        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            let open = close;
            close = (open * (1.0 + 0.015 * rng.next_signed() + 0.0004)).max(0.01);
            let high = open.max(close) * (1.0 + 0.005 * rng.next_f64());
            let low = open.min(close) * (1.0 - 0.005 * rng.next_f64());
            let volume = (1_000_000.0 * (1.0 + 0.5 * rng.next_signed())).round();
            out.push(Bar { date,
                           open: round2(open),
                           high: round2(high),
                           low: round2(low),
                           close: round2(close),
                           volume });
        }
        date += ChronoDuration::days(1);
    }
    out
}

/// Serie mensual (primer día de cada mes).
pub fn synthetic_monthly(start: NaiveDate, months: usize, base: f64, drift: f64, seed: u64) -> Vec<MacroPoint> {
    let mut rng = Lcg::new(seed);
    let mut value = base;
    let (mut year, mut month) = (start.year(), start.month());
    let mut out = Vec::with_capacity(months);
    for _ in 0..months {
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, 1) {
            out.push(MacroPoint { date,
                                  value: round2(value) });
        }
        value += drift + 0.1 * rng.next_signed();
        month += 1;
        if month > 12 {
            month = 1;
            year += 1;
        }
    }
    out
}

/// Cadena con strikes equiespaciados alrededor del subyacente.
pub fn synthetic_chain(symbol: &str, expiration: NaiveDate, underlying: f64, step: f64, strikes_each_side: usize, days_to_expiry: f64) -> OptionChain {
    let t = (days_to_expiry.max(1.0) / 365.0).sqrt();
    let atm = (underlying / step).round() * step;
    let mut calls = Vec::new();
    let mut puts = Vec::new();
    let n = strikes_each_side as i64;
    for i in -n..=n {
        let strike = atm + i as f64 * step;
        if strike <= 0.0 {
            continue;
        }
        let moneyness = strike / underlying - 1.0;
        let iv = 0.18 + 0.8 * moneyness * moneyness;
        let time_value = underlying * iv * t * 0.4 * (-(moneyness * moneyness) / (2.0 * (iv * t).powi(2))).exp();
        let distance = (i.unsigned_abs() as f64) + 1.0;
        for option_type in [OptionType::Call, OptionType::Put] {
            let intrinsic = match option_type {
                OptionType::Call => (underlying - strike).max(0.0),
                OptionType::Put => (strike - underlying).max(0.0),
            };
            let mid = round2(intrinsic + time_value.max(0.05));
            let delta = match option_type {
                OptionType::Call => (0.5 - moneyness * 4.0).clamp(0.0, 1.0),
                OptionType::Put => (-0.5 - moneyness * 4.0).clamp(-1.0, 0.0),
            };
            let contract = OptionContract { strike,
                                            option_type,
                                            bid: round2((mid - 0.05).max(0.01)),
                                            ask: round2(mid + 0.05),
                                            last: Some(mid),
                                            volume: (5_000.0 / distance).round(),
                                            open_interest: (20_000.0 / distance).round(),
                                            implied_volatility: Some(round2(iv * 100.0) / 100.0),
                                            greeks: Some(Greeks { delta,
                                                                  gamma: 0.02 / distance,
                                                                  theta: -0.05 / distance,
                                                                  vega: 0.1 / distance }) };
            match option_type {
                OptionType::Call => calls.push(contract),
                OptionType::Put => puts.push(contract),
            }
        }
    }
    OptionChain { symbol: symbol.to_string(),
                  expiration,
                  underlying_price: underlying,
                  calls,
                  puts }
}

/// Colaboradores en memoria con un universo pequeño y fijo:
/// SPY/QQQ/AAPL (barras 2024), CPI/UNRATE/FEDFUNDS (mensual) y opciones de SPY.
pub fn demo_sources() -> DataSources {
    let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap_or_default();
    let spy = synthetic_bars(start, 250, 470.0, 1);
    let underlying = spy.last().map(|b| b.close).unwrap_or(470.0);
    let market = InMemoryMarketData::new().with_symbol("SPY", spy)
                                          .with_symbol("QQQ", synthetic_bars(start, 250, 400.0, 2))
                                          .with_symbol("AAPL", synthetic_bars(start, 250, 185.0, 3));
    let macro_start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default();
    let macro_data = InMemoryMacroData::new().with_indicator("CPI", synthetic_monthly(macro_start, 60, 258.0, 0.6, 4))
                                             .with_indicator("UNRATE", synthetic_monthly(macro_start, 60, 3.6, 0.0, 5))
                                             .with_indicator("FEDFUNDS", synthetic_monthly(macro_start, 60, 1.5, 0.06, 6));
    let exp1 = NaiveDate::from_ymd_opt(2025, 1, 17).unwrap_or_default();
    let exp2 = NaiveDate::from_ymd_opt(2025, 2, 21).unwrap_or_default();
    let options = InMemoryOptions::new().with_chain(synthetic_chain("SPY", exp1, underlying, 5.0, 8, 30.0))
                                        .with_chain(synthetic_chain("SPY", exp2, underlying, 5.0, 8, 65.0));
    DataSources::new().with_market(Arc::new(market))
                      .with_macro(Arc::new(macro_data))
                      .with_options(Arc::new(options))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bars_are_deterministic_and_skip_weekends() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(); // viernes
        let a = synthetic_bars(start, 10, 100.0, 42);
        let b = synthetic_bars(start, 10, 100.0, 42);
        assert_eq!(a, b);
        assert_eq!(a.len(), 10);
        assert!(a.iter().all(|bar| !matches!(bar.date.weekday(), Weekday::Sat | Weekday::Sun)));
        assert!(a.iter().all(|bar| bar.high >= bar.low));
    }

    #[test]
    fn chain_has_symmetric_strikes() {
        let exp = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let chain = synthetic_chain("SPY", exp, 502.0, 5.0, 3, 30.0);
        assert_eq!(chain.calls.len(), 7);
        assert_eq!(chain.puts.len(), 7);
        assert_eq!(chain.atm_strike(), Some(500.0));
    }
}
