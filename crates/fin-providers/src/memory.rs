//! Implementaciones en memoria de los colaboradores.
//!
//! Sirven datos precargados (típicamente de `fixtures`) y pueden simular
//! latencia de red con `with_latency`, lo que permite probar el timeout
//! global del motor sin tocar la red.
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use fin_domain::{Bar, DateRange, Frequency, MacroPoint, MacroQuery, OptionChain, OptionContract, OptionType};
use log::debug;
use std::collections::HashMap;
use std::time::Duration;

use crate::{MacroDataProvider, MarketDataProvider, OptionsProvider, ProviderError};

async fn simulate_latency(latency: Option<Duration>) {
    if let Some(d) = latency {
        tokio::time::sleep(d).await;
    }
}

fn key(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryMarketData {
    bars: HashMap<String, Vec<Bar>>,
    latency: Option<Duration>,
}

impl InMemoryMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra las barras de un símbolo (se ordenan por fecha).
    pub fn with_symbol(mut self, symbol: &str, mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|b| b.date);
        self.bars.insert(key(symbol), bars);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn symbols(&self) -> Vec<String> {
        let mut s: Vec<String> = self.bars.keys().cloned().collect();
        s.sort();
        s
    }
}

#[async_trait]
impl MarketDataProvider for InMemoryMarketData {
    fn get_name(&self) -> &str {
        "in_memory_market"
    }

    async fn get_bars(&self, symbol: &str, range: &DateRange) -> Result<Vec<Bar>, ProviderError> {
        simulate_latency(self.latency).await;
        let bars = self.bars.get(&key(symbol)).ok_or_else(|| ProviderError::NotFound(format!("symbol '{symbol}'")))?;
        let out: Vec<Bar> = bars.iter().filter(|b| range.contains(b.date)).cloned().collect();
        debug!("get_bars symbol={symbol} count={}", out.len());
        Ok(out)
    }

    async fn get_current_price(&self, symbol: &str) -> Result<f64, ProviderError> {
        simulate_latency(self.latency).await;
        self.bars
            .get(&key(symbol))
            .and_then(|b| b.last())
            .map(|b| b.close)
            .ok_or_else(|| ProviderError::NotFound(format!("symbol '{symbol}'")))
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryMacroData {
    series: HashMap<String, Vec<MacroPoint>>,
    latency: Option<Duration>,
}

impl InMemoryMacroData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_indicator(mut self, indicator: &str, mut points: Vec<MacroPoint>) -> Self {
        points.sort_by_key(|p| p.date);
        self.series.insert(key(indicator), points);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

/// Clave de agrupación por periodo para remuestrear a una frecuencia menor.
fn period_key(date: NaiveDate, frequency: Frequency) -> (i32, u32) {
    match frequency {
        Frequency::Daily => (date.year(), date.ordinal()),
        Frequency::Weekly => {
            let w = date.iso_week();
            (w.year(), w.week())
        }
        Frequency::Monthly => (date.year(), date.month()),
        Frequency::Quarterly => (date.year(), (date.month() - 1) / 3),
        Frequency::Annual => (date.year(), 0),
    }
}

/// Conserva el último punto de cada periodo.
fn resample(points: Vec<MacroPoint>, frequency: Frequency) -> Vec<MacroPoint> {
    let mut out: Vec<MacroPoint> = Vec::with_capacity(points.len());
    for p in points {
        match out.last_mut() {
            Some(last) if period_key(last.date, frequency) == period_key(p.date, frequency) => *last = p,
            _ => out.push(p),
        }
    }
    out
}

#[async_trait]
impl MacroDataProvider for InMemoryMacroData {
    fn get_name(&self) -> &str {
        "in_memory_macro"
    }

    async fn get_series(&self, indicator: &str, query: &MacroQuery) -> Result<Vec<MacroPoint>, ProviderError> {
        simulate_latency(self.latency).await;
        let points = self.series
                         .get(&key(indicator))
                         .ok_or_else(|| ProviderError::NotFound(format!("indicator '{indicator}'")))?;
        let in_range: Vec<MacroPoint> = points.iter().filter(|p| query.range.contains(p.date)).cloned().collect();
        Ok(match query.frequency {
            Some(f) => resample(in_range, f),
            None => in_range,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryOptions {
    chains: HashMap<String, Vec<OptionChain>>,
    latency: Option<Duration>,
}

impl InMemoryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chain(mut self, chain: OptionChain) -> Self {
        let entry = self.chains.entry(key(&chain.symbol)).or_default();
        entry.push(chain);
        entry.sort_by_key(|c| c.expiration);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

#[async_trait]
impl OptionsProvider for InMemoryOptions {
    fn get_name(&self) -> &str {
        "in_memory_options"
    }

    async fn get_chains(&self, symbol: &str, expiration: Option<NaiveDate>) -> Result<Vec<OptionChain>, ProviderError> {
        simulate_latency(self.latency).await;
        let chains = self.chains.get(&key(symbol)).ok_or_else(|| ProviderError::NotFound(format!("options for '{symbol}'")))?;
        let out: Vec<OptionChain> = chains.iter()
                                          .filter(|c| expiration.map_or(true, |e| c.expiration == e))
                                          .cloned()
                                          .collect();
        if out.is_empty() {
            return Err(ProviderError::NotFound(format!("no chain for '{symbol}' expiring {}",
                                                       expiration.map(|e| e.to_string()).unwrap_or_default())));
        }
        Ok(out)
    }

    async fn get_quote(&self,
                       symbol: &str,
                       expiration: NaiveDate,
                       strike: f64,
                       option_type: OptionType)
                       -> Result<OptionContract, ProviderError> {
        let chains = self.get_chains(symbol, Some(expiration)).await?;
        chains.iter()
              .find_map(|c| c.leg(option_type, strike).cloned())
              .ok_or_else(|| ProviderError::NotFound(format!("{symbol} {expiration} {strike} {option_type}")))
    }
}
