//! Adaptadores de datos: únicas primitivas que esperan I/O.
//!
//! Las de tipo `fetch_*` consultan a los colaboradores de `DataSources` y
//! devuelven registros planos; las de tipo `extract_*`, `find_*` y `sum_*`
//! trabajan sobre esos registros sin salir del proceso.
use async_trait::async_trait;
use chrono::NaiveDate;
use fin_domain::{parse_date, Bar, DateRange, Frequency, MacroPoint, MacroQuery, OptionChain, OptionType, PriceField};
use fin_providers::ProviderError;
use serde::de::DeserializeOwned;

use super::{check_date, check_min_int, check_one_of, FnPrimitive, Family, ParamDef, ParamKind, Primitive, PrimitiveCall,
            PrimitiveRegistry};
use crate::errors::PrimitiveError;
use crate::model::StepParams;
use crate::value::Value;

/// Multiplicador clásico straddle ATM -> movimiento esperado (~1 desviación).
pub const EXPECTED_MOVE_MULTIPLIER: f64 = 0.85;

const PRICE_FIELDS: [&str; 4] = ["open", "high", "low", "close"];
const OPTION_TYPES: [&str; 2] = ["call", "put"];
const IV_SIDES: [&str; 3] = ["call", "put", "both"];

fn decode<T: DeserializeOwned>(v: &Value, what: &str) -> Result<T, PrimitiveError> {
    serde_json::from_value(v.to_json()).map_err(|e| PrimitiveError::shape(what, format!("{} ({e})", v.shape())))
}

fn encode<T: serde::Serialize>(v: &T) -> Result<Value, PrimitiveError> {
    Ok(Value::from_serialize(v)?)
}

fn date_param(call: &PrimitiveCall<'_>, name: &str) -> Result<Option<NaiveDate>, PrimitiveError> {
    call.params
        .str_opt(name)?
        .map(|s| parse_date(s).map_err(|e| PrimitiveError::invalid(name, e.to_string())))
        .transpose()
}

fn range_params(call: &PrimitiveCall<'_>) -> Result<DateRange, PrimitiveError> {
    Ok(DateRange::new(date_param(call, "start_date")?, date_param(call, "end_date")?)?)
}

fn bars_arg(call: &PrimitiveCall<'_>) -> Result<Vec<Bar>, PrimitiveError> {
    decode(call.value(0, &["bars"])?, "market bars")
}

fn macro_arg(call: &PrimitiveCall<'_>) -> Result<Vec<MacroPoint>, PrimitiveError> {
    decode(call.value(0, &["points"])?, "macro series")
}

/// Cadenas de la entrada: lista de cadenas o una cadena suelta.
fn chains_arg(call: &PrimitiveCall<'_>) -> Result<Vec<OptionChain>, PrimitiveError> {
    let v = call.value(0, &["chain"])?;
    match v {
        Value::Record(_) => Ok(vec![decode(v, "option chain")?]),
        _ => decode(v, "option chains"),
    }
}

/// Cadena del vencimiento pedido o, sin `expiration`, la más próxima.
fn chain_arg(call: &PrimitiveCall<'_>) -> Result<OptionChain, PrimitiveError> {
    let wanted = date_param(call, "expiration")?;
    let mut chains = chains_arg(call)?;
    chains.sort_by_key(|c| c.expiration);
    let found = match wanted {
        Some(exp) => chains.into_iter().find(|c| c.expiration == exp),
        None => chains.into_iter().next(),
    };
    found.ok_or_else(|| {
             let what = wanted.map(|d| format!("option chain expiring {d}")).unwrap_or_else(|| "option chain".into());
             ProviderError::NotFound(what).into()
         })
}

/// Como `chains_arg`, filtrando por `expiration` si se indica.
fn selected_chains(call: &PrimitiveCall<'_>) -> Result<Vec<OptionChain>, PrimitiveError> {
    match date_param(call, "expiration")? {
        Some(_) => Ok(vec![chain_arg(call)?]),
        None => chains_arg(call),
    }
}

fn nan_if_none(v: Option<f64>) -> f64 {
    v.unwrap_or(f64::NAN)
}

pub struct FetchMarketData;

#[async_trait]
impl Primitive for FetchMarketData {
    fn name(&self) -> &'static str {
        "fetch_market_data"
    }

    fn description(&self) -> &'static str {
        "Daily OHLCV bars for a symbol"
    }

    fn family(&self) -> Family {
        Family::Data
    }

    fn parameters(&self) -> &'static [ParamDef] {
        const P: &[ParamDef] = &[ParamDef::required("symbol", ParamKind::String, "ticker symbol"),
                                 ParamDef::optional("start_date", ParamKind::String, "first date (YYYY-MM-DD)"),
                                 ParamDef::optional("end_date", ParamKind::String, "last date (YYYY-MM-DD)"),
                                 ParamDef::optional("lookback_days", ParamKind::Integer, "keep only the last N bars")];
        P
    }

    fn validate(&self, params: &StepParams) -> Vec<String> {
        let mut errors = super::check_declared(self.parameters(), params);
        check_date(params, "start_date", &mut errors);
        check_date(params, "end_date", &mut errors);
        check_min_int(params, "lookback_days", 1, &mut errors);
        errors
    }

    async fn execute(&self, call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
        let symbol = call.params.str_req("symbol")?;
        let range = range_params(call)?;
        let mut bars = call.sources.market()?.get_bars(symbol, &range).await?;
        if let Some(n) = call.params.usize_opt("lookback_days")? {
            let skip = bars.len().saturating_sub(n);
            bars.drain(..skip);
        }
        log::debug!("step '{}': {} bars for {}", call.step_id, bars.len(), symbol);
        encode(&bars)
    }
}

pub struct GetCurrentPrice;

#[async_trait]
impl Primitive for GetCurrentPrice {
    fn name(&self) -> &'static str {
        "get_current_price"
    }

    fn description(&self) -> &'static str {
        "Latest price for a symbol"
    }

    fn family(&self) -> Family {
        Family::Data
    }

    fn parameters(&self) -> &'static [ParamDef] {
        const P: &[ParamDef] = &[ParamDef::required("symbol", ParamKind::String, "ticker symbol")];
        P
    }

    async fn execute(&self, call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
        let symbol = call.params.str_req("symbol")?;
        Ok(Value::Number(call.sources.market()?.get_current_price(symbol).await?))
    }
}

pub struct FetchMacroData;

#[async_trait]
impl Primitive for FetchMacroData {
    fn name(&self) -> &'static str {
        "fetch_macro_data"
    }

    fn description(&self) -> &'static str {
        "Macroeconomic indicator observations"
    }

    fn family(&self) -> Family {
        Family::Data
    }

    fn parameters(&self) -> &'static [ParamDef] {
        const P: &[ParamDef] = &[ParamDef::required("indicator", ParamKind::String, "indicator code (e.g. CPI)"),
                                 ParamDef::optional("start_date", ParamKind::String, "first date (YYYY-MM-DD)"),
                                 ParamDef::optional("end_date", ParamKind::String, "last date (YYYY-MM-DD)"),
                                 ParamDef::optional("frequency", ParamKind::String, "daily, weekly, monthly, quarterly or annual")];
        P
    }

    fn validate(&self, params: &StepParams) -> Vec<String> {
        let mut errors = super::check_declared(self.parameters(), params);
        check_date(params, "start_date", &mut errors);
        check_date(params, "end_date", &mut errors);
        if let Some(Value::String(f)) = params.literal("frequency") {
            if let Err(e) = f.parse::<Frequency>() {
                errors.push(format!("parameter 'frequency': {e}"));
            }
        }
        errors
    }

    async fn execute(&self, call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
        let indicator = call.params.str_req("indicator")?;
        let frequency = call.params.str_opt("frequency")?.map(str::parse::<Frequency>).transpose()?;
        let query = MacroQuery { range: range_params(call)?,
                                 frequency };
        let points = call.sources.macro_data()?.get_series(indicator, &query).await?;
        encode(&points)
    }
}

pub struct FetchOptionsChain;

#[async_trait]
impl Primitive for FetchOptionsChain {
    fn name(&self) -> &'static str {
        "fetch_options_chain"
    }

    fn description(&self) -> &'static str {
        "Option chains for a symbol, optionally for one expiration"
    }

    fn family(&self) -> Family {
        Family::Data
    }

    fn parameters(&self) -> &'static [ParamDef] {
        const P: &[ParamDef] = &[ParamDef::required("symbol", ParamKind::String, "underlying symbol"),
                                 ParamDef::optional("expiration", ParamKind::String, "expiration date (YYYY-MM-DD)")];
        P
    }

    fn validate(&self, params: &StepParams) -> Vec<String> {
        let mut errors = super::check_declared(self.parameters(), params);
        check_date(params, "expiration", &mut errors);
        errors
    }

    async fn execute(&self, call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
        let symbol = call.params.str_req("symbol")?;
        let expiration = date_param(call, "expiration")?;
        let chains = call.sources.options()?.get_chains(symbol, expiration).await?;
        Ok(Value::List(chains.iter().map(encode).collect::<Result<Vec<_>, _>>()?))
    }
}

pub struct FetchOptionQuote;

#[async_trait]
impl Primitive for FetchOptionQuote {
    fn name(&self) -> &'static str {
        "fetch_option_quote"
    }

    fn description(&self) -> &'static str {
        "Quote for a single option contract"
    }

    fn family(&self) -> Family {
        Family::Data
    }

    fn parameters(&self) -> &'static [ParamDef] {
        const P: &[ParamDef] = &[ParamDef::required("symbol", ParamKind::String, "underlying symbol"),
                                 ParamDef::required("expiration", ParamKind::String, "expiration date (YYYY-MM-DD)"),
                                 ParamDef::required("strike", ParamKind::Number, "strike price"),
                                 ParamDef::required("option_type", ParamKind::String, "call or put")];
        P
    }

    fn validate(&self, params: &StepParams) -> Vec<String> {
        let mut errors = super::check_declared(self.parameters(), params);
        check_date(params, "expiration", &mut errors);
        check_one_of(params, "option_type", &OPTION_TYPES, &mut errors);
        errors
    }

    async fn execute(&self, call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
        let symbol = call.params.str_req("symbol")?;
        let expiration = date_param(call, "expiration")?.ok_or_else(|| PrimitiveError::invalid("expiration", "is required"))?;
        let strike = call.params.f64_req("strike")?;
        let option_type: OptionType = call.params.str_req("option_type")?.parse()?;
        let quote = call.sources.options()?.get_quote(symbol, expiration, strike, option_type).await?;
        encode(&quote)
    }
}

fn run_extract_price_series(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    let field: PriceField = call.params.str_or("field", "close")?.parse()?;
    Ok(Value::Series(bars_arg(call)?.iter().map(|b| b.price(field)).collect()))
}

fn run_extract_volume_series(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    Ok(Value::Series(bars_arg(call)?.iter().map(|b| b.volume).collect()))
}

fn run_extract_date_labels(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    Ok(Value::List(bars_arg(call)?.iter().map(|b| Value::String(b.date.to_string())).collect()))
}

fn run_extract_macro_values(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    Ok(Value::Series(macro_arg(call)?.iter().map(|p| p.value).collect()))
}

fn run_extract_macro_dates(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    Ok(Value::List(macro_arg(call)?.iter().map(|p| Value::String(p.date.to_string())).collect()))
}

fn run_find_atm_strike(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    Ok(Value::Number(nan_if_none(chain_arg(call)?.atm_strike())))
}

struct Straddle {
    chain: OptionChain,
    strike: f64,
    call_price: f64,
    put_price: f64,
}

impl Straddle {
    fn price(&self) -> f64 {
        self.call_price + self.put_price
    }
}

fn straddle(call: &PrimitiveCall<'_>) -> Result<Straddle, PrimitiveError> {
    let chain = chain_arg(call)?;
    let strike = nan_if_none(chain.atm_strike());
    let mid = |t: OptionType| nan_if_none(chain.leg(t, strike).and_then(|c| c.mid_price()));
    let (call_price, put_price) = (mid(OptionType::Call), mid(OptionType::Put));
    Ok(Straddle { chain,
                  strike,
                  call_price,
                  put_price })
}

fn run_find_atm_straddle(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    let s = straddle(call)?;
    Ok(Value::record([("expiration", Value::String(s.chain.expiration.to_string())),
                      ("underlying_price", Value::Number(s.chain.underlying_price)),
                      ("strike", Value::Number(s.strike)),
                      ("call_price", Value::Number(s.call_price)),
                      ("put_price", Value::Number(s.put_price)),
                      ("straddle_price", Value::Number(s.price()))]))
}

fn run_calculate_expected_move(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    let multiplier = call.params.f64_or("multiplier", EXPECTED_MOVE_MULTIPLIER)?;
    let s = straddle(call)?;
    let underlying = s.chain.underlying_price;
    let expected = s.price() * multiplier;
    let percent = if underlying > 0.0 { expected / underlying * 100.0 } else { f64::NAN };
    Ok(Value::record([("expiration", Value::String(s.chain.expiration.to_string())),
                      ("underlying_price", Value::Number(underlying)),
                      ("straddle_price", Value::Number(s.price())),
                      ("expected_move", Value::Number(expected)),
                      ("expected_move_percent", Value::Number(percent)),
                      ("upper_bound", Value::Number(underlying + expected)),
                      ("lower_bound", Value::Number(underlying - expected))]))
}

fn run_extract_implied_volatilities(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    let side = call.params.str_or("side", "call")?;
    let chain = chain_arg(call)?;
    let iv_of = |t: OptionType, strike: f64| chain.leg(t, strike).and_then(|c| c.implied_volatility);
    let mut strikes: Vec<f64> = match side {
        "call" => chain.calls.iter().map(|c| c.strike).collect(),
        "put" => chain.puts.iter().map(|c| c.strike).collect(),
        "both" => chain.calls.iter().chain(chain.puts.iter()).map(|c| c.strike).collect(),
        other => return Err(PrimitiveError::invalid("side", format!("must be call, put or both (got '{other}')"))),
    };
    strikes.sort_by(f64::total_cmp);
    strikes.dedup();
    let ivs = strikes.iter().map(|&k| match side {
                                "call" => nan_if_none(iv_of(OptionType::Call, k)),
                                "put" => nan_if_none(iv_of(OptionType::Put, k)),
                                _ => match (iv_of(OptionType::Call, k), iv_of(OptionType::Put, k)) {
                                    (Some(c), Some(p)) => (c + p) / 2.0,
                                    (Some(v), None) | (None, Some(v)) => v,
                                    (None, None) => f64::NAN,
                                },
                            })
                            .collect();
    Ok(Value::Series(ivs))
}

fn sum_legs(call: &PrimitiveCall<'_>, t: OptionType, f: fn(&fin_domain::OptionContract) -> f64) -> Result<Value, PrimitiveError> {
    let chains = selected_chains(call)?;
    Ok(Value::Number(chains.iter().flat_map(|c| c.legs(t)).map(f).filter(|x| x.is_finite()).sum()))
}

fn run_sum_call_volume(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    sum_legs(call, OptionType::Call, |c| c.volume)
}

fn run_sum_put_volume(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    sum_legs(call, OptionType::Put, |c| c.volume)
}

fn run_sum_call_open_interest(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    sum_legs(call, OptionType::Call, |c| c.open_interest)
}

fn run_sum_put_open_interest(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    sum_legs(call, OptionType::Put, |c| c.open_interest)
}

fn check_price_field(params: &StepParams) -> Vec<String> {
    let mut errors = Vec::new();
    check_one_of(params, "field", &PRICE_FIELDS, &mut errors);
    errors
}

fn check_expiration(params: &StepParams) -> Vec<String> {
    let mut errors = Vec::new();
    check_date(params, "expiration", &mut errors);
    errors
}

fn check_iv(params: &StepParams) -> Vec<String> {
    let mut errors = check_expiration(params);
    check_one_of(params, "side", &IV_SIDES, &mut errors);
    errors
}

const BARS: &[ParamDef] = &[ParamDef::optional("bars", ParamKind::Sequence, "bars when no input is given")];
const PRICE: &[ParamDef] = &[ParamDef::optional("bars", ParamKind::Sequence, "bars when no input is given"),
                             ParamDef::optional("field", ParamKind::String, "open, high, low or close").with_default("close")];
const POINTS: &[ParamDef] = &[ParamDef::optional("points", ParamKind::Sequence, "observations when no input is given")];
const CHAIN: &[ParamDef] = &[ParamDef::optional("chain", ParamKind::Any, "chain(s) when no input is given"),
                             ParamDef::optional("expiration", ParamKind::String, "pick this expiration").with_default("nearest")];
const EXPECTED_MOVE: &[ParamDef] =
    &[ParamDef::optional("chain", ParamKind::Any, "chain(s) when no input is given"),
      ParamDef::optional("expiration", ParamKind::String, "pick this expiration").with_default("nearest"),
      ParamDef::optional("multiplier", ParamKind::Number, "straddle multiplier").with_default("0.85")];
const IV: &[ParamDef] = &[ParamDef::optional("chain", ParamKind::Any, "chain(s) when no input is given"),
                          ParamDef::optional("expiration", ParamKind::String, "pick this expiration").with_default("nearest"),
                          ParamDef::optional("side", ParamKind::String, "call, put or both").with_default("call")];
const SUMS: &[ParamDef] = &[ParamDef::optional("chain", ParamKind::Any, "chain(s) when no input is given"),
                            ParamDef::optional("expiration", ParamKind::String, "only this expiration").with_default("all")];

fn data(name: &'static str, description: &'static str, params: &'static [ParamDef], run: super::SyncRun) -> FnPrimitive {
    FnPrimitive { name,
                  description,
                  family: Family::Data,
                  params,
                  check: None,
                  run }
}

pub(crate) fn register(reg: &mut PrimitiveRegistry) {
    reg.register(FetchMarketData);
    reg.register(FnPrimitive { check: Some(check_price_field),
                               ..data("extract_price_series", "Price column from bars", PRICE, run_extract_price_series) });
    reg.register(data("extract_volume_series", "Volume column from bars", BARS, run_extract_volume_series));
    reg.register(data("extract_date_labels", "Dates of bars as labels", BARS, run_extract_date_labels));
    reg.register(GetCurrentPrice);
    reg.register(FetchMacroData);
    reg.register(data("extract_macro_values", "Values of a macro series", POINTS, run_extract_macro_values));
    reg.register(data("extract_macro_dates", "Dates of a macro series as labels", POINTS, run_extract_macro_dates));
    reg.register(FetchOptionsChain);
    reg.register(FetchOptionQuote);
    reg.register(FnPrimitive { check: Some(check_expiration),
                               ..data("find_atm_strike", "Strike closest to the underlying price", CHAIN, run_find_atm_strike) });
    reg.register(FnPrimitive { check: Some(check_expiration),
                               ..data("find_atm_straddle", "At-the-money straddle prices", CHAIN, run_find_atm_straddle) });
    reg.register(FnPrimitive { check: Some(check_expiration),
                               ..data("calculate_expected_move",
                                      "Expected move implied by the ATM straddle",
                                      EXPECTED_MOVE,
                                      run_calculate_expected_move) });
    reg.register(FnPrimitive { check: Some(check_iv),
                               ..data("extract_implied_volatilities",
                                      "Implied volatilities ordered by strike",
                                      IV,
                                      run_extract_implied_volatilities) });
    reg.register(FnPrimitive { check: Some(check_expiration),
                               ..data("sum_call_volume", "Total call volume", SUMS, run_sum_call_volume) });
    reg.register(FnPrimitive { check: Some(check_expiration),
                               ..data("sum_put_volume", "Total put volume", SUMS, run_sum_put_volume) });
    reg.register(FnPrimitive { check: Some(check_expiration),
                               ..data("sum_call_open_interest", "Total call open interest", SUMS, run_sum_call_open_interest) });
    reg.register(FnPrimitive { check: Some(check_expiration),
                               ..data("sum_put_open_interest", "Total put open interest", SUMS, run_sum_put_open_interest) });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ParamValue;
    use crate::primitives::call::testing::{number, run, run_with, series};
    use fin_domain::OptionContract;
    use fin_providers::fixtures::demo_sources;
    use fin_providers::DataSources;

    fn contract(strike: f64, option_type: OptionType, bid: f64, ask: f64, iv: Option<f64>) -> OptionContract {
        OptionContract { strike,
                         option_type,
                         bid,
                         ask,
                         last: None,
                         volume: strike,
                         open_interest: 10.0,
                         implied_volatility: iv,
                         greeks: None }
    }

    fn chain() -> Value {
        let exp = NaiveDate::from_ymd_opt(2025, 1, 17).unwrap();
        let c = OptionChain { symbol: "XYZ".into(),
                              expiration: exp,
                              underlying_price: 102.5,
                              calls: vec![contract(100.0, OptionType::Call, 4.0, 5.0, Some(0.2)),
                                          contract(105.0, OptionType::Call, 2.0, 2.5, Some(0.18))],
                              puts: vec![contract(100.0, OptionType::Put, 1.0, 2.0, Some(0.24)),
                                         contract(105.0, OptionType::Put, 3.5, 4.5, None)] };
        Value::List(vec![Value::from_serialize(&c).unwrap()])
    }

    #[test]
    fn fetch_then_extract_closes() {
        let sources = demo_sources();
        let bars = run_with("fetch_market_data",
                            vec![],
                            vec![("symbol", Value::from("spy")),
                                 ("start_date", Value::from("2024-01-01")),
                                 ("end_date", Value::from("2024-01-31"))],
                            &sources).unwrap();
        let n = bars.seq_len().unwrap();
        assert!(n > 15 && n <= 23, "january has ~21 trading days, got {n}");
        let closes = series(run("extract_price_series", vec![bars.clone()], vec![]).unwrap());
        assert_eq!(closes.len(), n);
        let labels = run("extract_date_labels", vec![bars], vec![]).unwrap();
        assert_eq!(labels.seq_get(0), Some(Value::from("2024-01-02")));
    }

    #[test]
    fn lookback_keeps_last_bars() {
        let bars = run_with("fetch_market_data",
                            vec![],
                            vec![("symbol", Value::from("QQQ")), ("lookback_days", Value::Number(5.0))],
                            &demo_sources()).unwrap();
        assert_eq!(bars.seq_len(), Some(5));
    }

    #[test]
    fn missing_collaborator_is_an_error() {
        let err = run_with("get_current_price", vec![], vec![("symbol", Value::from("SPY"))], &DataSources::new()).unwrap_err();
        assert!(err.to_string().contains("no market data provider configured"));
    }

    #[test]
    fn macro_values_and_dates() {
        let points = run_with("fetch_macro_data",
                              vec![],
                              vec![("indicator", Value::from("CPI")), ("start_date", Value::from("2023-01-01"))],
                              &demo_sources()).unwrap();
        let values = series(run("extract_macro_values", vec![points.clone()], vec![]).unwrap());
        let dates = run("extract_macro_dates", vec![points], vec![]).unwrap();
        assert_eq!(values.len(), dates.seq_len().unwrap());
        assert!(!values.is_empty());
    }

    #[test]
    fn atm_straddle_and_expected_move() {
        // 102.5 equidista de 100 y 105: gana el strike menor.
        assert_eq!(number(run("find_atm_strike", vec![chain()], vec![]).unwrap()), 100.0);
        let straddle = run("find_atm_straddle", vec![chain()], vec![]).unwrap();
        assert_eq!(straddle.child("straddle_price"), Some(Value::Number(6.0)));
        let mv = run("calculate_expected_move", vec![chain()], vec![("multiplier", Value::Number(1.0))]).unwrap();
        assert_eq!(mv.child("expected_move"), Some(Value::Number(6.0)));
        assert_eq!(mv.child("upper_bound"), Some(Value::Number(108.5)));
    }

    #[test]
    fn implied_vols_by_side() {
        let calls = series(run("extract_implied_volatilities", vec![chain()], vec![]).unwrap());
        assert_eq!(calls, vec![0.2, 0.18]);
        let puts = series(run("extract_implied_volatilities", vec![chain()], vec![("side", Value::from("put"))]).unwrap());
        assert_eq!(puts[0], 0.24);
        assert!(puts[1].is_nan());
        let both = series(run("extract_implied_volatilities", vec![chain()], vec![("side", Value::from("both"))]).unwrap());
        assert!((both[0] - 0.22).abs() < 1e-12);
        assert_eq!(both[1], 0.18);
    }

    #[test]
    fn volume_and_open_interest_sums() {
        assert_eq!(number(run("sum_call_volume", vec![chain()], vec![]).unwrap()), 205.0);
        assert_eq!(number(run("sum_put_open_interest", vec![chain()], vec![]).unwrap()), 20.0);
        let err = run("sum_put_volume", vec![chain()], vec![("expiration", Value::from("2030-01-01"))]).unwrap_err();
        assert!(err.to_string().contains("2030-01-01"));
    }

    #[test]
    fn chains_from_provider_feed_analytics() {
        let sources = demo_sources();
        let chains = run_with("fetch_options_chain", vec![], vec![("symbol", Value::from("SPY"))], &sources).unwrap();
        assert_eq!(chains.seq_len(), Some(2));
        let strike = number(run("find_atm_strike", vec![chains.clone()], vec![]).unwrap());
        assert!(strike.is_finite());
        let quote = run_with("fetch_option_quote",
                             vec![],
                             vec![("symbol", Value::from("SPY")),
                                  ("expiration", Value::from("2025-01-17")),
                                  ("strike", Value::Number(strike)),
                                  ("option_type", Value::from("call"))],
                             &sources).unwrap();
        assert_eq!(quote.child("strike"), Some(Value::Number(strike)));
    }

    #[test]
    fn validation_of_literals() {
        let p = get("fetch_market_data");
        let bad = StepParams::new().with("symbol", ParamValue::literal("SPY"))
                                   .with("start_date", ParamValue::literal("01/02/2024"));
        assert_eq!(p.validate(&bad).len(), 1);
        assert_eq!(p.validate(&StepParams::new()), vec!["missing required parameter 'symbol'".to_string()]);
        let q = get("fetch_option_quote");
        let bad_type = StepParams::new().with("symbol", ParamValue::literal("SPY"))
                                        .with("expiration", ParamValue::literal("2025-01-17"))
                                        .with("strike", ParamValue::literal(500.0))
                                        .with("option_type", ParamValue::literal("straddle"));
        assert_eq!(q.validate(&bad_type).len(), 1);
    }

    fn get(name: &str) -> std::sync::Arc<dyn Primitive> {
        crate::primitives::get_primitive(name).unwrap()
    }
}
