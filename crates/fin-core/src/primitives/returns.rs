//! Rendimientos y riesgo sobre una serie temporal ordenada.
//!
//! Las primeras `periods` posiciones no tienen historia y quedan en NaN.
use super::stats::{check_window, valid};
use super::{check_min_int, FnPrimitive, Family, ParamDef, ParamKind, PrimitiveCall, PrimitiveRegistry};
use crate::errors::PrimitiveError;
use crate::model::StepParams;
use crate::value::Value;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// `out[i] = f(values[i - periods], values[i])`.
pub fn shifted(values: &[f64], periods: usize, f: impl Fn(f64, f64) -> f64) -> Vec<f64> {
    (0..values.len()).map(|i| if i < periods { f64::NAN } else { f(values[i - periods], values[i]) })
                     .collect()
}

fn relative_change(prev: f64, cur: f64) -> f64 {
    if prev == 0.0 {
        f64::NAN
    } else {
        (cur - prev) / prev
    }
}

/// Cambio porcentual (x100) respecto a `periods` posiciones atrás.
pub fn percent_change(values: &[f64], periods: usize) -> Vec<f64> {
    shifted(values, periods, |p, c| relative_change(p, c) * 100.0)
}

pub fn log_return(values: &[f64], periods: usize) -> Vec<f64> {
    shifted(values, periods, |p, c| if p > 0.0 && c > 0.0 { (c / p).ln() } else { f64::NAN })
}

pub fn diff(values: &[f64], periods: usize) -> Vec<f64> {
    shifted(values, periods, |p, c| c - p)
}

/// Compone rendimientos decimales: `prod(1 + r) - 1` acumulado. Las
/// posiciones NaN quedan NaN sin romper la composición.
pub fn cumulative_return(returns: &[f64]) -> Vec<f64> {
    let mut growth = 1.0;
    returns.iter()
           .map(|&r| {
               if r.is_nan() {
                   f64::NAN
               } else {
                   growth *= 1.0 + r;
                   growth - 1.0
               }
           })
           .collect()
}

/// Rebasa la serie para que el primer valor definido y no nulo valga `base`.
pub fn normalize_series(values: &[f64], base: f64) -> Vec<f64> {
    match values.iter().copied().find(|v| !v.is_nan() && *v != 0.0) {
        Some(first) => values.iter().map(|v| v / first * base).collect(),
        None => vec![f64::NAN; values.len()],
    }
}

/// Rendimiento anualizado a partir de rendimientos periódicos decimales.
pub fn annualize_return(returns: &[f64], periods_per_year: f64) -> f64 {
    let r = valid(returns);
    if r.is_empty() {
        return f64::NAN;
    }
    let growth: f64 = r.iter().map(|x| 1.0 + x).product();
    if growth <= 0.0 {
        return f64::NAN;
    }
    growth.powf(periods_per_year / r.len() as f64) - 1.0
}

/// Caída porcentual (<= 0) de cada punto respecto al máximo previo.
pub fn drawdown(values: &[f64]) -> Vec<f64> {
    let mut peak = f64::NAN;
    values.iter()
          .map(|&x| {
              if x.is_nan() {
                  return f64::NAN;
              }
              peak = if peak.is_nan() { x } else { peak.max(x) };
              if peak <= 0.0 {
                  f64::NAN
              } else {
                  (x - peak) / peak * 100.0
              }
          })
          .collect()
}

fn periods(call: &PrimitiveCall<'_>) -> Result<usize, PrimitiveError> {
    let p = call.params.usize_or("periods", 1)?;
    if p == 0 {
        return Err(PrimitiveError::invalid("periods", "must be >= 1"));
    }
    Ok(p)
}

fn check_periods(params: &StepParams) -> Vec<String> {
    let mut errors = Vec::new();
    check_min_int(params, "periods", 1, &mut errors);
    errors
}

fn check_annualize(params: &StepParams) -> Vec<String> {
    let mut errors = Vec::new();
    if let Some(Value::Number(n)) = params.literal("periods_per_year") {
        if *n <= 0.0 {
            errors.push("parameter 'periods_per_year' must be positive".to_string());
        }
    }
    errors
}

fn run_percent_change(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    let mut out = percent_change(&call.first_series()?, periods(call)?);
    if call.params.bool_or("decimal", false)? {
        out.iter_mut().for_each(|x| *x /= 100.0);
    }
    Ok(Value::Series(out))
}

fn run_log_return(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    Ok(Value::Series(log_return(&call.first_series()?, periods(call)?)))
}

fn run_diff(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    Ok(Value::Series(diff(&call.first_series()?, periods(call)?)))
}

fn run_cumulative_return(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    Ok(Value::Series(cumulative_return(&call.first_series()?)))
}

fn run_rolling_return(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    let window = call.params.usize_req("window")?;
    if window == 0 {
        return Err(PrimitiveError::invalid("window", "must be >= 1"));
    }
    let scale = if call.params.bool_or("decimal", false)? { 1.0 } else { 100.0 };
    Ok(Value::Series(shifted(&call.first_series()?, window, |p, c| relative_change(p, c) * scale)))
}

fn run_normalize_series(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    let base = call.params.f64_or("base", 100.0)?;
    Ok(Value::Series(normalize_series(&call.first_series()?, base)))
}

fn run_annualize_return(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    let ppy = call.params.f64_or("periods_per_year", TRADING_DAYS_PER_YEAR)?;
    if ppy <= 0.0 {
        return Err(PrimitiveError::invalid("periods_per_year", "must be positive"));
    }
    Ok(Value::Number(annualize_return(&call.first_series()?, ppy)))
}

fn run_drawdown(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    Ok(Value::Series(drawdown(&call.first_series()?)))
}

const VALUES: ParamDef = ParamDef::optional("values", ParamKind::Sequence, "input sequence when no input is given");
const PERIODS: ParamDef = ParamDef::optional("periods", ParamKind::Integer, "lag in positions").with_default("1");
const LAGGED: &[ParamDef] = &[VALUES, PERIODS];
const PCT: &[ParamDef] = &[VALUES, PERIODS, ParamDef::optional("decimal", ParamKind::Boolean, "return fractions instead of percent")];
const ONE: &[ParamDef] = &[VALUES];
const ROLLING: &[ParamDef] = &[VALUES,
                               ParamDef::required("window", ParamKind::Integer, "lookback in positions"),
                               ParamDef::optional("decimal", ParamKind::Boolean, "return fractions instead of percent")];
const NORMALIZE: &[ParamDef] = &[VALUES, ParamDef::optional("base", ParamKind::Number, "value of the first point").with_default("100")];
const ANNUALIZE: &[ParamDef] =
    &[VALUES, ParamDef::optional("periods_per_year", ParamKind::Number, "observations per year").with_default("252")];

fn ret(name: &'static str, description: &'static str, params: &'static [ParamDef], run: super::SyncRun) -> FnPrimitive {
    FnPrimitive { name,
                  description,
                  family: Family::Returns,
                  params,
                  check: None,
                  run }
}

pub(crate) fn register(reg: &mut PrimitiveRegistry) {
    reg.register(FnPrimitive { check: Some(check_periods),
                               ..ret("percent_change", "Percent change over a lag", PCT, run_percent_change) });
    reg.register(FnPrimitive { check: Some(check_periods),
                               ..ret("log_return", "Logarithmic return over a lag", LAGGED, run_log_return) });
    reg.register(ret("cumulative_return",
                     "Compounded return of decimal periodic returns",
                     ONE,
                     run_cumulative_return));
    reg.register(FnPrimitive { check: Some(check_periods),
                               ..ret("diff", "Difference over a lag", LAGGED, run_diff) });
    reg.register(FnPrimitive { check: Some(check_window),
                               ..ret("rolling_return", "Percent return over a trailing window", ROLLING, run_rolling_return) });
    reg.register(ret("normalize_series", "Rebase a series to a starting value", NORMALIZE, run_normalize_series));
    reg.register(FnPrimitive { check: Some(check_annualize),
                               ..ret("annualize_return", "Annualized compound return", ANNUALIZE, run_annualize_return) });
    reg.register(ret("drawdown", "Percent decline from the running maximum", ONE, run_drawdown));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::call::testing::{assert_close, number, run, series};

    const NAN: f64 = f64::NAN;

    #[test]
    fn percent_change_of_prices() {
        let out = run("percent_change", vec![Value::Series(vec![100.0, 110.0, 99.0])], vec![]).unwrap();
        assert_close(&series(out), &[NAN, 10.0, -10.0]);
    }

    #[test]
    fn percent_change_decimal_and_zero_base() {
        let out = run("percent_change",
                      vec![Value::Series(vec![0.0, 5.0, 10.0])],
                      vec![("decimal", Value::Bool(true))]).unwrap();
        assert_close(&series(out), &[NAN, NAN, 1.0]);
    }

    #[test]
    fn lagged_variants() {
        assert_close(&diff(&[1.0, 4.0, 9.0], 2), &[NAN, NAN, 8.0]);
        assert_close(&log_return(&[1.0, std::f64::consts::E, -1.0], 1), &[NAN, 1.0, NAN]);
    }

    #[test]
    fn cumulative_return_compounds_decimals() {
        assert_close(&cumulative_return(&[NAN, 0.1, 0.1]), &[NAN, 0.1, 0.21]);
    }

    #[test]
    fn rolling_return_percent() {
        let out = run("rolling_return", vec![Value::Series(vec![100.0, 105.0, 120.0])], vec![("window", Value::Number(2.0))]).unwrap();
        assert_close(&series(out), &[NAN, NAN, 20.0]);
    }

    #[test]
    fn normalize_rebases_to_first_valid() {
        assert_close(&normalize_series(&[NAN, 50.0, 75.0], 100.0), &[NAN, 100.0, 150.0]);
        assert_close(&normalize_series(&[0.0, 0.0], 100.0), &[NAN, NAN]);
    }

    #[test]
    fn annualize_compounds_to_year() {
        let r = annualize_return(&[0.01; 12], 12.0);
        assert!((r - (1.01f64.powi(12) - 1.0)).abs() < 1e-12);
        assert!(annualize_return(&[], 252.0).is_nan());
        let out = run("annualize_return", vec![Value::Series(vec![0.0, 0.0])], vec![]).unwrap();
        assert_eq!(number(out), 0.0);
    }

    #[test]
    fn drawdown_tracks_running_peak() {
        assert_close(&drawdown(&[100.0, 120.0, 90.0, NAN, 130.0]), &[0.0, 0.0, -25.0, NAN, 0.0]);
    }
}
