//! Estadística de dos series: correlación, regresión, beta, Sharpe.
//!
//! Antes de calcular se descartan los índices donde cualquiera de las dos
//! series es NaN. Menos de dos pares válidos o varianza nula dan NaN.
use super::returns::TRADING_DAYS_PER_YEAR;
use super::stats::{check_window, mean, std_dev, window_params};
use super::{check_min_int, FnPrimitive, Family, ParamDef, ParamKind, PrimitiveCall, PrimitiveRegistry};
use crate::errors::PrimitiveError;
use crate::model::StepParams;
use crate::value::Value;

fn same_len(x: &[f64], y: &[f64]) -> Result<(), PrimitiveError> {
    if x.len() != y.len() {
        return Err(PrimitiveError::LengthMismatch { left: x.len(),
                                                    right: y.len() });
    }
    Ok(())
}

/// Pares donde ambos lados están definidos.
pub fn paired(x: &[f64], y: &[f64]) -> (Vec<f64>, Vec<f64>) {
    x.iter().zip(y).filter(|(a, b)| !a.is_nan() && !b.is_nan()).map(|(a, b)| (*a, *b)).unzip()
}

pub fn covariance(x: &[f64], y: &[f64], ddof: usize) -> f64 {
    let (x, y) = paired(x, y);
    let n = x.len();
    if n < 2 || n <= ddof {
        return f64::NAN;
    }
    let mx = x.iter().sum::<f64>() / n as f64;
    let my = y.iter().sum::<f64>() / n as f64;
    let sum: f64 = x.iter().zip(&y).map(|(a, b)| (a - mx) * (b - my)).sum();
    sum / (n - ddof) as f64
}

/// Coeficiente de Pearson.
pub fn correlation(x: &[f64], y: &[f64]) -> f64 {
    let (x, y) = paired(x, y);
    if x.len() < 2 {
        return f64::NAN;
    }
    let sx = std_dev(&x, 1);
    let sy = std_dev(&y, 1);
    if sx == 0.0 || sy == 0.0 || sx.is_nan() || sy.is_nan() {
        return f64::NAN;
    }
    covariance(&x, &y, 1) / (sx * sy)
}

pub fn rolling_correlation(x: &[f64], y: &[f64], window: usize, min_periods: usize) -> Vec<f64> {
    let window = window.max(1);
    let min_periods = min_periods.max(2);
    (0..x.len()).map(|i| {
                    let start = (i + 1).saturating_sub(window);
                    let (wx, wy) = paired(&x[start..=i], &y[start..=i]);
                    if wx.len() < min_periods {
                        f64::NAN
                    } else {
                        correlation(&wx, &wy)
                    }
                })
                .collect()
}

/// Sensibilidad de `asset` respecto a `benchmark`: cov / var(benchmark).
pub fn beta(asset: &[f64], benchmark: &[f64]) -> f64 {
    let (a, b) = paired(asset, benchmark);
    let var_b = std_dev(&b, 1).powi(2);
    if var_b == 0.0 || var_b.is_nan() {
        return f64::NAN;
    }
    covariance(&a, &b, 1) / var_b
}

pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64, periods_per_year: Option<f64>) -> f64 {
    let excess: Vec<f64> = returns.iter().map(|r| r - risk_free_rate).collect();
    let m = mean(&excess);
    let s = std_dev(&excess, 1);
    if s == 0.0 || s.is_nan() {
        return f64::NAN;
    }
    let ratio = m / s;
    match periods_per_year {
        Some(ppy) => ratio * ppy.sqrt(),
        None => ratio,
    }
}

pub fn autocorrelation(values: &[f64], lag: usize) -> f64 {
    if lag >= values.len() {
        return f64::NAN;
    }
    correlation(&values[lag..], &values[..values.len() - lag])
}

#[derive(Debug, Clone, PartialEq)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub predicted: Vec<f64>,
}

impl Regression {
    pub fn into_value(self) -> Value {
        Value::record([("slope", Value::Number(self.slope)),
                       ("intercept", Value::Number(self.intercept)),
                       ("r_squared", Value::Number(self.r_squared)),
                       ("predicted", Value::Series(self.predicted))])
    }
}

/// Mínimos cuadrados ordinarios de `y` sobre `x`.
pub fn linear_regression(x: &[f64], y: &[f64]) -> Regression {
    let (px, py) = paired(x, y);
    let n = px.len();
    let undefined = Regression { slope: f64::NAN,
                                 intercept: f64::NAN,
                                 r_squared: f64::NAN,
                                 predicted: vec![f64::NAN; x.len()] };
    if n < 2 {
        return undefined;
    }
    let mx = px.iter().sum::<f64>() / n as f64;
    let my = py.iter().sum::<f64>() / n as f64;
    let sxx: f64 = px.iter().map(|a| (a - mx).powi(2)).sum();
    if sxx == 0.0 {
        return undefined;
    }
    let sxy: f64 = px.iter().zip(&py).map(|(a, b)| (a - mx) * (b - my)).sum();
    let slope = sxy / sxx;
    let intercept = my - slope * mx;
    let ss_tot: f64 = py.iter().map(|b| (b - my).powi(2)).sum();
    let ss_res: f64 = px.iter().zip(&py).map(|(a, b)| (b - (intercept + slope * a)).powi(2)).sum();
    let r_squared = if ss_tot == 0.0 { f64::NAN } else { 1.0 - ss_res / ss_tot };
    Regression { slope,
                 intercept,
                 r_squared,
                 predicted: x.iter().map(|a| intercept + slope * a).collect() }
}

fn two_series(call: &PrimitiveCall<'_>) -> Result<(Vec<f64>, Vec<f64>), PrimitiveError> {
    let x = call.series(0, &["x", "values"])?.into_owned();
    let y = call.series(1, &["y", "other"])?.into_owned();
    same_len(&x, &y)?;
    Ok((x, y))
}

fn run_correlation(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    let (x, y) = two_series(call)?;
    Ok(Value::Number(correlation(&x, &y)))
}

fn run_rolling_correlation(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    let (x, y) = two_series(call)?;
    let (window, min_periods) = window_params(call)?;
    Ok(Value::Series(rolling_correlation(&x, &y, window, min_periods)))
}

fn run_covariance(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    let (x, y) = two_series(call)?;
    Ok(Value::Number(covariance(&x, &y, call.params.usize_or("ddof", 1)?)))
}

fn run_beta(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    let asset = call.series(0, &["asset", "values"])?;
    let benchmark = call.series(1, &["benchmark", "other"])?;
    same_len(&asset, &benchmark)?;
    Ok(Value::Number(beta(&asset, &benchmark)))
}

fn run_linear_regression(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    // Con una sola serie se regresa contra el índice.
    let (x, y) = if call.value_opt(1, &["y", "other"]).is_some() {
        two_series(call)?
    } else {
        let y = call.series(0, &["y", "values"])?.into_owned();
        ((0..y.len()).map(|i| i as f64).collect(), y)
    };
    Ok(linear_regression(&x, &y).into_value())
}

fn run_sharpe_ratio(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    let rf = call.params.f64_or("risk_free_rate", 0.0)?;
    let ppy = call.params.f64_or("periods_per_year", TRADING_DAYS_PER_YEAR)?;
    let annualize = call.params.bool_or("annualize", true)?;
    Ok(Value::Number(sharpe_ratio(&call.first_series()?, rf, annualize.then_some(ppy))))
}

fn run_autocorrelation(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    let lag = call.params.usize_or("lag", 1)?;
    if lag == 0 {
        return Err(PrimitiveError::invalid("lag", "must be >= 1"));
    }
    Ok(Value::Number(autocorrelation(&call.first_series()?, lag)))
}

fn check_lag(params: &StepParams) -> Vec<String> {
    let mut errors = Vec::new();
    check_min_int(params, "lag", 1, &mut errors);
    errors
}

fn check_ddof(params: &StepParams) -> Vec<String> {
    let mut errors = Vec::new();
    check_min_int(params, "ddof", 0, &mut errors);
    errors
}

const PAIR: &[ParamDef] = &[ParamDef::optional("x", ParamKind::Sequence, "first sequence when no input is given"),
                            ParamDef::optional("y", ParamKind::Sequence, "second sequence when no input is given")];
const COVARIANCE: &[ParamDef] = &[ParamDef::optional("x", ParamKind::Sequence, "first sequence when no input is given"),
                                  ParamDef::optional("y", ParamKind::Sequence, "second sequence when no input is given"),
                                  ParamDef::optional("ddof", ParamKind::Integer, "delta degrees of freedom").with_default("1")];
const ROLLING_PAIR: &[ParamDef] =
    &[ParamDef::optional("x", ParamKind::Sequence, "first sequence when no input is given"),
      ParamDef::optional("y", ParamKind::Sequence, "second sequence when no input is given"),
      ParamDef::required("window", ParamKind::Integer, "window size"),
      ParamDef::optional("min_periods", ParamKind::Integer, "minimum paired observations").with_default("window")];
const BETA: &[ParamDef] = &[ParamDef::optional("asset", ParamKind::Sequence, "asset returns when no input is given"),
                            ParamDef::optional("benchmark", ParamKind::Sequence, "benchmark returns when no input is given")];
const SHARPE: &[ParamDef] = &[ParamDef::optional("values", ParamKind::Sequence, "periodic returns when no input is given"),
                              ParamDef::optional("risk_free_rate", ParamKind::Number, "per-period risk free rate").with_default("0"),
                              ParamDef::optional("periods_per_year", ParamKind::Number, "annualization factor").with_default("252"),
                              ParamDef::optional("annualize", ParamKind::Boolean, "scale by sqrt(periods_per_year)").with_default("true")];
const AUTOCORR: &[ParamDef] = &[ParamDef::optional("values", ParamKind::Sequence, "input sequence when no input is given"),
                                ParamDef::optional("lag", ParamKind::Integer, "lag in positions").with_default("1")];

fn analysis(name: &'static str, description: &'static str, params: &'static [ParamDef], run: super::SyncRun) -> FnPrimitive {
    FnPrimitive { name,
                  description,
                  family: Family::Analysis,
                  params,
                  check: None,
                  run }
}

pub(crate) fn register(reg: &mut PrimitiveRegistry) {
    reg.register(analysis("correlation", "Pearson correlation of two sequences", PAIR, run_correlation));
    reg.register(FnPrimitive { check: Some(check_window),
                               ..analysis("rolling_correlation",
                                          "Pearson correlation over a trailing window",
                                          ROLLING_PAIR,
                                          run_rolling_correlation) });
    reg.register(analysis("linear_regression",
                          "Least squares fit; returns slope, intercept, r_squared and predicted",
                          PAIR,
                          run_linear_regression));
    reg.register(FnPrimitive { check: Some(check_ddof),
                               ..analysis("covariance", "Covariance of two sequences", COVARIANCE, run_covariance) });
    reg.register(analysis("beta", "Beta of an asset against a benchmark", BETA, run_beta));
    reg.register(analysis("sharpe_ratio", "Mean excess return over its volatility", SHARPE, run_sharpe_ratio));
    reg.register(FnPrimitive { check: Some(check_lag),
                               ..analysis("autocorrelation", "Correlation of a sequence with its lag", AUTOCORR, run_autocorrelation) });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::call::testing::{assert_close, number, run};

    const NAN: f64 = f64::NAN;

    fn s(v: &[f64]) -> Value {
        Value::Series(v.to_vec())
    }

    #[test]
    fn perfectly_correlated_sequences() {
        let out = run("correlation", vec![s(&[1.0, 2.0, 3.0]), s(&[2.0, 4.0, 6.0])], vec![]).unwrap();
        assert!((number(out) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn nan_pairs_are_dropped() {
        assert!((correlation(&[1.0, NAN, 2.0, 3.0], &[1.0, 5.0, 2.0, 3.0]) - 1.0).abs() < 1e-12);
        assert!(correlation(&[1.0, NAN], &[1.0, 2.0]).is_nan());
    }

    #[test]
    fn zero_variance_is_nan_not_error() {
        let out = run("correlation", vec![s(&[1.0, 1.0, 1.0]), s(&[1.0, 2.0, 3.0])], vec![]).unwrap();
        assert!(number(out).is_nan());
        assert!(beta(&[1.0, 2.0], &[3.0, 3.0]).is_nan());
    }

    #[test]
    fn unequal_lengths_fail() {
        let err = run("correlation", vec![s(&[1.0, 2.0]), s(&[1.0])], vec![]).unwrap_err();
        assert_eq!(err, PrimitiveError::LengthMismatch { left: 2, right: 1 });
    }

    #[test]
    fn regression_against_index() {
        let out = run("linear_regression", vec![s(&[1.0, 3.0, 5.0])], vec![]).unwrap();
        let rec = out.as_record().unwrap();
        assert_eq!(rec.get("slope"), Some(&Value::Number(2.0)));
        assert_eq!(rec.get("intercept"), Some(&Value::Number(1.0)));
        assert_eq!(rec.get("r_squared"), Some(&Value::Number(1.0)));
        assert_eq!(rec.get("predicted"), Some(&s(&[1.0, 3.0, 5.0])));
    }

    #[test]
    fn regression_with_too_few_points() {
        let r = linear_regression(&[1.0, NAN], &[2.0, 3.0]);
        assert!(r.slope.is_nan());
        assert_eq!(r.predicted.len(), 2);
    }

    #[test]
    fn beta_of_scaled_benchmark() {
        assert!((beta(&[2.0, 4.0, 6.0], &[1.0, 2.0, 3.0]) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn sharpe_and_autocorrelation() {
        let s1 = sharpe_ratio(&[0.01, 0.03], 0.0, None);
        assert!((s1 - 0.02 / 0.014142135623730951).abs() < 1e-9);
        assert!(sharpe_ratio(&[0.01, 0.01], 0.0, Some(252.0)).is_nan());
        assert!((autocorrelation(&[1.0, 2.0, 3.0, 4.0], 1) - 1.0).abs() < 1e-12);
        assert!(autocorrelation(&[1.0], 1).is_nan());
    }

    #[test]
    fn rolling_correlation_window() {
        let out = rolling_correlation(&[1.0, 2.0, 3.0, 2.0], &[1.0, 2.0, 3.0, 4.0], 3, 3);
        assert_close(&out[..3], &[NAN, NAN, 1.0]);
        assert!(out[3].abs() < 1e-12);
    }
}
