//! Estadística descriptiva y ventanas móviles.
//!
//! Todas las funciones ignoran NaN. Sin observaciones suficientes el
//! resultado es NaN, nunca un error.
use super::{check_min_int, check_range, FnPrimitive, Family, ParamDef, ParamKind, PrimitiveCall, PrimitiveRegistry};
use crate::errors::PrimitiveError;
use crate::model::StepParams;
use crate::value::Value;

/// Valores definidos (sin NaN).
pub fn valid(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| !v.is_nan()).collect()
}

pub fn mean(values: &[f64]) -> f64 {
    let v = valid(values);
    if v.is_empty() {
        return f64::NAN;
    }
    v.iter().sum::<f64>() / v.len() as f64
}

/// Varianza con divisor `n - ddof`.
pub fn variance(values: &[f64], ddof: usize) -> f64 {
    let v = valid(values);
    if v.len() <= ddof || v.is_empty() {
        return f64::NAN;
    }
    let m = v.iter().sum::<f64>() / v.len() as f64;
    let sum_sq: f64 = v.iter().map(|x| (x - m).powi(2)).sum();
    sum_sq / (v.len() - ddof) as f64
}

pub fn std_dev(values: &[f64], ddof: usize) -> f64 {
    variance(values, ddof).sqrt()
}

pub fn min(values: &[f64]) -> f64 {
    valid(values).into_iter().fold(f64::NAN, f64::min)
}

pub fn max(values: &[f64]) -> f64 {
    valid(values).into_iter().fold(f64::NAN, f64::max)
}

pub fn sum(values: &[f64]) -> f64 {
    valid(values).iter().sum()
}

pub fn count(values: &[f64]) -> usize {
    values.iter().filter(|v| !v.is_nan()).count()
}

/// Percentil `q` en [0, 100] con interpolación lineal entre estadísticos de orden.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    let mut v = valid(values);
    if v.is_empty() || !(0.0..=100.0).contains(&q) {
        return f64::NAN;
    }
    v.sort_by(f64::total_cmp);
    let rank = q / 100.0 * (v.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    v[lo] + (v[hi] - v[lo]) * (rank - lo as f64)
}

pub fn median(values: &[f64]) -> f64 {
    percentile(values, 50.0)
}

/// Aplica `f` sobre cada ventana `[i + 1 - window, i]`. Una posición con
/// menos de `min_periods` valores definidos en su ventana da NaN.
pub fn rolling(values: &[f64], window: usize, min_periods: usize, f: impl Fn(&[f64]) -> f64) -> Vec<f64> {
    let window = window.max(1);
    let min_periods = min_periods.max(1);
    (0..values.len()).map(|i| {
                         let start = (i + 1).saturating_sub(window);
                         let win = valid(&values[start..=i]);
                         if win.len() < min_periods {
                             f64::NAN
                         } else {
                             f(&win)
                         }
                     })
                     .collect()
}

pub fn rolling_mean(values: &[f64], window: usize, min_periods: usize) -> Vec<f64> {
    rolling(values, window, min_periods, mean)
}

pub fn rolling_std(values: &[f64], window: usize, min_periods: usize, ddof: usize) -> Vec<f64> {
    rolling(values, window, min_periods, |w| std_dev(w, ddof))
}

pub fn zscore(values: &[f64], ddof: usize) -> Vec<f64> {
    let m = mean(values);
    let s = std_dev(values, ddof);
    if s.is_nan() || s == 0.0 {
        return vec![f64::NAN; values.len()];
    }
    values.iter().map(|x| (x - m) / s).collect()
}

/// Suma acumulada; las posiciones NaN quedan NaN y no interrumpen la suma.
pub fn cumsum(values: &[f64]) -> Vec<f64> {
    let mut acc = 0.0;
    values.iter()
          .map(|&x| {
              if x.is_nan() {
                  f64::NAN
              } else {
                  acc += x;
                  acc
              }
          })
          .collect()
}

/// `window` y `min_periods` (por defecto igual a `window`).
pub(crate) fn window_params(call: &PrimitiveCall<'_>) -> Result<(usize, usize), PrimitiveError> {
    let window = call.params.usize_req("window")?;
    if window == 0 {
        return Err(PrimitiveError::invalid("window", "must be >= 1"));
    }
    let min_periods = call.params.usize_or("min_periods", window)?;
    if min_periods == 0 || min_periods > window {
        return Err(PrimitiveError::invalid("min_periods", format!("must be between 1 and window ({window})")));
    }
    Ok((window, min_periods))
}

pub(crate) fn check_window(params: &StepParams) -> Vec<String> {
    let mut errors = Vec::new();
    check_min_int(params, "window", 1, &mut errors);
    check_min_int(params, "min_periods", 1, &mut errors);
    if let (Some(Value::Number(w)), Some(Value::Number(m))) = (params.literal("window"), params.literal("min_periods")) {
        if m > w {
            errors.push(format!("parameter 'min_periods' ({m}) must not exceed 'window' ({w})"));
        }
    }
    errors
}

fn check_ddof(params: &StepParams) -> Vec<String> {
    let mut errors = Vec::new();
    check_min_int(params, "ddof", 0, &mut errors);
    errors
}

fn check_rolling_std(params: &StepParams) -> Vec<String> {
    let mut errors = check_window(params);
    errors.extend(check_ddof(params));
    errors
}

fn check_percentile(params: &StepParams) -> Vec<String> {
    let mut errors = Vec::new();
    check_range(params, "q", 0.0, 100.0, &mut errors);
    errors
}

fn ddof(call: &PrimitiveCall<'_>) -> Result<usize, PrimitiveError> {
    call.params.usize_or("ddof", 1)
}

fn run_mean(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    Ok(Value::Number(mean(&call.first_series()?)))
}

fn run_std(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    Ok(Value::Number(std_dev(&call.first_series()?, ddof(call)?)))
}

fn run_min(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    Ok(Value::Number(min(&call.first_series()?)))
}

fn run_max(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    Ok(Value::Number(max(&call.first_series()?)))
}

fn run_sum(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    Ok(Value::Number(sum(&call.first_series()?)))
}

fn run_count(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    Ok(Value::Number(count(&call.first_series()?) as f64))
}

fn run_median(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    Ok(Value::Number(median(&call.first_series()?)))
}

fn run_percentile(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    let q = call.params.f64_req("q")?;
    if !(0.0..=100.0).contains(&q) {
        return Err(PrimitiveError::invalid("q", format!("must be between 0 and 100, got {q}")));
    }
    Ok(Value::Number(percentile(&call.first_series()?, q)))
}

fn run_cumsum(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    Ok(Value::Series(cumsum(&call.first_series()?)))
}

fn run_zscore(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    Ok(Value::Series(zscore(&call.first_series()?, ddof(call)?)))
}

fn run_rolling_mean(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    let (window, min_periods) = window_params(call)?;
    Ok(Value::Series(rolling_mean(&call.first_series()?, window, min_periods)))
}

fn run_rolling_std(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    let (window, min_periods) = window_params(call)?;
    Ok(Value::Series(rolling_std(&call.first_series()?, window, min_periods, ddof(call)?)))
}

fn run_rolling_min(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    let (window, min_periods) = window_params(call)?;
    Ok(Value::Series(rolling(&call.first_series()?, window, min_periods, min)))
}

fn run_rolling_max(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    let (window, min_periods) = window_params(call)?;
    Ok(Value::Series(rolling(&call.first_series()?, window, min_periods, max)))
}

const VALUES: ParamDef = ParamDef::optional("values", ParamKind::Sequence, "input sequence when no input is given");
const ONE: &[ParamDef] = &[VALUES];
const WITH_DDOF: &[ParamDef] = &[VALUES, ParamDef::optional("ddof", ParamKind::Integer, "delta degrees of freedom").with_default("1")];
const PERCENTILE: &[ParamDef] = &[VALUES, ParamDef::required("q", ParamKind::Number, "percentile in [0, 100]")];
const ROLLING: &[ParamDef] = &[VALUES,
                               ParamDef::required("window", ParamKind::Integer, "window size"),
                               ParamDef::optional("min_periods", ParamKind::Integer, "minimum observations").with_default("window")];
const ROLLING_STD: &[ParamDef] = &[VALUES,
                                   ParamDef::required("window", ParamKind::Integer, "window size"),
                                   ParamDef::optional("min_periods", ParamKind::Integer, "minimum observations").with_default("window"),
                                   ParamDef::optional("ddof", ParamKind::Integer, "delta degrees of freedom").with_default("1")];

fn stat(name: &'static str, description: &'static str, params: &'static [ParamDef], run: super::SyncRun) -> FnPrimitive {
    FnPrimitive { name,
                  description,
                  family: Family::Stats,
                  params,
                  check: None,
                  run }
}

pub(crate) fn register(reg: &mut PrimitiveRegistry) {
    reg.register(stat("mean", "Arithmetic mean", ONE, run_mean));
    reg.register(FnPrimitive { check: Some(check_ddof),
                               ..stat("std", "Standard deviation (sample by default)", WITH_DDOF, run_std) });
    reg.register(FnPrimitive { check: Some(check_window),
                               ..stat("rolling_mean", "Moving average", ROLLING, run_rolling_mean) });
    reg.register(FnPrimitive { check: Some(check_rolling_std),
                               ..stat("rolling_std", "Moving standard deviation", ROLLING_STD, run_rolling_std) });
    reg.register(FnPrimitive { check: Some(check_ddof),
                               ..stat("zscore", "Standard score of each value", WITH_DDOF, run_zscore) });
    reg.register(stat("min", "Minimum", ONE, run_min));
    reg.register(stat("max", "Maximum", ONE, run_max));
    reg.register(FnPrimitive { check: Some(check_window),
                               ..stat("rolling_min", "Moving minimum", ROLLING, run_rolling_min) });
    reg.register(FnPrimitive { check: Some(check_window),
                               ..stat("rolling_max", "Moving maximum", ROLLING, run_rolling_max) });
    reg.register(stat("sum", "Sum", ONE, run_sum));
    reg.register(stat("cumsum", "Running sum", ONE, run_cumsum));
    reg.register(FnPrimitive { check: Some(check_percentile),
                               ..stat("percentile", "Percentile with linear interpolation", PERCENTILE, run_percentile) });
    reg.register(stat("median", "Median", ONE, run_median));
    reg.register(stat("count", "Number of defined values", ONE, run_count));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ParamValue;
    use crate::primitives::call::testing::{assert_close, number, run, series};
    use rstest::rstest;

    const NAN: f64 = f64::NAN;

    fn s(v: &[f64]) -> Value {
        Value::Series(v.to_vec())
    }

    #[test]
    fn rolling_mean_window_two() {
        let out = run("rolling_mean", vec![s(&[1.0, 2.0, 3.0, 4.0])], vec![("window", Value::Number(2.0))]).unwrap();
        assert_close(&series(out), &[NAN, 1.5, 2.5, 3.5]);
    }

    #[test]
    fn rolling_min_periods_allows_partial_windows() {
        let out = rolling_mean(&[1.0, 2.0, 3.0], 3, 1);
        assert_close(&out, &[1.0, 1.5, 2.0]);
    }

    #[test]
    fn rolling_skips_nan_inside_window() {
        let out = rolling_mean(&[1.0, NAN, 3.0, 5.0], 2, 2);
        assert_close(&out, &[NAN, NAN, NAN, 4.0]);
        let out = rolling_mean(&[1.0, NAN, 3.0, 5.0], 2, 1);
        assert_close(&out, &[1.0, 1.0, 3.0, 4.0]);
    }

    #[rstest]
    #[case(1, 1.2909944487358056)]
    #[case(0, 1.118033988749895)]
    fn std_ddof(#[case] ddof: usize, #[case] expected: f64) {
        assert!((std_dev(&[1.0, 2.0, 3.0, 4.0], ddof) - expected).abs() < 1e-12);
    }

    #[test]
    fn std_defaults_to_sample() {
        let out = run("std", vec![s(&[1.0, 2.0, 3.0, 4.0])], vec![]).unwrap();
        assert!((number(out) - 1.2909944487358056).abs() < 1e-12);
        assert!(std_dev(&[5.0], 1).is_nan());
    }

    #[rstest]
    #[case(0.0, 1.0)]
    #[case(50.0, 2.5)]
    #[case(25.0, 1.75)]
    #[case(100.0, 4.0)]
    fn percentile_interpolates(#[case] q: f64, #[case] expected: f64) {
        assert!((percentile(&[4.0, 1.0, 3.0, 2.0], q) - expected).abs() < 1e-12);
    }

    #[test]
    fn empty_inputs_yield_nan() {
        assert!(mean(&[]).is_nan());
        assert!(min(&[NAN]).is_nan());
        assert!(median(&[]).is_nan());
        assert_eq!(count(&[1.0, NAN, 3.0]), 2);
        assert_eq!(sum(&[]), 0.0);
    }

    #[test]
    fn cumsum_skips_nan() {
        assert_close(&cumsum(&[1.0, NAN, 2.0]), &[1.0, NAN, 3.0]);
    }

    #[test]
    fn zscore_of_constant_is_nan() {
        assert_close(&zscore(&[2.0, 2.0], 1), &[NAN, NAN]);
        assert_close(&zscore(&[1.0, 3.0], 1), &[-0.7071067811865475, 0.7071067811865475]);
    }

    #[test]
    fn window_validation() {
        let prim = crate::primitives::get_primitive("rolling_mean").unwrap();
        let bad = StepParams::new().with("window", ParamValue::literal(0.0));
        assert_eq!(prim.validate(&bad), vec!["parameter 'window' must be >= 1".to_string()]);
        let missing = StepParams::new();
        assert_eq!(prim.validate(&missing), vec!["missing required parameter 'window'".to_string()]);
        let too_many = StepParams::new().with("window", ParamValue::literal(2.0))
                                        .with("min_periods", ParamValue::literal(3.0));
        assert_eq!(prim.validate(&too_many).len(), 1);
    }

    #[test]
    fn values_param_is_used_without_inputs() {
        let out = run("max", vec![], vec![("values", s(&[3.0, 9.0, 1.0]))]).unwrap();
        assert_eq!(number(out), 9.0);
    }
}
