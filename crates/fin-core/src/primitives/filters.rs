//! Filtrado y reordenación de secuencias.
//!
//! `where` devuelve índices; `select` los aplica sobre la secuencia
//! original. Las operaciones posicionales aceptan también listas no
//! numéricas (p.ej. etiquetas de fecha) y conservan su forma.
use std::cmp::Ordering;

use super::stats::{mean, median};
use super::{check_min_int, check_one_of, FnPrimitive, Family, ParamDef, ParamKind, PrimitiveCall, PrimitiveRegistry};
use crate::errors::PrimitiveError;
use crate::model::StepParams;
use crate::value::Value;

const OPERATORS: [&str; 12] = ["gt", "gte", "lt", "lte", "eq", "neq", ">", ">=", "<", "<=", "==", "!="];
const FILL_METHODS: [&str; 8] = ["constant", "value", "ffill", "forward", "bfill", "backward", "mean", "median"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Neq,
}

impl Comparison {
    pub fn parse(op: &str) -> Option<Self> {
        Some(match op {
            "gt" | ">" => Comparison::Gt,
            "gte" | ">=" => Comparison::Gte,
            "lt" | "<" => Comparison::Lt,
            "lte" | "<=" => Comparison::Lte,
            "eq" | "==" => Comparison::Eq,
            "neq" | "!=" => Comparison::Neq,
            _ => return None,
        })
    }

    /// NaN nunca cumple.
    pub fn test(&self, x: f64, threshold: f64) -> bool {
        if x.is_nan() {
            return false;
        }
        match self {
            Comparison::Gt => x > threshold,
            Comparison::Gte => x >= threshold,
            Comparison::Lt => x < threshold,
            Comparison::Lte => x <= threshold,
            Comparison::Eq => x == threshold,
            Comparison::Neq => x != threshold,
        }
    }
}

/// Índices de los elementos que cumplen la comparación.
pub fn where_indices(values: &[f64], cmp: Comparison, threshold: f64) -> Vec<usize> {
    values.iter().enumerate().filter(|&(_, &x)| cmp.test(x, threshold)).map(|(i, _)| i).collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FillMethod {
    Constant(f64),
    Forward,
    Backward,
    Mean,
    Median,
}

pub fn fillna(values: &[f64], method: FillMethod) -> Vec<f64> {
    let mut out = values.to_vec();
    match method {
        FillMethod::Constant(c) => out.iter_mut().filter(|x| x.is_nan()).for_each(|x| *x = c),
        FillMethod::Mean => {
            let m = mean(values);
            out.iter_mut().filter(|x| x.is_nan()).for_each(|x| *x = m)
        }
        FillMethod::Median => {
            let m = median(values);
            out.iter_mut().filter(|x| x.is_nan()).for_each(|x| *x = m)
        }
        FillMethod::Forward => {
            let mut last = f64::NAN;
            for x in out.iter_mut() {
                if x.is_nan() {
                    *x = last;
                } else {
                    last = *x;
                }
            }
        }
        FillMethod::Backward => {
            let mut next = f64::NAN;
            for x in out.iter_mut().rev() {
                if x.is_nan() {
                    *x = next;
                } else {
                    next = *x;
                }
            }
        }
    }
    out
}

/// Convierte índices estilo Python (negativos desde el final) a un rango válido.
pub fn slice_bounds(len: usize, start: Option<i64>, end: Option<i64>) -> (usize, usize) {
    let norm = |i: i64| -> usize {
        if i < 0 {
            (len as i64 + i).max(0) as usize
        } else {
            (i as usize).min(len)
        }
    };
    let s = start.map(norm).unwrap_or(0);
    let e = end.map(norm).unwrap_or(len);
    (s, e.max(s))
}

/// Aplica una transformación posicional conservando `Series` o `List`.
fn positional(v: &Value, f: impl Fn(usize) -> Vec<usize>) -> Result<Value, PrimitiveError> {
    match v {
        Value::Series(s) => Ok(Value::Series(f(s.len()).into_iter().map(|i| s[i]).collect())),
        Value::List(items) => Ok(Value::List(f(items.len()).into_iter().map(|i| items[i].clone()).collect())),
        other => Err(PrimitiveError::shape("sequence", other.shape())),
    }
}

fn sequence<'a>(call: &PrimitiveCall<'a>) -> Result<&'a Value, PrimitiveError> {
    call.value(0, &["values"])
}

fn run_where(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    let op = call.params.str_req("operator")?;
    let cmp = Comparison::parse(op).ok_or_else(|| PrimitiveError::invalid("operator", format!("unknown operator '{op}'")))?;
    let threshold = call.params.f64_req("threshold")?;
    let idx = where_indices(&call.first_series()?, cmp, threshold);
    Ok(Value::Series(idx.into_iter().map(|i| i as f64).collect()))
}

fn run_select(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    let values = sequence(call)?;
    let len = values.seq_len().ok_or_else(|| PrimitiveError::shape("sequence", values.shape()))?;
    let raw = call.series(1, &["indices"])?;
    let mut picked = Vec::with_capacity(raw.len());
    for &i in raw.iter() {
        if !i.is_finite() || i.fract() != 0.0 {
            return Err(PrimitiveError::invalid("indices", format!("{i} is not an integer index")));
        }
        if i < 0.0 || i as usize >= len {
            return Err(PrimitiveError::IndexOutOfRange { index: i as i64, len });
        }
        picked.push(i as usize);
    }
    positional(values, |_| picked.clone())
}

fn run_slice(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    let start = call.params.i64_opt("start")?;
    let end = call.params.i64_opt("end")?;
    positional(sequence(call)?, |len| {
        let (s, e) = slice_bounds(len, start, end);
        (s..e).collect()
    })
}

fn run_head(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    let n = call.params.usize_or("n", 5)?;
    positional(sequence(call)?, |len| (0..n.min(len)).collect())
}

fn run_tail(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    let n = call.params.usize_or("n", 5)?;
    positional(sequence(call)?, |len| (len.saturating_sub(n)..len).collect())
}

fn run_reverse(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    positional(sequence(call)?, |len| (0..len).rev().collect())
}

fn run_dropna(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    match sequence(call)? {
        Value::Series(s) => Ok(Value::Series(s.iter().copied().filter(|x| !x.is_nan()).collect())),
        Value::List(items) => Ok(Value::List(items.iter()
                                                  .filter(|v| !matches!(v, Value::Null) && !matches!(v, Value::Number(n) if n.is_nan()))
                                                  .cloned()
                                                  .collect())),
        other => Err(PrimitiveError::shape("sequence", other.shape())),
    }
}

fn run_fillna(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    let method = match call.params.str_or("method", "constant")? {
        "constant" | "value" => FillMethod::Constant(call.params.f64_req("value")?),
        "ffill" | "forward" => FillMethod::Forward,
        "bfill" | "backward" => FillMethod::Backward,
        "mean" => FillMethod::Mean,
        "median" => FillMethod::Median,
        other => return Err(PrimitiveError::invalid("method", format!("unknown fill method '{other}'"))),
    };
    Ok(Value::Series(fillna(&call.first_series()?, method)))
}

fn run_replace(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    // `target` ausente o null => se reemplazan los NaN.
    let target = call.params.f64_opt("target")?;
    let value = call.params.f64_opt("value")?.unwrap_or(f64::NAN);
    let hit = |x: f64| match target {
        Some(t) if t.is_nan() => x.is_nan(),
        Some(t) => x == t,
        None => x.is_nan(),
    };
    Ok(Value::Series(call.first_series()?.iter().map(|&x| if hit(x) { value } else { x }).collect()))
}

fn run_sort(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    let descending = call.params.bool_or("descending", false)?
                     || matches!(call.params.str_opt("order")?, Some("desc" | "descending"));
    match sequence(call)? {
        Value::List(items) if items.iter().all(|v| matches!(v, Value::String(_))) => {
            let mut out = items.clone();
            out.sort_by(|a, b| a.as_str().cmp(&b.as_str()));
            if descending {
                out.reverse();
            }
            Ok(Value::List(out))
        }
        other => {
            let mut out = other.as_series()
                               .ok_or_else(|| PrimitiveError::shape("numeric sequence", other.shape()))?
                               .into_owned();
            // NaN siempre al final, en ambos sentidos.
            out.sort_by(|a, b| match (a.is_nan(), b.is_nan()) {
                   (true, true) => Ordering::Equal,
                   (true, false) => Ordering::Greater,
                   (false, true) => Ordering::Less,
                   (false, false) if descending => b.total_cmp(a),
                   (false, false) => a.total_cmp(b),
               });
            Ok(Value::Series(out))
        }
    }
}

fn run_unique(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    match sequence(call)? {
        Value::List(items) => {
            let mut out: Vec<Value> = Vec::new();
            for v in items {
                if !out.contains(v) {
                    out.push(v.clone());
                }
            }
            Ok(Value::List(out))
        }
        other => {
            let values = other.as_series()
                              .ok_or_else(|| PrimitiveError::shape("numeric sequence", other.shape()))?;
            let mut out: Vec<f64> = Vec::new();
            for &x in values.iter() {
                let seen = out.iter().any(|&y| y == x || (y.is_nan() && x.is_nan()));
                if !seen {
                    out.push(x);
                }
            }
            Ok(Value::Series(out))
        }
    }
}

fn check_where(params: &StepParams) -> Vec<String> {
    let mut errors = Vec::new();
    check_one_of(params, "operator", &OPERATORS, &mut errors);
    errors
}

fn check_n(params: &StepParams) -> Vec<String> {
    let mut errors = Vec::new();
    check_min_int(params, "n", 0, &mut errors);
    errors
}

fn check_fillna(params: &StepParams) -> Vec<String> {
    let mut errors = Vec::new();
    check_one_of(params, "method", &FILL_METHODS, &mut errors);
    let method = params.literal("method").and_then(Value::as_str).unwrap_or("constant");
    if matches!(method, "constant" | "value") && !params.contains("value") {
        errors.push("parameter 'value' is required for constant fill".to_string());
    }
    errors
}

const VALUES: ParamDef = ParamDef::optional("values", ParamKind::Sequence, "input sequence when no input is given");
const ONE: &[ParamDef] = &[VALUES];
const WHERE: &[ParamDef] = &[VALUES,
                             ParamDef::required("operator", ParamKind::String, "gt, gte, lt, lte, eq or neq"),
                             ParamDef::required("threshold", ParamKind::Number, "value compared against")];
const SELECT: &[ParamDef] = &[VALUES, ParamDef::optional("indices", ParamKind::Sequence, "positions to keep when no second input is given")];
const SLICE: &[ParamDef] = &[VALUES,
                             ParamDef::optional("start", ParamKind::Integer, "first position, negative counts from the end"),
                             ParamDef::optional("end", ParamKind::Integer, "exclusive end, negative counts from the end")];
const N: &[ParamDef] = &[VALUES, ParamDef::optional("n", ParamKind::Integer, "number of elements").with_default("5")];
const FILLNA: &[ParamDef] = &[VALUES,
                              ParamDef::optional("method", ParamKind::String, "constant, ffill, bfill, mean or median"),
                              ParamDef::optional("value", ParamKind::Number, "fill value for constant")];
const REPLACE: &[ParamDef] = &[VALUES,
                               ParamDef::optional("target", ParamKind::Number, "value to replace").with_default("NaN"),
                               ParamDef::optional("value", ParamKind::Number, "replacement").with_default("NaN")];
const SORT: &[ParamDef] = &[VALUES,
                            ParamDef::optional("descending", ParamKind::Boolean, "sort from largest").with_default("false"),
                            ParamDef::optional("order", ParamKind::String, "asc or desc")];

fn filter(name: &'static str, description: &'static str, params: &'static [ParamDef], run: super::SyncRun) -> FnPrimitive {
    FnPrimitive { name,
                  description,
                  family: Family::Filters,
                  params,
                  check: None,
                  run }
}

pub(crate) fn register(reg: &mut PrimitiveRegistry) {
    reg.register(FnPrimitive { check: Some(check_where),
                               ..filter("where", "Indices of elements matching a comparison", WHERE, run_where) });
    reg.register(filter("select", "Elements at the given indices", SELECT, run_select));
    reg.register(filter("slice", "Sub-sequence between start and end", SLICE, run_slice));
    reg.register(FnPrimitive { check: Some(check_n),
                               ..filter("head", "First n elements", N, run_head) });
    reg.register(FnPrimitive { check: Some(check_n),
                               ..filter("tail", "Last n elements", N, run_tail) });
    reg.register(filter("dropna", "Remove undefined values", ONE, run_dropna));
    reg.register(FnPrimitive { check: Some(check_fillna),
                               ..filter("fillna", "Fill undefined values", FILLNA, run_fillna) });
    reg.register(filter("replace", "Replace one value with another", REPLACE, run_replace));
    reg.register(filter("reverse", "Reverse order", ONE, run_reverse));
    reg.register(filter("sort", "Sort values (undefined last)", SORT, run_sort));
    reg.register(filter("unique", "Distinct values in first-seen order", ONE, run_unique));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ParamValue;
    use crate::primitives::call::testing::{assert_close, run, series};
    use rstest::rstest;

    const NAN: f64 = f64::NAN;

    fn s(v: &[f64]) -> Value {
        Value::Series(v.to_vec())
    }

    #[rstest]
    #[case("gt", vec![2.0])]
    #[case(">=", vec![1.0, 2.0])]
    #[case("lt", vec![0.0])]
    #[case("neq", vec![0.0, 2.0])]
    fn where_returns_indices(#[case] op: &str, #[case] expected: Vec<f64>) {
        let out = run("where",
                      vec![s(&[1.0, 5.0, 9.0, NAN])],
                      vec![("operator", Value::from(op)), ("threshold", Value::Number(5.0))]).unwrap();
        assert_eq!(series(out), expected);
    }

    #[test]
    fn where_then_select() {
        let values = s(&[10.0, 20.0, 30.0]);
        let idx = run("where", vec![values.clone()], vec![("operator", Value::from("gte")), ("threshold", Value::Number(20.0))]).unwrap();
        let out = run("select", vec![values, idx], vec![]).unwrap();
        assert_eq!(series(out), vec![20.0, 30.0]);
    }

    #[test]
    fn select_out_of_range_fails() {
        let err = run("select", vec![s(&[1.0]), s(&[3.0])], vec![]).unwrap_err();
        assert_eq!(err, PrimitiveError::IndexOutOfRange { index: 3, len: 1 });
    }

    #[rstest]
    #[case(Some(1), None, vec![2.0, 3.0, 4.0])]
    #[case(Some(-2), None, vec![3.0, 4.0])]
    #[case(None, Some(-1), vec![1.0, 2.0, 3.0])]
    #[case(Some(3), Some(1), vec![])]
    fn slice_python_semantics(#[case] start: Option<i64>, #[case] end: Option<i64>, #[case] expected: Vec<f64>) {
        let mut params = vec![];
        if let Some(v) = start {
            params.push(("start", Value::Number(v as f64)));
        }
        if let Some(v) = end {
            params.push(("end", Value::Number(v as f64)));
        }
        assert_eq!(series(run("slice", vec![s(&[1.0, 2.0, 3.0, 4.0])], params).unwrap()), expected);
    }

    #[test]
    fn head_tail_reverse_keep_lists() {
        let labels = Value::List(vec![Value::from("a"), Value::from("b"), Value::from("c")]);
        let out = run("tail", vec![labels.clone()], vec![("n", Value::Number(2.0))]).unwrap();
        assert_eq!(out, Value::List(vec![Value::from("b"), Value::from("c")]));
        let out = run("head", vec![s(&[1.0, 2.0])], vec![]).unwrap();
        assert_eq!(series(out), vec![1.0, 2.0]);
        let out = run("reverse", vec![labels], vec![]).unwrap();
        assert_eq!(out.seq_get(0), Some(Value::from("c")));
    }

    #[rstest]
    #[case(FillMethod::Constant(0.0), &[0.0, 1.0, 0.0, 3.0, 0.0])]
    #[case(FillMethod::Forward, &[NAN, 1.0, 1.0, 3.0, 3.0])]
    #[case(FillMethod::Backward, &[1.0, 1.0, 3.0, 3.0, NAN])]
    #[case(FillMethod::Mean, &[2.0, 1.0, 2.0, 3.0, 2.0])]
    #[case(FillMethod::Median, &[2.0, 1.0, 2.0, 3.0, 2.0])]
    fn fill_strategies(#[case] method: FillMethod, #[case] expected: &[f64]) {
        assert_close(&fillna(&[NAN, 1.0, NAN, 3.0, NAN], method), expected);
    }

    #[test]
    fn fillna_constant_requires_value() {
        let prim = crate::primitives::get_primitive("fillna").unwrap();
        assert_eq!(prim.validate(&StepParams::new()).len(), 1);
        let ok = StepParams::new().with("method", ParamValue::literal("ffill"));
        assert!(prim.validate(&ok).is_empty());
    }

    #[test]
    fn sort_puts_nan_last() {
        let out = run("sort", vec![s(&[3.0, NAN, 1.0, 2.0])], vec![("descending", Value::Bool(true))]).unwrap();
        assert_close(&series(out), &[3.0, 2.0, 1.0, NAN]);
    }

    #[test]
    fn unique_dropna_replace() {
        assert_close(&series(run("unique", vec![s(&[2.0, 1.0, 2.0, NAN, NAN])], vec![]).unwrap()), &[2.0, 1.0, NAN]);
        assert_eq!(series(run("dropna", vec![s(&[NAN, 1.0])], vec![]).unwrap()), vec![1.0]);
        let out = run("replace", vec![s(&[NAN, 1.0, 2.0])], vec![("target", Value::Number(1.0)), ("value", Value::Number(9.0))]).unwrap();
        assert_close(&series(out), &[NAN, 9.0, 2.0]);
        let out = run("replace", vec![s(&[NAN, 1.0])], vec![("value", Value::Number(0.0))]).unwrap();
        assert_close(&series(out), &[0.0, 1.0]);
    }
}
