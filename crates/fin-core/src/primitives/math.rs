//! Aritmética elemento a elemento.
//!
//! Los operandos pueden ser escalares o secuencias; un escalar se difunde
//! sobre la secuencia. Dos secuencias deben tener la misma longitud.
//! División por cero y logaritmos de no positivos producen NaN.
use std::borrow::Cow;

use super::{check_min_int, FnPrimitive, Family, ParamDef, ParamKind, PrimitiveCall, PrimitiveRegistry};
use crate::errors::PrimitiveError;
use crate::model::StepParams;
use crate::value::Value;

enum Operand<'a> {
    Scalar(f64),
    Seq(Cow<'a, [f64]>),
}

fn operand(v: &Value) -> Result<Operand<'_>, PrimitiveError> {
    match v {
        Value::Number(n) => Ok(Operand::Scalar(*n)),
        other => other.as_series()
                      .map(Operand::Seq)
                      .ok_or_else(|| PrimitiveError::shape("number or numeric sequence", other.shape())),
    }
}

pub fn binary_op(a: &Value, b: &Value, f: fn(f64, f64) -> f64) -> Result<Value, PrimitiveError> {
    Ok(match (operand(a)?, operand(b)?) {
        (Operand::Scalar(x), Operand::Scalar(y)) => Value::Number(f(x, y)),
        (Operand::Seq(xs), Operand::Scalar(y)) => Value::Series(xs.iter().map(|&x| f(x, y)).collect()),
        (Operand::Scalar(x), Operand::Seq(ys)) => Value::Series(ys.iter().map(|&y| f(x, y)).collect()),
        (Operand::Seq(xs), Operand::Seq(ys)) => {
            if xs.len() != ys.len() {
                return Err(PrimitiveError::LengthMismatch { left: xs.len(),
                                                            right: ys.len() });
            }
            Value::Series(xs.iter().zip(ys.iter()).map(|(&x, &y)| f(x, y)).collect())
        }
    })
}

pub fn unary_op(a: &Value, f: impl Fn(f64) -> f64) -> Result<Value, PrimitiveError> {
    Ok(match operand(a)? {
        Operand::Scalar(x) => Value::Number(f(x)),
        Operand::Seq(xs) => Value::Series(xs.iter().map(|&x| f(x)).collect()),
    })
}

fn safe_div(a: f64, b: f64) -> f64 {
    if b == 0.0 {
        f64::NAN
    } else {
        a / b
    }
}

fn safe_ln(x: f64) -> f64 {
    if x > 0.0 {
        x.ln()
    } else {
        f64::NAN
    }
}

fn safe_log10(x: f64) -> f64 {
    if x > 0.0 {
        x.log10()
    } else {
        f64::NAN
    }
}

fn safe_sqrt(x: f64) -> f64 {
    if x >= 0.0 {
        x.sqrt()
    } else {
        f64::NAN
    }
}

fn first<'a>(call: &PrimitiveCall<'a>) -> Result<&'a Value, PrimitiveError> {
    call.value(0, &["values"])
}

fn run_add(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    binary_op(first(call)?, call.second()?, |a, b| a + b)
}

fn run_subtract(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    binary_op(first(call)?, call.second()?, |a, b| a - b)
}

fn run_multiply(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    binary_op(first(call)?, call.second()?, |a, b| a * b)
}

fn run_divide(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    binary_op(first(call)?, call.second()?, safe_div)
}

fn run_power(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    let exponent = call.value(1, &["exponent", "value"])?;
    binary_op(first(call)?, exponent, f64::powf)
}

fn run_abs(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    unary_op(first(call)?, f64::abs)
}

fn run_log(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    unary_op(first(call)?, safe_ln)
}

fn run_log10(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    unary_op(first(call)?, safe_log10)
}

fn run_exp(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    unary_op(first(call)?, f64::exp)
}

fn run_sqrt(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    unary_op(first(call)?, safe_sqrt)
}

fn run_round(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    let decimals = call.params.i64_opt("decimals")?.unwrap_or(0).clamp(-15, 15) as i32;
    let factor = 10f64.powi(decimals);
    unary_op(first(call)?, move |x| (x * factor).round() / factor)
}

fn run_floor(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    unary_op(first(call)?, f64::floor)
}

fn run_ceil(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    unary_op(first(call)?, f64::ceil)
}

fn run_clamp(call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
    let lo = call.params.f64_opt("min")?.unwrap_or(f64::NEG_INFINITY);
    let hi = call.params.f64_opt("max")?.unwrap_or(f64::INFINITY);
    if lo.is_nan() || hi.is_nan() || lo > hi {
        return Err(PrimitiveError::invalid("min", format!("{lo} is greater than max {hi}")));
    }
    // NaN se conserva: f64::clamp lo propaga.
    unary_op(first(call)?, move |x| x.clamp(lo, hi))
}

fn check_round(params: &StepParams) -> Vec<String> {
    let mut errors = Vec::new();
    check_min_int(params, "decimals", -15, &mut errors);
    errors
}

fn check_clamp(params: &StepParams) -> Vec<String> {
    let mut errors = Vec::new();
    let lo = params.literal("min").and_then(Value::as_f64);
    let hi = params.literal("max").and_then(Value::as_f64);
    if !params.contains("min") && !params.contains("max") {
        errors.push("at least one of 'min' or 'max' is required".to_string());
    }
    if let (Some(lo), Some(hi)) = (lo, hi) {
        if lo > hi {
            errors.push(format!("'min' ({lo}) must not exceed 'max' ({hi})"));
        }
    }
    errors
}

const BINARY: &[ParamDef] = &[ParamDef::optional("values", ParamKind::Any, "first operand when no input is given"),
                              ParamDef::optional("value", ParamKind::Any, "second operand: scalar or sequence")];
const POWER: &[ParamDef] = &[ParamDef::optional("values", ParamKind::Any, "base when no input is given"),
                             ParamDef::optional("exponent", ParamKind::Any, "exponent: scalar or sequence")];
const UNARY: &[ParamDef] = &[ParamDef::optional("values", ParamKind::Any, "operand when no input is given")];
const ROUND: &[ParamDef] = &[ParamDef::optional("values", ParamKind::Any, "operand when no input is given"),
                             ParamDef::optional("decimals", ParamKind::Integer, "decimal places").with_default("0")];
const CLAMP: &[ParamDef] = &[ParamDef::optional("values", ParamKind::Any, "operand when no input is given"),
                             ParamDef::optional("min", ParamKind::Number, "lower bound"),
                             ParamDef::optional("max", ParamKind::Number, "upper bound")];

fn simple(name: &'static str, description: &'static str, params: &'static [ParamDef], run: super::SyncRun) -> FnPrimitive {
    FnPrimitive { name,
                  description,
                  family: Family::Math,
                  params,
                  check: None,
                  run }
}

pub(crate) fn register(reg: &mut PrimitiveRegistry) {
    reg.register(simple("add", "Elementwise a + b", BINARY, run_add));
    reg.register(simple("subtract", "Elementwise a - b", BINARY, run_subtract));
    reg.register(simple("multiply", "Elementwise a * b", BINARY, run_multiply));
    reg.register(simple("divide", "Elementwise a / b (division by zero yields NaN)", BINARY, run_divide));
    reg.register(simple("power", "Elementwise a ^ exponent", POWER, run_power));
    reg.register(simple("abs", "Absolute value", UNARY, run_abs));
    reg.register(simple("log", "Natural logarithm (non-positive yields NaN)", UNARY, run_log));
    reg.register(simple("log10", "Base-10 logarithm (non-positive yields NaN)", UNARY, run_log10));
    reg.register(simple("exp", "Exponential", UNARY, run_exp));
    reg.register(simple("sqrt", "Square root (negative yields NaN)", UNARY, run_sqrt));
    reg.register(FnPrimitive { check: Some(check_round),
                               ..simple("round", "Round to a number of decimals", ROUND, run_round) });
    reg.register(simple("floor", "Round down", UNARY, run_floor));
    reg.register(simple("ceil", "Round up", UNARY, run_ceil));
    reg.register(FnPrimitive { check: Some(check_clamp),
                               ..simple("clamp", "Limit values to [min, max]", CLAMP, run_clamp) });
}
