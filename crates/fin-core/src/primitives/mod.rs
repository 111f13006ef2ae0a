//! Primitivas: unidades de cálculo invocables desde un step.
//!
//! Cada primitiva declara sus parámetros (`ParamDef`), valida los literales
//! de un step antes de ejecutar y produce un `Value` a partir de los
//! parámetros resueltos y de los resultados de sus `inputs`.

pub mod analysis;
pub mod call;
pub mod data;
pub mod filters;
pub mod math;
pub mod registry;
pub mod returns;
pub mod stats;

use async_trait::async_trait;
use serde::Serialize;

pub use call::{PrimitiveCall, ResolvedParams};
pub use registry::{get_primitive, has_primitive, list_primitives, registry, PrimitiveRegistry};

use crate::errors::PrimitiveError;
use crate::model::StepParams;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Number,
    Integer,
    String,
    Boolean,
    /// `Series` o `List`.
    Sequence,
    Any,
}

impl ParamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKind::Number => "number",
            ParamKind::Integer => "integer",
            ParamKind::String => "string",
            ParamKind::Boolean => "boolean",
            ParamKind::Sequence => "sequence",
            ParamKind::Any => "any",
        }
    }

    pub fn accepts(&self, v: &Value) -> bool {
        match self {
            ParamKind::Number => matches!(v, Value::Number(_)),
            ParamKind::Integer => matches!(v, Value::Number(n) if n.is_finite() && n.fract() == 0.0),
            ParamKind::String => matches!(v, Value::String(_)),
            ParamKind::Boolean => matches!(v, Value::Bool(_)),
            ParamKind::Sequence => v.is_sequence(),
            ParamKind::Any => true,
        }
    }
}

/// Declaración de un parámetro de primitiva.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParamDef {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub description: &'static str,
    /// Valor por defecto, tal como se documenta.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<&'static str>,
}

impl ParamDef {
    pub const fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self { name,
               kind,
               required: true,
               description,
               default: None }
    }

    pub const fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self { name,
               kind,
               required: false,
               description,
               default: None }
    }

    pub const fn with_default(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Math,
    Stats,
    Returns,
    Analysis,
    Filters,
    Data,
}

impl Family {
    pub fn as_str(&self) -> &'static str {
        match self {
            Family::Math => "math",
            Family::Stats => "stats",
            Family::Returns => "returns",
            Family::Analysis => "analysis",
            Family::Filters => "filters",
            Family::Data => "data",
        }
    }
}

#[async_trait]
pub trait Primitive: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn family(&self) -> Family;
    fn parameters(&self) -> &'static [ParamDef];

    /// Mensajes de error sobre los parámetros del step (vacío = válido).
    /// Solo se inspeccionan literales: las variables se comprueban al ejecutar.
    fn validate(&self, params: &StepParams) -> Vec<String> {
        check_declared(self.parameters(), params)
    }

    async fn execute(&self, call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError>;
}

/// Comprobación genérica: requeridos presentes y literales del tipo declarado.
pub fn check_declared(defs: &[ParamDef], params: &StepParams) -> Vec<String> {
    let mut errors = Vec::new();
    for def in defs {
        match params.get(def.name) {
            None if def.required => errors.push(format!("missing required parameter '{}'", def.name)),
            None => {}
            Some(p) => {
                if let Some(v) = p.as_literal() {
                    if !def.kind.accepts(v) {
                        errors.push(format!("parameter '{}' must be of type {} (got {})",
                                            def.name,
                                            def.kind.as_str(),
                                            v.kind_name()));
                    }
                }
            }
        }
    }
    errors
}

/// Literal entero >= `min`, si está presente.
pub fn check_min_int(params: &StepParams, name: &str, min: i64, errors: &mut Vec<String>) {
    if let Some(Value::Number(n)) = params.literal(name) {
        if n.fract() == 0.0 && (*n as i64) < min {
            errors.push(format!("parameter '{name}' must be >= {min}"));
        }
    }
}

/// Literal numérico dentro de `[lo, hi]`, si está presente.
pub fn check_range(params: &StepParams, name: &str, lo: f64, hi: f64, errors: &mut Vec<String>) {
    if let Some(Value::Number(n)) = params.literal(name) {
        if !(lo..=hi).contains(n) {
            errors.push(format!("parameter '{name}' must be between {lo} and {hi}"));
        }
    }
}

/// Literal de texto dentro de un conjunto cerrado, si está presente.
pub fn check_one_of(params: &StepParams, name: &str, allowed: &[&str], errors: &mut Vec<String>) {
    if let Some(Value::String(s)) = params.literal(name) {
        if !allowed.contains(&s.as_str()) {
            errors.push(format!("parameter '{name}' must be one of: {} (got '{s}')", allowed.join(", ")));
        }
    }
}

/// Literal de fecha `YYYY-MM-DD`, si está presente.
pub fn check_date(params: &StepParams, name: &str, errors: &mut Vec<String>) {
    if let Some(Value::String(s)) = params.literal(name) {
        if fin_domain::parse_date(s).is_err() {
            errors.push(format!("parameter '{name}' must be a YYYY-MM-DD date (got '{s}')"));
        }
    }
}

pub type SyncRun = fn(&PrimitiveCall<'_>) -> Result<Value, PrimitiveError>;
pub type ExtraCheck = fn(&StepParams) -> Vec<String>;

/// Primitiva síncrona descrita por tabla (la mayoría de cálculos puros).
pub struct FnPrimitive {
    pub name: &'static str,
    pub description: &'static str,
    pub family: Family,
    pub params: &'static [ParamDef],
    pub check: Option<ExtraCheck>,
    pub run: SyncRun,
}

#[async_trait]
impl Primitive for FnPrimitive {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        self.description
    }

    fn family(&self) -> Family {
        self.family
    }

    fn parameters(&self) -> &'static [ParamDef] {
        self.params
    }

    fn validate(&self, params: &StepParams) -> Vec<String> {
        let mut errors = check_declared(self.params, params);
        if let Some(check) = self.check {
            errors.extend(check(params));
        }
        errors
    }

    async fn execute(&self, call: &PrimitiveCall<'_>) -> Result<Value, PrimitiveError> {
        (self.run)(call)
    }
}
