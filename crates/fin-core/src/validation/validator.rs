//! Validador de modelos DSL.
//!
//! Orden de comprobaciones:
//! 1. versión soportada;
//! 2. lista de steps no vacía;
//! 3. por step, en orden de declaración: id nuevo y con formato válido,
//!    operación registrada, parámetros aceptados por la primitiva e
//!    `inputs` que referencian steps ya declarados antes;
//! 4. definiciones de salida;
//! 5. ciclos en el grafo de dependencias;
//! 6. warnings (modelo demasiado grande, steps sin uso, variables fuera
//!    del esquema de entradas).
use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use super::ValidationReport;
use crate::constants::{DSL_VERSION, MAX_RECOMMENDED_STEPS, SERIES_TYPES, STEP_ID_PATTERN};
use crate::errors::DslError;
use crate::graph::DependencyGraph;
use crate::model::{source_step_id, Model};
use crate::primitives::{registry, PrimitiveRegistry};

static STEP_ID_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(STEP_ID_PATTERN).ok());

pub fn is_valid_step_id(id: &str) -> bool {
    match STEP_ID_RE.as_ref() {
        Some(re) => re.is_match(id),
        None => false,
    }
}

fn structural(msg: impl Into<String>) -> DslError {
    DslError::StructuralValidation(msg.into())
}

pub struct Validator<'a> {
    registry: &'a PrimitiveRegistry,
}

impl<'a> Validator<'a> {
    pub fn new(registry: &'a PrimitiveRegistry) -> Self {
        Self { registry }
    }

    pub fn validate(&self, model: &Model) -> ValidationReport {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if model.version != DSL_VERSION {
            errors.push(structural(format!("unsupported version '{}' (supported: {DSL_VERSION})", model.version)));
        }
        if model.steps.is_empty() {
            errors.push(structural("model must declare at least one step"));
        }

        self.check_steps(model, &mut errors);
        self.check_outputs(model, &mut errors);

        for path in DependencyGraph::from_steps(&model.steps).find_cycles() {
            errors.push(DslError::CircularDependency { path });
        }

        self.collect_warnings(model, &mut warnings);
        ValidationReport::new(errors, warnings)
    }

    fn check_steps(&self, model: &Model, errors: &mut Vec<DslError>) {
        let declared: HashSet<&str> = model.steps.iter().map(|s| s.id.as_str()).collect();
        let mut seen: HashSet<&str> = HashSet::new();

        for (i, step) in model.steps.iter().enumerate() {
            let label = if step.id.is_empty() { format!("#{}", i + 1) } else { step.id.clone() };

            if step.id.is_empty() {
                errors.push(structural(format!("step {label}: missing id")));
            } else if !is_valid_step_id(&step.id) {
                errors.push(structural(format!("invalid step id '{}': must match {STEP_ID_PATTERN}", step.id)));
            } else if seen.contains(step.id.as_str()) {
                errors.push(structural(format!("duplicate step id '{}'", step.id)));
            }

            if step.operation.is_empty() {
                errors.push(structural(format!("step '{label}': missing operation")));
            } else {
                match self.registry.get(&step.operation) {
                    Ok(primitive) => {
                        for message in primitive.validate(&step.params) {
                            errors.push(DslError::PrimitiveParam { step_id: label.clone(),
                                                                   message });
                        }
                    }
                    Err(_) => errors.push(self.registry.unknown(&format!("step '{label}'"), &step.operation)),
                }
            }

            for input in &step.inputs {
                if !seen.contains(input.as_str()) {
                    errors.push(DslError::UnknownStepReference { context: format!("step '{label}' input"),
                                                                 reference: input.clone(),
                                                                 declared_later: declared.contains(input.as_str())
                                                                                 && input != &step.id });
                }
            }

            if !step.id.is_empty() {
                seen.insert(step.id.as_str());
            }
        }
    }

    fn check_outputs(&self, model: &Model, errors: &mut Vec<DslError>) {
        if model.outputs.is_empty() {
            errors.push(structural("outputs must declare at least one of series, tables or scalars"));
            return;
        }
        let declared: HashSet<&str> = model.steps.iter().map(|s| s.id.as_str()).collect();
        let mut ids: HashSet<(&str, &str)> = HashSet::new();

        for out in model.outputs.refs() {
            let category = out.category.as_str();
            let name = if out.id.is_empty() { "<unnamed>" } else { out.id };
            if out.id.is_empty() {
                errors.push(structural(format!("{category} output is missing an id")));
            } else if !ids.insert((category, out.id)) {
                errors.push(structural(format!("duplicate {category} output id '{}'", out.id)));
            }
            if out.label.trim().is_empty() {
                errors.push(structural(format!("{category} output '{name}' is missing a label")));
            }
            if out.source.trim().is_empty() {
                errors.push(structural(format!("{category} output '{name}' is missing a source")));
                continue;
            }
            let step_id = source_step_id(out.source);
            if !declared.contains(step_id) {
                errors.push(DslError::UnknownStepReference { context: format!("{category} output '{name}' source"),
                                                             reference: step_id.to_string(),
                                                             declared_later: false });
            }
        }

        for series in model.outputs.series.iter().flatten() {
            if let Some(t) = &series.series_type {
                if !SERIES_TYPES.contains(&t.as_str()) {
                    errors.push(structural(format!("series output '{}' has invalid type '{t}' (expected one of: {})",
                                                   series.id,
                                                   SERIES_TYPES.join(", "))));
                }
            }
        }
    }

    fn collect_warnings(&self, model: &Model, warnings: &mut Vec<String>) {
        if model.steps.len() > MAX_RECOMMENDED_STEPS {
            warnings.push(format!("model has {} steps (more than {MAX_RECOMMENDED_STEPS}); consider splitting it into smaller models",
                                  model.steps.len()));
        }

        let graph = DependencyGraph::from_steps(&model.steps);
        let output_sources: HashSet<&str> = model.outputs.refs().iter().map(|o| source_step_id(o.source)).collect();
        for step in &model.steps {
            let id = step.id.as_str();
            if !id.is_empty() && graph.dependents(id).is_empty() && !output_sources.contains(id) {
                warnings.push(format!("step '{}' is never used by another step or an output", step.id));
            }
        }

        if let Some(schema) = &model.input_schema {
            for var in model.referenced_variables() {
                if schema.field(var).is_none() {
                    warnings.push(format!("variable '{var}' is not declared in the input schema"));
                }
            }
        }
    }
}

/// Valida contra el registro incorporado.
pub fn validate_dsl_model(model: &Model) -> ValidationReport {
    Validator::new(&registry()).validate(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldType, InputField, InputSchema, OutputDefinition, ParamValue, ScalarDef, SeriesDef, Step, StepParams};

    fn series_out(id: &str, source: &str) -> OutputDefinition {
        OutputDefinition { series: Some(vec![SeriesDef { id: id.into(),
                                                         label: "Label".into(),
                                                         source: source.into(),
                                                         ..SeriesDef::default() }]),
                           ..OutputDefinition::default() }
    }

    fn model(steps: Vec<Step>, outputs: OutputDefinition) -> Model {
        Model { version: DSL_VERSION.into(),
                steps,
                outputs,
                input_schema: None }
    }

    fn values_step(id: &str) -> Step {
        Step::new(id, "mean").with_params(StepParams::new().with("values", ParamValue::literal(vec![1.0, 2.0])))
    }

    #[test]
    fn valid_model_passes() {
        let m = model(vec![values_step("a")], series_out("s", "a"));
        let report = validate_dsl_model(&m);
        assert!(report.valid, "{:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn collects_every_error_in_one_pass() {
        let m = Model { version: "0.9".into(),
                        steps: vec![Step::new("Bad-Id", "teleport"), Step::new("b", "rolling_mean")],
                        outputs: OutputDefinition::default(),
                        input_schema: None };
        let report = validate_dsl_model(&m);
        assert!(!report.valid);
        let messages = report.error_messages();
        assert!(messages.iter().any(|m| m.contains("unsupported version")));
        assert!(messages.iter().any(|m| m.contains("invalid step id 'Bad-Id'")));
        assert!(messages.iter().any(|m| m.contains("unknown operation 'teleport'") && m.contains("rolling_mean")));
        assert!(messages.iter().any(|m| m == "step 'b': missing required parameter 'window'"));
        assert!(messages.iter().any(|m| m.contains("outputs must declare")));
    }

    #[test]
    fn input_declared_later_is_unknown_step() {
        let m = model(vec![Step::new("b", "abs").with_inputs(["c"]), values_step("c")], series_out("s", "b"));
        let report = validate_dsl_model(&m);
        assert!(!report.valid);
        let msg = report.joined_errors();
        assert!(msg.contains("unknown step 'c'"));
        assert!(msg.contains("declared later"));
    }

    #[test]
    fn cycle_is_reported_with_both_ids() {
        let m = model(vec![Step::new("a", "abs").with_inputs(["b"]), Step::new("b", "abs").with_inputs(["a"])],
                      series_out("s", "a"));
        let report = validate_dsl_model(&m);
        let cycle = report.errors.iter().find_map(|e| match e {
                                               DslError::CircularDependency { path } => Some(path.clone()),
                                               _ => None,
                                           });
        let path = cycle.expect("cycle reported");
        assert!(path.contains(&"a".to_string()) && path.contains(&"b".to_string()));
    }

    #[test]
    fn duplicate_ids_and_bad_outputs() {
        let outputs = OutputDefinition { series: Some(vec![SeriesDef { id: "s".into(),
                                                                       label: "".into(),
                                                                       source: "ghost.x".into(),
                                                                       series_type: Some("pie".into()),
                                                                       color: None }]),
                                         scalars: Some(vec![ScalarDef { id: "k".into(),
                                                                        label: "K".into(),
                                                                        source: "a".into(),
                                                                        format: None },
                                                            ScalarDef { id: "k".into(),
                                                                        label: "K2".into(),
                                                                        source: "a".into(),
                                                                        format: None }]),
                                         tables: None };
        let m = model(vec![values_step("a"), values_step("a")], outputs);
        let msgs = validate_dsl_model(&m).error_messages();
        assert!(msgs.contains(&"duplicate step id 'a'".to_string()));
        assert!(msgs.contains(&"series output 's' is missing a label".to_string()));
        assert!(msgs.contains(&"series output 's' source references unknown step 'ghost'".to_string()));
        assert!(msgs.iter().any(|m| m.contains("invalid type 'pie'")));
        assert!(msgs.contains(&"duplicate scalar output id 'k'".to_string()));
    }

    #[test]
    fn large_models_warn_but_stay_valid() {
        let mut steps = vec![values_step("s0")];
        for i in 1..=MAX_RECOMMENDED_STEPS {
            steps.push(Step::new(format!("s{i}"), "abs").with_inputs([format!("s{}", i - 1)]));
        }
        let last = format!("s{MAX_RECOMMENDED_STEPS}");
        let report = validate_dsl_model(&model(steps, series_out("out", &last)));
        assert!(report.valid);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("consider splitting"));
    }

    #[test]
    fn unused_steps_and_undeclared_variables_warn() {
        let mut m = model(vec![values_step("a"),
                               Step::new("b", "fetch_market_data").with_params(StepParams::new().with("symbol", ParamValue::variable("ticker")))],
                          series_out("s", "a"));
        m.input_schema = Some(InputSchema::new(vec![InputField::new("symbol", FieldType::String)]));
        let report = validate_dsl_model(&m);
        assert!(report.valid);
        assert!(report.warnings.contains(&"step 'b' is never used by another step or an output".to_string()));
        assert!(report.warnings.contains(&"variable 'ticker' is not declared in the input schema".to_string()));
    }

    #[test]
    fn steps_consumed_only_by_other_steps_are_used() {
        let m = model(vec![values_step("a"), Step::new("b", "abs").with_inputs(["a"]), Step::new("c", "abs").with_inputs(["a"])],
                      series_out("s", "b"));
        let report = validate_dsl_model(&m);
        assert!(report.valid, "{:?}", report.errors);
        assert_eq!(report.warnings, vec!["step 'c' is never used by another step or an output".to_string()]);
    }
}
