//! Ejecución de un modelo: validar, linealizar, ejecutar cada step y
//! formatear las salidas, todo bajo un timeout global.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fin_providers::DataSources;
use log::{debug, error, info, warn};
use uuid::Uuid;

use super::builder::DslEngineBuilder;
use super::resolve::{resolve_args, resolve_params};
use super::result::ExecutionResult;
use super::trace::{DebugTrace, RunEventKind};
use super::StepResults;
use crate::errors::DslError;
use crate::graph::DependencyGraph;
use crate::hashing::{fingerprint_value, hash_str, to_canonical_json};
use crate::model::{ExecutionContext, Model, Step};
use crate::output::format_outputs;
use crate::primitives::{PrimitiveCall, PrimitiveRegistry};
use crate::validation::{ValidationReport, Validator};

/// Estado mutable de una ejecución. Vive fuera del futuro que se cancela
/// por timeout para poder informar de los steps completados.
struct RunState {
    results: StepResults,
    executed: usize,
    trace: Option<DebugTrace>,
}

impl RunState {
    fn record(&mut self, kind: RunEventKind) {
        if let Some(trace) = self.trace.as_mut() {
            trace.record(kind);
        }
    }
}

pub struct DslEngine {
    pub(crate) registry: Arc<PrimitiveRegistry>,
    pub(crate) sources: DataSources,
    pub(crate) default_timeout_ms: u64,
}

impl Default for DslEngine {
    fn default() -> Self {
        DslEngineBuilder::new().build()
    }
}

impl DslEngine {
    pub fn builder() -> DslEngineBuilder {
        DslEngineBuilder::new()
    }

    pub fn registry(&self) -> &PrimitiveRegistry {
        &self.registry
    }

    pub fn sources(&self) -> &DataSources {
        &self.sources
    }

    pub fn default_timeout_ms(&self) -> u64 {
        self.default_timeout_ms
    }

    pub fn validate(&self, model: &Model) -> ValidationReport {
        Validator::new(&self.registry).validate(model)
    }

    /// Ejecuta el modelo. Nunca devuelve `Err`: los fallos van en el sobre.
    pub async fn execute(&self, model: &Model, ctx: &ExecutionContext) -> ExecutionResult {
        let started = Instant::now();
        let run_id = Uuid::new_v4();
        let elapsed = |s: Instant| s.elapsed().as_millis() as u64;

        let report = self.validate(model);
        if !report.valid {
            warn!("run {run_id}: model rejected with {} validation error(s)", report.errors.len());
            return ExecutionResult::failed(run_id, report.errors, elapsed(started), 0, report.warnings);
        }

        let timeout_ms = ctx.timeout_ms.unwrap_or(self.default_timeout_ms);
        let mut state = RunState { results: StepResults::new(),
                                   executed: 0,
                                   trace: ctx.debug.then(|| DebugTrace::new(run_id)) };
        info!("run {run_id}: executing {} step(s) with timeout {timeout_ms}ms", model.steps.len());

        let outcome = tokio::time::timeout(Duration::from_millis(timeout_ms), self.run_steps(model, ctx, &mut state)).await;

        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e),
            Err(_) => {
                warn!("run {run_id}: timed out after {timeout_ms}ms ({} step(s) completed)", state.executed);
                Some(DslError::Timeout { timeout_ms })
            }
        };
        if let Some(e) = failure {
            error!("run {run_id}: {e}");
            return ExecutionResult::failed(run_id, vec![e], elapsed(started), state.executed, report.warnings)
                   .with_trace(state.trace);
        }

        match format_outputs(&state.results, &model.outputs) {
            Ok(mut output) => {
                let mut warnings = report.warnings.clone();
                warnings.append(&mut output.metadata.warnings);
                output.metadata.warnings = warnings;
                if let Some(trace) = state.trace.as_mut() {
                    let run_fingerprint = trace.run_fingerprint();
                    trace.record(RunEventKind::RunCompleted { run_fingerprint });
                }
                info!("run {run_id}: completed {} step(s) in {}ms", state.executed, elapsed(started));
                ExecutionResult::succeeded(run_id, output, elapsed(started), state.executed, report.warnings)
                .with_trace(state.trace)
            }
            Err(e) => {
                error!("run {run_id}: {e}");
                ExecutionResult::failed(run_id, vec![e], elapsed(started), state.executed, report.warnings)
                .with_trace(state.trace)
            }
        }
    }

    async fn run_steps(&self, model: &Model, ctx: &ExecutionContext, state: &mut RunState) -> Result<(), DslError> {
        let order = DependencyGraph::from_steps(&model.steps).topological_order()?;
        let by_id: HashMap<&str, &Step> = model.steps.iter().map(|s| (s.id.as_str(), s)).collect();

        if let Some(trace) = state.trace.as_mut() {
            let model_json = serde_json::to_value(model).unwrap_or_default();
            trace.execution_order = order.clone();
            trace.record(RunEventKind::RunStarted { step_count: order.len(),
                                                    model_fingerprint: hash_str(&to_canonical_json(&model_json)) });
        }
        debug!("execution order: {}", order.join(" -> "));

        for (index, id) in order.iter().enumerate() {
            let step = by_id.get(id.as_str())
                            .copied()
                            .ok_or_else(|| DslError::UnknownStepReference { context: "execution order".into(),
                                                                            reference: id.clone(),
                                                                            declared_later: false })?;
            let primitive = self.registry.get(&step.operation)?;
            let params = resolve_params(step, &ctx.inputs)?;

            state.record(RunEventKind::StepStarted { step_index: index,
                                                     step_id: step.id.clone(),
                                                     operation: step.operation.clone() });
            let step_started = Instant::now();

            let outcome = {
                let args = resolve_args(step, &state.results)?;
                let call = PrimitiveCall::new(&step.id, &params, args, &self.sources);
                primitive.execute(&call).await
            };

            let value = match outcome {
                Ok(v) => v,
                Err(source) => {
                    state.record(RunEventKind::StepFailed { step_index: index,
                                                            step_id: step.id.clone(),
                                                            operation: step.operation.clone(),
                                                            error: source.to_string() });
                    return Err(DslError::StepExecution { step_id: step.id.clone(),
                                                         operation: step.operation.clone(),
                                                         source });
                }
            };

            debug!("step '{}' ({}) -> {}", step.id, step.operation, value.shape());
            if state.trace.is_some() {
                let kind = RunEventKind::StepFinished { step_index: index,
                                                        step_id: step.id.clone(),
                                                        operation: step.operation.clone(),
                                                        shape: value.shape(),
                                                        fingerprint: fingerprint_value(&value),
                                                        elapsed_ms: step_started.elapsed().as_millis() as u64 };
                state.record(kind);
            }
            state.results.insert(step.id.clone(), value);
            state.executed += 1;

            // Punto de cancelación entre steps síncronos.
            tokio::task::yield_now().await;
        }
        Ok(())
    }
}

/// Ejecuta con el registro incorporado y sin colaboradores de datos.
pub async fn execute_dsl(model: &Model, ctx: &ExecutionContext) -> ExecutionResult {
    DslEngine::default().execute(model, ctx).await
}
