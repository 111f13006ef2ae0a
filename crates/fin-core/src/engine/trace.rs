//! Traza de depuración de una ejecución.
//!
//! Secuencia append-only de eventos más el orden de ejecución elegido y un
//! resumen por step. Sólo se construye con `ExecutionContext::debug`.
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::constants::ENGINE_VERSION;
use crate::hashing::hash_str;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEventKind {
    /// Primer evento de toda traza.
    RunStarted { step_count: usize, model_fingerprint: String },
    StepStarted { step_index: usize, step_id: String, operation: String },
    StepFinished {
        step_index: usize,
        step_id: String,
        operation: String,
        shape: String,
        fingerprint: String,
        elapsed_ms: u64,
    },
    /// Terminal: la ejecución no continúa.
    StepFailed {
        step_index: usize,
        step_id: String,
        operation: String,
        error: String,
    },
    /// Hash de los fingerprints de los steps en orden de ejecución.
    RunCompleted { run_fingerprint: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct RunEvent {
    pub seq: u64,
    pub kind: RunEventKind,
    pub ts: DateTime<Utc>, // metadato, no entra en fingerprints
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepSummary {
    pub step_id: String,
    pub operation: String,
    pub shape: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugTrace {
    pub run_id: Uuid,
    pub execution_order: Vec<String>,
    pub steps: Vec<StepSummary>,
    pub events: Vec<RunEvent>,
    #[serde(skip)]
    step_fingerprints: Vec<String>,
}

impl DebugTrace {
    pub fn new(run_id: Uuid) -> Self {
        Self { run_id,
               execution_order: Vec::new(),
               steps: Vec::new(),
               events: Vec::new(),
               step_fingerprints: Vec::new() }
    }

    pub fn record(&mut self, kind: RunEventKind) {
        if let RunEventKind::StepFinished { step_id, operation, shape, fingerprint, .. } = &kind {
            self.steps.push(StepSummary { step_id: step_id.clone(),
                                          operation: operation.clone(),
                                          shape: shape.clone() });
            self.step_fingerprints.push(fingerprint.clone());
        }
        let seq = self.events.len() as u64;
        self.events.push(RunEvent { seq,
                                    kind,
                                    ts: Utc::now() });
    }

    /// Fingerprint agregado de la ejecución (independiente de tiempos).
    pub fn run_fingerprint(&self) -> String {
        hash_str(&format!("{ENGINE_VERSION}|{}", self.step_fingerprints.join("|")))
    }

    pub fn kinds(&self) -> impl Iterator<Item = &RunEventKind> {
        self.events.iter().map(|e| &e.kind)
    }
}
