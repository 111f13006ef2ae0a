//! Registro global de primitivas, indexado por nombre de operación.
use std::collections::BTreeMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::Serialize;

use super::{analysis, data, filters, math, returns, stats, Family, ParamDef, Primitive};
use crate::errors::DslError;

#[derive(Default)]
pub struct PrimitiveRegistry {
    entries: BTreeMap<&'static str, Arc<dyn Primitive>>,
}

/// Descripción serializable de una primitiva (para listados y tooling).
#[derive(Debug, Clone, Serialize)]
pub struct PrimitiveInfo {
    pub name: &'static str,
    pub family: Family,
    pub description: &'static str,
    pub parameters: &'static [ParamDef],
}

impl PrimitiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registro con todas las primitivas incorporadas.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        math::register(&mut reg);
        stats::register(&mut reg);
        returns::register(&mut reg);
        analysis::register(&mut reg);
        filters::register(&mut reg);
        data::register(&mut reg);
        reg
    }

    /// Registra (o reemplaza) una primitiva.
    pub fn register<P: Primitive + 'static>(&mut self, primitive: P) {
        self.entries.insert(primitive.name(), Arc::new(primitive));
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Primitive>, DslError> {
        self.entries.get(name).cloned().ok_or_else(|| self.unknown("lookup", name))
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Nombres ordenados alfabéticamente.
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn describe(&self) -> Vec<PrimitiveInfo> {
        self.entries
            .values()
            .map(|p| PrimitiveInfo { name: p.name(),
                                     family: p.family(),
                                     description: p.description(),
                                     parameters: p.parameters() })
            .collect()
    }

    pub(crate) fn unknown(&self, context: &str, operation: &str) -> DslError {
        DslError::UnknownOperation { context: context.to_string(),
                                     operation: operation.to_string(),
                                     valid: self.names().into_iter().map(String::from).collect() }
    }
}

static REGISTRY: Lazy<Arc<PrimitiveRegistry>> = Lazy::new(|| Arc::new(PrimitiveRegistry::with_builtins()));

/// Registro incorporado, construido una vez por proceso.
pub fn registry() -> Arc<PrimitiveRegistry> {
    Arc::clone(&REGISTRY)
}

pub fn get_primitive(name: &str) -> Result<Arc<dyn Primitive>, DslError> {
    REGISTRY.get(name)
}

pub fn has_primitive(name: &str) -> bool {
    REGISTRY.has(name)
}

pub fn list_primitives() -> Vec<&'static str> {
    REGISTRY.names()
}
