//! Declaración de salidas del modelo.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesDef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub series_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableDef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScalarDef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub source: String,
    /// Pista de presentación ("percent", "currency", ...). No se interpreta.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputCategory {
    Series,
    Table,
    Scalar,
}

impl OutputCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputCategory::Series => "series",
            OutputCategory::Table => "table",
            OutputCategory::Scalar => "scalar",
        }
    }
}

/// Referencia uniforme a una declaración de salida (para validar).
#[derive(Debug, Clone, Copy)]
pub struct OutputRef<'a> {
    pub category: OutputCategory,
    pub id: &'a str,
    pub label: &'a str,
    pub source: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<Vec<SeriesDef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<TableDef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scalars: Option<Vec<ScalarDef>>,
}

impl OutputDefinition {
    /// Ninguna categoría declara salidas.
    pub fn is_empty(&self) -> bool {
        self.series.as_ref().map_or(true, Vec::is_empty)
        && self.tables.as_ref().map_or(true, Vec::is_empty)
        && self.scalars.as_ref().map_or(true, Vec::is_empty)
    }

    pub fn refs(&self) -> Vec<OutputRef<'_>> {
        let mut out = Vec::new();
        for s in self.series.iter().flatten() {
            out.push(OutputRef { category: OutputCategory::Series,
                                 id: &s.id,
                                 label: &s.label,
                                 source: &s.source });
        }
        for t in self.tables.iter().flatten() {
            out.push(OutputRef { category: OutputCategory::Table,
                                 id: &t.id,
                                 label: &t.label,
                                 source: &t.source });
        }
        for s in self.scalars.iter().flatten() {
            out.push(OutputRef { category: OutputCategory::Scalar,
                                 id: &s.id,
                                 label: &s.label,
                                 source: &s.source });
        }
        out
    }
}

/// Primer segmento de una ruta de salida (`"reg.slope"` => `"reg"`).
pub fn source_step_id(source: &str) -> &str {
    source.split('.').next().unwrap_or(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_lists_count_as_empty() {
        let def = OutputDefinition { series: Some(vec![]),
                                     ..OutputDefinition::default() };
        assert!(def.is_empty());
    }

    #[test]
    fn source_step_id_takes_first_segment() {
        assert_eq!(source_step_id("reg.slope"), "reg");
        assert_eq!(source_step_id("closes"), "closes");
    }
}
