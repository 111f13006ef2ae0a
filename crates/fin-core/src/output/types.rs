use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::value::{Record, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesOutput {
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub series_type: Option<String>,
    /// Puntos `{index, value}` o registros punto ya provistos por el step.
    pub data: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDef {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub column_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableOutput {
    pub id: String,
    pub label: String,
    pub columns: Vec<ColumnDef>,
    pub rows: Vec<Record>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScalarOutput {
    pub id: String,
    pub label: String,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputMetadata {
    pub computed_at: DateTime<Utc>,
    pub data_sources: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Output {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<Vec<SeriesOutput>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<TableOutput>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scalars: Option<Vec<ScalarOutput>>,
    pub metadata: OutputMetadata,
}

impl Output {
    pub fn series(&self, id: &str) -> Option<&SeriesOutput> {
        self.series.iter().flatten().find(|s| s.id == id)
    }

    pub fn table(&self, id: &str) -> Option<&TableOutput> {
        self.tables.iter().flatten().find(|t| t.id == id)
    }

    pub fn scalar(&self, id: &str) -> Option<&ScalarOutput> {
        self.scalars.iter().flatten().find(|s| s.id == id)
    }
}
