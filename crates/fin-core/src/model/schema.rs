//! Esquema declarativo de las entradas de ejecución.
use serde::{Deserialize, Serialize};

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Number,
    Integer,
    String,
    Boolean,
    /// Cadena `YYYY-MM-DD`.
    Date,
    /// Uno de `options`.
    Select,
    Array,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Select => "select",
            FieldType::Array => "array",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Expresión regular que deben cumplir los valores de texto.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl InputField {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self { name: name.into(),
               field_type,
               required: false,
               label: None,
               description: None,
               min: None,
               max: None,
               pattern: None,
               options: None,
               default: None }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, v: impl Into<Value>) -> Self {
        self.default = Some(v.into());
        self
    }

    pub fn with_bounds(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_options<I, V>(mut self, options: I) -> Self
        where I: IntoIterator<Item = V>,
              V: Into<Value>
    {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }
}

/// Acepta tanto `{"fields": [...]}` como la lista de campos directamente.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InputSchema {
    pub fields: Vec<InputField>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SchemaRepr {
    Wrapped { fields: Vec<InputField> },
    Bare(Vec<InputField>),
}

impl<'de> Deserialize<'de> for InputSchema {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match SchemaRepr::deserialize(deserializer)? {
            SchemaRepr::Wrapped { fields } | SchemaRepr::Bare(fields) => InputSchema { fields },
        })
    }
}

impl InputSchema {
    pub fn new(fields: Vec<InputField>) -> Self {
        Self { fields }
    }

    pub fn field(&self, name: &str) -> Option<&InputField> {
        self.fields.iter().find(|f| f.name == name)
    }
}
