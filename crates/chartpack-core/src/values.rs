//! Values parsing and table lookup
//!
//! The loader keeps `values.yaml` as raw bytes. This module is the reader and
//! writer used by whatever consumes the chart tree afterwards.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::io::Write;

use crate::error::{CoreError, Result};

/// A mapping of chart values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(pub JsonValue);

impl Default for Values {
    fn default() -> Self {
        Self::new()
    }
}

impl Values {
    /// Create empty values
    pub fn new() -> Self {
        Self(JsonValue::Object(serde_json::Map::new()))
    }

    /// Parse values from raw YAML bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if is_blank_document(data) {
            return Ok(Self::new());
        }
        let value: JsonValue = serde_yaml::from_slice(data)?;
        Self::from_value(value)
    }

    /// Parse values from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Self::from_bytes(yaml.as_bytes())
    }

    fn from_value(value: JsonValue) -> Result<Self> {
        match value {
            // An empty document
            JsonValue::Null => Ok(Self::new()),
            JsonValue::Object(_) => Ok(Self(value)),
            other => Err(CoreError::InvalidValues {
                message: format!("top level must be a mapping, found {}", kind_of(&other)),
            }),
        }
    }

    /// Serialize to a YAML string
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.0)?)
    }

    /// Write serialized values to `w`
    pub fn encode<W: Write>(&self, w: W) -> Result<()> {
        serde_yaml::to_writer(w, &self.0)?;
        Ok(())
    }

    /// Get a nested table by dotted name (e.g. `"image.pull"`)
    ///
    /// Fails with `NoTable` when any segment is missing or is not a mapping.
    pub fn table(&self, name: &str) -> Result<Values> {
        let mut table = &self.0;
        for part in name.split('.') {
            table = match table.get(part) {
                Some(v @ JsonValue::Object(_)) => v,
                _ => {
                    return Err(CoreError::NoTable {
                        name: name.to_string(),
                    });
                }
            };
        }
        Ok(Values(table.clone()))
    }

    /// Get a value by dotted path
    pub fn get(&self, path: &str) -> Option<&JsonValue> {
        path.split('.').try_fold(&self.0, |current, key| current.get(key))
    }

    /// Get the inner JSON value
    pub fn inner(&self) -> &JsonValue {
        &self.0
    }

    pub fn into_inner(self) -> JsonValue {
        self.0
    }

    /// Check if values are empty
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            JsonValue::Object(map) => map.is_empty(),
            JsonValue::Null => true,
            _ => false,
        }
    }
}

/// True when the blob holds nothing but whitespace, comments and markers
pub(crate) fn is_blank_document(data: &[u8]) -> bool {
    String::from_utf8_lossy(data).lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#') || line == "---" || line == "..."
    })
}

fn kind_of(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "a sequence",
        JsonValue::Object(_) => "a mapping",
    }
}
