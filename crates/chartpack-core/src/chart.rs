//! Chart tree produced by the loader

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::values::{is_blank_document, Values};

/// A loaded chart and, recursively, every chart it embeds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chart {
    /// Parsed Chart.yaml
    pub metadata: Metadata,

    /// Raw values.yaml bytes, kept verbatim
    pub values: Option<Vec<u8>>,

    /// Templates in encounter order
    pub templates: Vec<Template>,

    /// Files that match no other role, in encounter order
    pub files: Vec<ChartFile>,

    /// Embedded charts from charts/, in first-seen order
    pub dependencies: Vec<Chart>,
}

impl Chart {
    /// Chart name from metadata
    #[inline]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Find a direct dependency by its metadata name
    pub fn dependency(&self, name: &str) -> Option<&Chart> {
        self.dependencies.iter().find(|d| d.name() == name)
    }

    /// Find a template by its full path (e.g. `templates/service.yaml`)
    pub fn template(&self, name: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.name == name)
    }

    /// Find an auxiliary file by its tag
    pub fn file(&self, tag: &str) -> Option<&ChartFile> {
        self.files.iter().find(|f| f.tag == tag)
    }

    /// Number of dependency levels below this chart (0 for a leaf)
    pub fn depth(&self) -> usize {
        self.dependencies
            .iter()
            .map(|d| d.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Parse the raw values blob
    ///
    /// A chart without values.yaml yields an empty mapping.
    pub fn parsed_values(&self) -> Result<Values> {
        match &self.values {
            Some(raw) => Values::from_bytes(raw),
            None => Ok(Values::new()),
        }
    }
}

/// Chart.yaml contents
///
/// Only `name` is interpreted by the loader. Unknown keys are kept in `extra`
/// so the record survives a save/load cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Chart name (required, non-empty)
    #[serde(default)]
    pub name: String,

    /// Chart version, kept as written
    #[serde(default, deserialize_with = "scalar_string")]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub maintainers: Vec<Maintainer>,

    /// Template engine name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    /// Keys this crate does not model
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Metadata {
    /// Parse Chart.yaml bytes
    ///
    /// An empty or null document parses to a nameless record.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if is_blank_document(data) {
            return Ok(Self::default());
        }
        let document: serde_yaml::Value = serde_yaml::from_slice(data)?;
        if document.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_value(document)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Accept unquoted numeric versions such as `version: 1.0`
fn scalar_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::Null => Ok(String::new()),
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        other => Err(D::Error::custom(format!(
            "expected a scalar version, found {:?}",
            other
        ))),
    }
}

/// Maintainer information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Maintainer {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A template, named by its full relative path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub name: String,
    pub data: Vec<u8>,
}

/// An uninterpreted file, tagged by its full relative path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartFile {
    pub tag: String,
    pub data: Vec<u8>,
}
