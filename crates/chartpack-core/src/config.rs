//! Loader configuration
//!
//! Reserved file names and directory prefixes used when classifying chart
//! entries. The defaults describe the standard chart layout.

use serde::{Deserialize, Serialize};

/// Configuration for chart loading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoaderConfig {
    /// Metadata file at the chart root (default: "Chart.yaml")
    pub metadata_file: String,

    /// Values file at the chart root (default: "values.yaml")
    pub values_file: String,

    /// Legacy values file that is rejected outright (default: "values.toml")
    pub deprecated_values_file: String,

    /// Directory holding templates (default: "templates")
    pub templates_dir: String,

    /// Directory holding embedded charts (default: "charts")
    pub charts_dir: String,

    /// Extension of a packaged chart inside `charts_dir` (default: ".tgz")
    pub archive_extension: String,

    /// Maximum nesting of embedded charts (default: 32)
    pub max_depth: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            metadata_file: "Chart.yaml".to_string(),
            values_file: "values.yaml".to_string(),
            deprecated_values_file: "values.toml".to_string(),
            templates_dir: "templates".to_string(),
            charts_dir: "charts".to_string(),
            archive_extension: ".tgz".to_string(),
            max_depth: 32,
        }
    }
}

impl LoaderConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum depth for nested charts
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set the templates directory name
    pub fn with_templates_dir(mut self, dir: impl Into<String>) -> Self {
        self.templates_dir = dir.into();
        self
    }

    /// Set the embedded charts directory name
    pub fn with_charts_dir(mut self, dir: impl Into<String>) -> Self {
        self.charts_dir = dir.into();
        self
    }

    /// Set the packaged chart extension (leading dot included)
    pub fn with_archive_extension(mut self, ext: impl Into<String>) -> Self {
        self.archive_extension = ext.into();
        self
    }

    pub(crate) fn templates_prefix(&self) -> String {
        format!("{}/", self.templates_dir)
    }

    pub(crate) fn charts_prefix(&self) -> String {
        format!("{}/", self.charts_dir)
    }
}
