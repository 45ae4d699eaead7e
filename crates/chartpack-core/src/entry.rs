//! Flat (path, bytes) entries read from an archive or a directory

/// One file of a chart before classification
///
/// `path` is relative to the chart root and always uses `/` separators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: String,
    pub data: Vec<u8>,
}

impl Entry {
    pub fn new(path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            data: data.into(),
        }
    }

    /// First path segment
    pub fn first_segment(&self) -> &str {
        self.path.split('/').next().unwrap_or_default()
    }

    /// Path below the first segment, `None` for a single-segment path
    pub fn strip_first_segment(&self) -> Option<&str> {
        self.path.split_once('/').map(|(_, rest)| rest)
    }
}
