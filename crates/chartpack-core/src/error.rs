//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// The input is not a readable gzip-compressed tar stream
    #[error("Invalid chart archive: {message}")]
    Format { message: String },

    #[error("No files in chart archive")]
    EmptyArchive,

    #[error("Chart metadata (Chart.yaml) missing")]
    MissingMetadata,

    #[error("{path} is no longer supported, use values.yaml")]
    DeprecatedValues { path: String },

    #[error("Error unpacking tar in {parent}: expected {expected}, got {actual}")]
    NestedArchiveMismatch {
        parent: String,
        expected: String,
        actual: String,
    },

    #[error("Error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A nested dependency failed to load
    #[error("Error unpacking {name} in {parent}: {source}")]
    Dependency {
        name: String,
        parent: String,
        #[source]
        source: Box<CoreError>,
    },

    #[error("Dependency {name} exceeds the maximum nesting depth of {max_depth}")]
    DependencyTooDeep { name: String, max_depth: usize },

    #[error("Cannot load a directory as a chart archive: {path}")]
    NotAFile { path: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Invalid values: {message}")]
    InvalidValues { message: String },

    #[error("No table named {name}")]
    NoTable { name: String },
}

impl CoreError {
    pub(crate) fn format(message: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The innermost error, skipping every `Dependency` wrapper
    pub fn root_cause(&self) -> &CoreError {
        let mut current = self;
        while let CoreError::Dependency { source, .. } = current {
            current = source.as_ref();
        }
        current
    }

    /// Names of the dependencies the failure passed through, outermost first
    pub fn dependency_chain(&self) -> Vec<&str> {
        let mut chain = Vec::new();
        let mut current = self;
        while let CoreError::Dependency { name, source, .. } = current {
            chain.push(name.as_str());
            current = source.as_ref();
        }
        chain
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
