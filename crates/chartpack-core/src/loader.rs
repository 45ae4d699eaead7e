//! Chart loading
//!
//! Charts come either as a directory or as a packaged `.tgz`. Both are read
//! into a flat list of [`Entry`] values, then assembled into a [`Chart`]:
//!
//! | Path                              | Role                         |
//! |-----------------------------------|------------------------------|
//! | `Chart.yaml`                      | metadata (required)          |
//! | `values.toml`                     | rejected                     |
//! | `values.yaml`                     | raw values                   |
//! | `templates/...`                   | template                     |
//! | `charts/<name>/...`               | embedded chart (directory)   |
//! | `charts/<name>.tgz`               | embedded chart (packaged)    |
//! | anything else                     | auxiliary file               |
//!
//! Embedded charts are assembled recursively. The first failure anywhere in
//! the tree aborts the load, wrapped once per level with the dependency and
//! parent names.

use indexmap::IndexMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, trace, warn};

use crate::archive::{read_archive_contents, save_archive_with_config};
use crate::chart::{Chart, ChartFile, Metadata, Template};
use crate::config::LoaderConfig;
use crate::entry::Entry;
use crate::error::{CoreError, Result};
use crate::walk::walk_dir;

/// Load a chart directory or packaged chart with the default configuration
pub fn load<P: AsRef<Path>>(path: P) -> Result<Chart> {
    ChartLoader::default().load(path)
}

/// Load an unpacked chart directory
pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Chart> {
    ChartLoader::default().load_dir(dir)
}

/// Load a packaged chart file
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Chart> {
    ChartLoader::default().load_file(path)
}

/// Load a packaged chart from a gzip-compressed tar stream
pub fn load_archive<R: Read>(reader: R) -> Result<Chart> {
    ChartLoader::default().load_archive(reader)
}

/// Assemble a chart from already-read entries
pub fn load_entries(entries: Vec<Entry>) -> Result<Chart> {
    ChartLoader::default().load_entries(entries)
}

/// Builds chart trees according to a [`LoaderConfig`]
#[derive(Debug, Clone, Default)]
pub struct ChartLoader {
    config: LoaderConfig,
}

impl ChartLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Load from a directory or a packaged chart, whichever `path` is
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Chart> {
        let path = path.as_ref();
        let info = std::fs::metadata(path)
            .map_err(|e| CoreError::io(path.display().to_string(), e))?;

        if info.is_dir() {
            self.load_dir(path)
        } else {
            self.load_file(path)
        }
    }

    pub fn load_dir<P: AsRef<Path>>(&self, dir: P) -> Result<Chart> {
        let dir = dir.as_ref();
        debug!("loading chart directory {}", dir.display());

        let entries = walk_dir(dir)?;
        self.assemble(entries, 0)
    }

    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<Chart> {
        let path = path.as_ref();
        let info = std::fs::metadata(path)
            .map_err(|e| CoreError::io(path.display().to_string(), e))?;
        if info.is_dir() {
            return Err(CoreError::NotAFile {
                path: path.display().to_string(),
            });
        }

        debug!("loading chart archive {}", path.display());
        let file = File::open(path).map_err(|e| CoreError::io(path.display().to_string(), e))?;
        self.load_archive(file)
    }

    /// The wrapping directory name of the stream is not checked
    pub fn load_archive<R: Read>(&self, reader: R) -> Result<Chart> {
        let contents = read_archive_contents(reader)?;
        self.assemble(contents.entries, 0)
    }

    pub fn load_entries(&self, entries: Vec<Entry>) -> Result<Chart> {
        self.assemble(entries, 0)
    }

    /// Package `chart` in the layout this loader reads
    pub fn save_archive<W: Write>(&self, chart: &Chart, writer: W) -> Result<()> {
        save_archive_with_config(chart, writer, &self.config)
    }

    /// Classify `entries` into one chart, then resolve its embedded charts
    fn assemble(&self, entries: Vec<Entry>, depth: usize) -> Result<Chart> {
        let config = &self.config;
        let templates_prefix = config.templates_prefix();
        let charts_prefix = config.charts_prefix();

        let mut metadata: Option<Metadata> = None;
        let mut chart = Chart::default();
        // Keyed by the first segment below charts/, in first-seen order
        let mut staged: IndexMap<String, Vec<Entry>> = IndexMap::new();

        for entry in entries {
            if entry.path == config.metadata_file {
                metadata = Some(Metadata::from_bytes(&entry.data)?);
            } else if entry.path == config.deprecated_values_file {
                return Err(CoreError::DeprecatedValues { path: entry.path });
            } else if entry.path == config.values_file {
                chart.values = Some(entry.data);
            } else if entry.path.starts_with(&templates_prefix) {
                trace!("template {}", entry.path);
                chart.templates.push(Template {
                    name: entry.path,
                    data: entry.data,
                });
            } else if let Some(rest) = entry.path.strip_prefix(&charts_prefix) {
                let staged_entry = Entry::new(rest, entry.data);
                let key = staged_entry.first_segment().to_string();
                trace!("staging {} under dependency {}", staged_entry.path, key);
                staged.entry(key).or_default().push(staged_entry);
            } else {
                trace!("file {}", entry.path);
                chart.files.push(ChartFile {
                    tag: entry.path,
                    data: entry.data,
                });
            }
        }

        chart.metadata = match metadata {
            Some(metadata) if !metadata.name.is_empty() => metadata,
            _ => return Err(CoreError::MissingMetadata),
        };

        for (key, group) in staged {
            let dependency = self
                .load_dependency(chart.name(), &key, group, depth + 1)
                .map_err(|source| CoreError::Dependency {
                    name: key.clone(),
                    parent: chart.name().to_string(),
                    source: Box::new(source),
                })?;
            chart.dependencies.push(dependency);
        }

        Ok(chart)
    }

    /// Build one embedded chart from the entries staged under `key`
    fn load_dependency(
        &self,
        parent: &str,
        key: &str,
        group: Vec<Entry>,
        depth: usize,
    ) -> Result<Chart> {
        if depth > self.config.max_depth {
            return Err(CoreError::DependencyTooDeep {
                name: key.to_string(),
                max_depth: self.config.max_depth,
            });
        }

        if let Some(stem) = key.strip_suffix(self.config.archive_extension.as_str()) {
            debug!("unpacking packaged dependency {} in {}", key, parent);
            let data = single_archive_entry(parent, key, group)?;
            let contents = read_archive_contents(&data[..])?;

            if !archive_root_matches(stem, &contents.root) {
                return Err(CoreError::NestedArchiveMismatch {
                    parent: parent.to_string(),
                    expected: stem.to_string(),
                    actual: contents.root,
                });
            }

            return self.assemble(contents.entries, depth);
        }

        debug!("loading dependency directory {} in {}", key, parent);
        let mut entries = Vec::with_capacity(group.len());
        for entry in group {
            match entry.strip_first_segment().map(str::to_string) {
                Some(rest) => entries.push(Entry::new(rest, entry.data)),
                None => warn!(
                    "ignoring {} in {}: not inside a chart directory",
                    entry.path, parent
                ),
            }
        }

        self.assemble(entries, depth)
    }
}

/// The bytes of `charts/<key>` when it is the only entry staged under `key`
fn single_archive_entry(parent: &str, key: &str, group: Vec<Entry>) -> Result<Vec<u8>> {
    if let Some(stray) = group.iter().find(|e| e.path != key) {
        return Err(CoreError::NestedArchiveMismatch {
            parent: parent.to_string(),
            expected: key.to_string(),
            actual: stray.path.clone(),
        });
    }

    group
        .into_iter()
        .next()
        .map(|entry| entry.data)
        .ok_or(CoreError::EmptyArchive)
}

/// A packaged chart `<stem>.tgz` must wrap a directory named `<stem>`, or the
/// name part of a `<name>-<version>` stem
fn archive_root_matches(stem: &str, root: &str) -> bool {
    stem == root
        || stem
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('-'))
}
