//! Directory walking for unpacked charts

use std::io;
use std::path::{Component, Path};
use walkdir::WalkDir;

use crate::entry::Entry;
use crate::error::{CoreError, Result};

/// Read every file below `root` into entries relative to `root`
///
/// Traversal is sorted by file name so the same tree always yields the same
/// order. Directories produce no entry. The first I/O failure aborts the walk
/// and reports the offending relative path.
pub fn walk_dir(root: &Path) -> Result<Vec<Entry>> {
    let top = std::path::absolute(root)
        .map_err(|e| CoreError::io(root.display().to_string(), e))?;

    if !top.is_dir() {
        return Err(CoreError::io(
            root.display().to_string(),
            io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
        ));
    }

    let mut entries = Vec::new();

    for item in WalkDir::new(&top).sort_by_file_name() {
        let item = item.map_err(|e| {
            let path = e
                .path()
                .map(|p| relative_path(&top, p))
                .unwrap_or_default();
            CoreError::io(path, io::Error::from(e))
        })?;

        if item.file_type().is_dir() {
            continue;
        }

        let path = relative_path(&top, item.path());
        let data = std::fs::read(item.path()).map_err(|e| CoreError::io(path.clone(), e))?;

        tracing::trace!("read {} ({} bytes)", path, data.len());
        entries.push(Entry { path, data });
    }

    Ok(entries)
}

/// `/`-joined path of `path` below `top`
fn relative_path(top: &Path, path: &Path) -> String {
    path.strip_prefix(top)
        .unwrap_or(path)
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
