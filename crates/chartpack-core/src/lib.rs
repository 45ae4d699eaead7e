//! Chartpack Core - chart loading for the chartpack packaging format
//!
//! This crate reads a chart, either an unpacked directory or a packaged
//! `.tgz`, into an in-memory tree:
//! - `Chart`: metadata, raw values, templates, auxiliary files and embedded
//!   dependency charts
//! - `ChartLoader`: classifies files and resolves `charts/` recursively
//! - `Values`: parsing of the raw values blob for downstream consumers
//!
//! ```no_run
//! let chart = chartpack_core::load("./frobnitz").unwrap();
//! for dependency in &chart.dependencies {
//!     println!("{} depends on {}", chart.name(), dependency.name());
//! }
//! ```

pub mod archive;
pub mod chart;
pub mod config;
pub mod entry;
pub mod error;
pub mod loader;
pub mod values;
pub mod walk;

pub use archive::{
    archive_file_name, read_archive, read_archive_contents, save_archive,
    save_archive_with_config, save_archive_to_dir, ArchiveContents,
};
pub use chart::{Chart, ChartFile, Maintainer, Metadata, Template};
pub use config::LoaderConfig;
pub use entry::Entry;
pub use error::{CoreError, Result};
pub use loader::{load, load_archive, load_dir, load_entries, load_file, ChartLoader};
pub use values::Values;
pub use walk::walk_dir;
