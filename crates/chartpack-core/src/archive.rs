//! Reading and writing packaged charts
//!
//! A packaged chart is a gzip-compressed tar whose records all live under one
//! wrapping directory, conventionally named after the chart:
//!
//! ```text
//! frobnitz/Chart.yaml
//! frobnitz/values.yaml
//! frobnitz/templates/service.yaml
//! frobnitz/charts/alpine/Chart.yaml
//! ```

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tar::{Archive, Builder, Header};

use crate::chart::Chart;
use crate::config::LoaderConfig;
use crate::entry::Entry;
use crate::error::{CoreError, Result};

/// gzip magic bytes (RFC 1952)
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Entries of a decoded archive together with its wrapping directory name
#[derive(Debug, Clone)]
pub struct ArchiveContents {
    /// Name of the wrapping directory, taken from the first file record
    pub root: String,
    /// File records with the wrapping directory stripped, in archive order
    pub entries: Vec<Entry>,
}

/// Decode a gzip-compressed tar stream into chart entries
///
/// Directory records are skipped and the first path segment of every file
/// record is removed.
pub fn read_archive<R: Read>(reader: R) -> Result<Vec<Entry>> {
    Ok(read_archive_contents(reader)?.entries)
}

/// Like [`read_archive`], also reporting the wrapping directory name
pub fn read_archive_contents<R: Read>(mut reader: R) -> Result<ArchiveContents> {
    let mut magic = [0u8; 2];
    reader
        .read_exact(&mut magic)
        .map_err(|e| CoreError::format(format!("not a valid compressed stream: {}", e)))?;
    if magic != GZIP_MAGIC {
        return Err(CoreError::format("not a valid compressed stream"));
    }

    let mut archive = Archive::new(GzDecoder::new(magic.as_slice().chain(reader)));
    let mut root: Option<String> = None;
    let mut entries = Vec::new();

    let records = archive
        .entries()
        .map_err(|e| CoreError::format(format!("failed to read archive: {}", e)))?;

    for record in records {
        let mut record =
            record.map_err(|e| CoreError::format(format!("failed to read archive: {}", e)))?;

        let entry_type = record.header().entry_type();
        if entry_type.is_dir() || entry_type.is_pax_global_extensions() {
            continue;
        }

        let raw_path = String::from_utf8_lossy(&record.path_bytes()).into_owned();
        let (top, path) = split_wrapping_dir(&raw_path).ok_or_else(|| {
            CoreError::format(format!(
                "entry {} is not inside a chart directory",
                raw_path
            ))
        })?;
        let wrapping = root.get_or_insert_with(|| top.clone());
        if *wrapping != top {
            return Err(CoreError::format(format!(
                "entry {} is outside the chart directory {}",
                raw_path, wrapping
            )));
        }

        let mut data = Vec::new();
        record.read_to_end(&mut data).map_err(|e| {
            CoreError::format(format!("failed to read {} from archive: {}", raw_path, e))
        })?;

        entries.push(Entry { path, data });
    }

    match root {
        Some(root) => Ok(ArchiveContents { root, entries }),
        None => Err(CoreError::EmptyArchive),
    }
}

/// Split `top/rest/of/path` into (`top`, `rest/of/path`)
///
/// Empty and `.` segments are dropped first. Returns `None` when nothing is
/// left below the wrapping directory.
fn split_wrapping_dir(raw: &str) -> Option<(String, String)> {
    let mut segments = raw.split('/').filter(|s| !s.is_empty() && *s != ".");
    let top = segments.next()?;
    let rest: Vec<&str> = segments.collect();
    if rest.is_empty() {
        return None;
    }
    Some((top.to_string(), rest.join("/")))
}

/// Write a chart tree as a gzip-compressed tar
///
/// Dependencies are written as directories below `charts/`. Headers carry a
/// zero mtime so the same tree always produces the same bytes.
pub fn save_archive<W: Write>(chart: &Chart, writer: W) -> Result<()> {
    save_archive_with_config(chart, writer, &LoaderConfig::default())
}

/// Write a chart tree using the reserved names and directories of `config`
pub fn save_archive_with_config<W: Write>(
    chart: &Chart,
    writer: W,
    config: &LoaderConfig,
) -> Result<()> {
    let encoder = GzEncoder::new(writer, Compression::default());
    let mut builder = Builder::new(encoder);

    write_chart(&mut builder, chart, chart.name(), config)?;

    let encoder = builder
        .into_inner()
        .map_err(|e| CoreError::io(chart.name(), e))?;
    encoder
        .finish()
        .map_err(|e| CoreError::io(chart.name(), e))?;

    Ok(())
}

/// Write `<name>-<version>.tgz` into `dir` and return its path
pub fn save_archive_to_dir(chart: &Chart, dir: &Path) -> Result<PathBuf> {
    let output = dir.join(archive_file_name(chart));
    let file = File::create(&output).map_err(|e| CoreError::io(output.display().to_string(), e))?;
    save_archive(chart, file)?;

    tracing::debug!("saved chart {} to {}", chart.name(), output.display());
    Ok(output)
}

/// Default file name for a packaged chart
#[must_use]
pub fn archive_file_name(chart: &Chart) -> String {
    format!("{}-{}.tgz", chart.metadata.name, chart.metadata.version)
}

fn write_chart<W: Write>(
    builder: &mut Builder<W>,
    chart: &Chart,
    prefix: &str,
    config: &LoaderConfig,
) -> Result<()> {
    if chart.name().is_empty() {
        return Err(CoreError::MissingMetadata);
    }

    let metadata = chart.metadata.to_yaml()?;
    add_bytes_to_archive(
        builder,
        &format!("{}/{}", prefix, config.metadata_file),
        metadata.as_bytes(),
    )?;

    if let Some(values) = &chart.values {
        add_bytes_to_archive(
            builder,
            &format!("{}/{}", prefix, config.values_file),
            values,
        )?;
    }

    for template in &chart.templates {
        add_bytes_to_archive(
            builder,
            &format!("{}/{}", prefix, template.name),
            &template.data,
        )?;
    }

    for file in &chart.files {
        add_bytes_to_archive(builder, &format!("{}/{}", prefix, file.tag), &file.data)?;
    }

    for dependency in &chart.dependencies {
        let nested = format!("{}/{}/{}", prefix, config.charts_dir, dependency.name());
        write_chart(builder, dependency, &nested, config)?;
    }

    Ok(())
}

/// Add bytes to a tar archive with a given path
fn add_bytes_to_archive<W: Write>(
    builder: &mut Builder<W>,
    archive_path: &str,
    content: &[u8],
) -> Result<()> {
    let mut header = Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0);
    header.set_cksum();

    builder
        .append_data(&mut header, archive_path, content)
        .map_err(|e| CoreError::io(archive_path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{ChartFile, Metadata, Template};
    use tar::EntryType;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    /// Build a .tgz; `None` content makes a directory record
    fn tgz(records: &[(&str, Option<&str>)]) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = Builder::new(encoder);
        for (path, data) in records {
            let mut header = Header::new_gnu();
            match data {
                Some(data) => {
                    header.set_size(data.len() as u64);
                    header.set_mode(0o644);
                    header.set_cksum();
                    builder.append_data(&mut header, path, data.as_bytes()).unwrap();
                }
                None => {
                    header.set_entry_type(EntryType::Directory);
                    header.set_size(0);
                    header.set_mode(0o755);
                    header.set_cksum();
                    builder.append_data(&mut header, path, std::io::empty()).unwrap();
                }
            }
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    /// Hands out at most one byte per read
    struct Trickle<R>(R);

    impl<R: Read> Read for Trickle<R> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let len = buf.len().min(1);
            self.0.read(&mut buf[..len])
        }
    }

    #[test]
    fn test_read_strips_wrapping_dir() {
        let data = tgz(&[
            ("frobnitz/", None),
            ("frobnitz/Chart.yaml", Some("name: frobnitz\n")),
            ("frobnitz/templates/", None),
            ("frobnitz/templates/svc.yaml", Some("kind: Service\n")),
        ]);

        let contents = read_archive_contents(&data[..]).unwrap();
        assert_eq!(contents.root, "frobnitz");
        assert_eq!(
            contents.entries,
            vec![
                Entry::new("Chart.yaml", b"name: frobnitz\n".to_vec()),
                Entry::new("templates/svc.yaml", b"kind: Service\n".to_vec()),
            ]
        );
    }

    #[test]
    fn test_read_normalises_dot_prefix() {
        let data = tgz(&[("./frobnitz/Chart.yaml", Some("name: frobnitz\n"))]);
        let contents = read_archive_contents(&data[..]).unwrap();
        assert_eq!(contents.root, "frobnitz");
        assert_eq!(contents.entries[0].path, "Chart.yaml");
    }

    #[test]
    fn test_read_rejects_plain_bytes() {
        let err = read_archive(&b"this is not gzip"[..]).unwrap_err();
        assert!(matches!(err, CoreError::Format { .. }));
        assert!(err.to_string().contains("not a valid compressed stream"));

        assert!(matches!(
            read_archive(&b""[..]),
            Err(CoreError::Format { .. })
        ));
    }

    #[test]
    fn test_read_rejects_gzip_without_tar() {
        let data = gzip(b"compressed, but not a tarball");
        assert!(matches!(
            read_archive(&data[..]),
            Err(CoreError::Format { .. })
        ));
    }

    #[test]
    fn test_read_only_directories_is_empty() {
        let data = tgz(&[("frobnitz/", None), ("frobnitz/templates/", None)]);
        assert!(matches!(read_archive(&data[..]), Err(CoreError::EmptyArchive)));
    }

    #[test]
    fn test_read_no_records_is_empty() {
        let data = tgz(&[]);
        assert!(matches!(read_archive(&data[..]), Err(CoreError::EmptyArchive)));
    }

    #[test]
    fn test_read_short_reads() {
        let data = tgz(&[
            ("frobnitz/Chart.yaml", Some("name: frobnitz\n")),
            ("frobnitz/templates/svc.yaml", Some("kind: Service\n")),
        ]);

        let contents = read_archive_contents(Trickle(&data[..])).unwrap();
        assert_eq!(contents.root, "frobnitz");
        assert_eq!(contents.entries, read_archive(&data[..]).unwrap());
    }

    #[test]
    fn test_read_rejects_mixed_wrapping_dirs() {
        let data = tgz(&[
            ("frobnitz/Chart.yaml", Some("name: frobnitz\n")),
            ("other/values.yaml", Some("a: 1\n")),
        ]);
        let err = read_archive(&data[..]).unwrap_err();
        assert!(matches!(err, CoreError::Format { .. }));
        assert!(err.to_string().contains("other/values.yaml"));
    }

    #[test]
    fn test_read_rejects_unwrapped_file() {
        let data = tgz(&[("Chart.yaml", Some("name: frobnitz\n"))]);
        let err = read_archive(&data[..]).unwrap_err();
        assert!(matches!(err, CoreError::Format { .. }));
        assert!(err.to_string().contains("Chart.yaml"));
    }

    #[test]
    fn test_save_layout_and_name() {
        let chart = Chart {
            metadata: Metadata {
                name: "frobnitz".to_string(),
                version: "1.2.3".to_string(),
                ..Default::default()
            },
            values: Some(b"replicas: 3\n".to_vec()),
            templates: vec![Template {
                name: "templates/svc.yaml".to_string(),
                data: b"kind: Service\n".to_vec(),
            }],
            files: vec![ChartFile {
                tag: "README.md".to_string(),
                data: b"# Frobnitz\n".to_vec(),
            }],
            dependencies: vec![Chart {
                metadata: Metadata {
                    name: "alpine".to_string(),
                    ..Default::default()
                },
                ..Default::default()
            }],
        };

        let mut out = Vec::new();
        save_archive(&chart, &mut out).unwrap();

        let contents = read_archive_contents(&out[..]).unwrap();
        assert_eq!(contents.root, "frobnitz");
        let paths: Vec<_> = contents.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "Chart.yaml",
                "values.yaml",
                "templates/svc.yaml",
                "README.md",
                "charts/alpine/Chart.yaml",
            ]
        );
        assert_eq!(contents.entries[1].data, b"replicas: 3\n");
        assert_eq!(archive_file_name(&chart), "frobnitz-1.2.3.tgz");
    }

    #[test]
    fn test_save_is_reproducible() {
        let chart = Chart {
            metadata: Metadata {
                name: "frobnitz".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };

        let mut first = Vec::new();
        let mut second = Vec::new();
        save_archive(&chart, &mut first).unwrap();
        save_archive(&chart, &mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_save_requires_name() {
        let mut out = Vec::new();
        assert!(matches!(
            save_archive(&Chart::default(), &mut out),
            Err(CoreError::MissingMetadata)
        ));
    }
}
