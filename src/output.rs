//! Output sinks for dashboard tables.
//!
//! Supports pretty-printing, JSON serialization, and CSV export with
//! optional gzip compression.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::dashboard::{DashboardSnapshot, View};
use crate::record::CameraId;

/// Logs a snapshot using Rust's debug pretty-print format.
pub fn print_pretty(snapshot: &DashboardSnapshot) {
    debug!("{:#?}", snapshot);
}

/// Logs a snapshot as pretty-printed JSON.
pub fn print_json(snapshot: &DashboardSnapshot) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(snapshot)?);
    Ok(())
}

/// Serializes rows as CSV. The header line is taken from the first row, so
/// an empty table produces an empty body.
pub fn table_to_csv<T: Serialize>(rows: &[T]) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("failed to flush CSV writer: {}", e.error()))
}

/// Gzip-compresses `bytes`.
pub fn gzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}

/// Writes `rows` as CSV to `path`, appending `.gz` and compressing when
/// `compress` is set. Returns the path written.
pub fn write_table<T: Serialize>(path: &Path, rows: &[T], compress: bool) -> Result<PathBuf> {
    let csv = table_to_csv(rows)?;
    let (body, path) = if compress {
        let mut name = path.as_os_str().to_owned();
        name.push(".gz");
        (gzip(&csv)?, PathBuf::from(name))
    } else {
        (csv, path.to_path_buf())
    };

    let mut file =
        File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
    file.write_all(&body)?;
    debug!(path = %path.display(), rows = rows.len(), "Wrote table");
    Ok(path)
}

/// File-name stem for a view: `overall` or `camera_<id>`.
pub fn view_stem(view: &View) -> String {
    camera_stem(view.camera_id.as_ref())
}

/// Stem for the overall view (`None`) or one camera, safe to use in paths.
pub fn camera_stem(camera: Option<&CameraId>) -> String {
    match camera {
        None => "overall".to_string(),
        Some(camera) => {
            let id: String = camera
                .to_string()
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
                .collect();
            format!("camera_{}", id)
        }
    }
}

/// Exports every table of a view into `dir`:
/// `<stem>_hourly.csv`, `<stem>_sorted.csv`, `<stem>_long.csv`, `<stem>_raw.csv`.
pub fn export_view(dir: &Path, view: &View, compress: bool) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let stem = view_stem(view);

    let written = vec![
        write_table(&dir.join(format!("{stem}_hourly.csv")), view.series.rows(), compress)?,
        write_table(&dir.join(format!("{stem}_sorted.csv")), &view.sorted, compress)?,
        write_table(&dir.join(format!("{stem}_long.csv")), &view.long, compress)?,
        write_table(&dir.join(format!("{stem}_raw.csv")), &view.raw, compress)?,
    ];

    info!(dir = %dir.display(), files = written.len(), "Exported view");
    Ok(written)
}
