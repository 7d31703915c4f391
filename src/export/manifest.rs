// ABOUTME: Manifest CSV writer summarizing an export run
// ABOUTME: One row per exported table, stamped with the time each line is written

use crate::export::naming::manifest_file_name;
use crate::export::ExportRecord;
use crate::utils::utc_now_rfc3339;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Header row of the manifest
pub const MANIFEST_HEADER: [&str; 6] = [
    "source_db",
    "table_name",
    "csv_filename",
    "rows_exported",
    "export_time",
    "notes",
];

/// Write the manifest for a run into `output_dir`
///
/// `export_time` is taken when each line is written, not when the table was
/// exported.
///
/// # Returns
///
/// Path of the written manifest.
pub fn write_manifest(
    records: &[ExportRecord],
    output_dir: &Path,
    timestamp: &str,
) -> Result<PathBuf> {
    let path = output_dir.join(manifest_file_name(timestamp));

    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create manifest {}", path.display()))?;

    writer
        .write_record(MANIFEST_HEADER)
        .context("Failed to write manifest header")?;

    for record in records {
        let source_db = record.source_db.display().to_string();
        let rows_exported = record.rows_exported.to_string();
        let export_time = utc_now_rfc3339();
        writer
            .write_record([
                source_db.as_str(),
                record.table_name.as_str(),
                record.csv_filename.as_str(),
                rows_exported.as_str(),
                export_time.as_str(),
                record.notes.as_str(),
            ])
            .with_context(|| format!("Failed to write manifest row for '{}'", record.table_name))?;
    }

    writer
        .flush()
        .with_context(|| format!("Failed to flush manifest {}", path.display()))?;

    Ok(path)
}
