// ABOUTME: Export command implementation - SQLite tables to CSV files
// ABOUTME: Resolves settings from config and CLI, then runs the exporter

use crate::config::ExportSettings;
use crate::export::{self, ExportOptions, ExportReport, DEFAULT_OUTPUT_DIR};
use crate::utils;
use anyhow::Result;
use std::path::PathBuf;

/// Export tables from one or more SQLite databases to CSV
///
/// `settings` is the already-merged result of the config file and CLI
/// flags; anything still unset falls back to the exporter defaults
/// (`csv_exports/`, empty NULLs, base64 blobs). Without an explicit
/// `timestamp`, or with a blank one, the current UTC time is used.
///
/// # Errors
///
/// Returns an error if the timestamp is unusable in filenames, the output
/// directory cannot be created, or the manifest cannot be written. Missing
/// or unreadable databases and failing tables are reported but do not fail
/// the command.
///
/// # Examples
///
/// ```no_run
/// # use anyhow::Result;
/// # use delivery_db_tools::commands::export;
/// # use delivery_db_tools::config::ExportSettings;
/// # use std::path::PathBuf;
/// # fn example() -> Result<()> {
/// export(
///     &[PathBuf::from("delivery.db"), PathBuf::from("identifier.sqlite")],
///     ExportSettings::default(),
///     Some("20251104_170211".to_string()),
/// )?;
/// # Ok(())
/// # }
/// ```
pub fn export(
    databases: &[PathBuf],
    settings: ExportSettings,
    timestamp: Option<String>,
) -> Result<ExportReport> {
    let mut options = ExportOptions::new(
        settings
            .out
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
    )
    .with_blob_mode(settings.blob.unwrap_or_default());

    if let Some(null_repr) = settings.null_repr {
        options = options.with_null_repr(null_repr);
    }
    // A blank timestamp means "not given"
    if let Some(timestamp) = timestamp.filter(|ts| !ts.trim().is_empty()) {
        utils::validate_timestamp(&timestamp)?;
        options = options.with_timestamp(timestamp);
    }

    tracing::info!(
        "Exporting {} database(s) to {} (blob={}, timestamp={})",
        databases.len(),
        options.output_dir.display(),
        options.blob_mode,
        options.timestamp
    );

    let report = export::run(databases, &options)?;

    let total_rows: u64 = report.records.iter().map(|r| r.rows_exported).sum();
    tracing::info!(
        "Export finished: {} table(s), {} row(s), {} missing file(s), {} unreadable database(s)",
        report.records.len(),
        total_rows,
        report.skipped_paths,
        report.failed_databases
    );

    Ok(report)
}
