// ABOUTME: SQLite to CSV export orchestration
// ABOUTME: Exports every user table of each database and writes a run manifest

pub mod manifest;
pub mod naming;
pub mod table;

pub use manifest::write_manifest;
pub use naming::{manifest_file_name, ArtifactNames};
pub use table::export_table;

use crate::sqlite::converter::BlobMode;
use crate::sqlite::{reader, SourceDatabase};
use crate::utils;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Default output directory for CSV artifacts
pub const DEFAULT_OUTPUT_DIR: &str = "csv_exports";

/// Settings shared by every table exported in one run
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub output_dir: PathBuf,
    /// Written in place of SQL NULL; `None` means an empty field
    pub null_repr: Option<String>,
    pub blob_mode: BlobMode,
    /// Embedded in every filename of the run
    pub timestamp: String,
    /// Where copies of locked databases go; `None` means the system temp directory
    pub temp_dir: Option<PathBuf>,
}

impl ExportOptions {
    /// Options with base64 blobs, empty NULLs, and a fresh UTC timestamp
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            null_repr: None,
            blob_mode: BlobMode::default(),
            timestamp: utils::run_timestamp(),
            temp_dir: None,
        }
    }

    pub fn with_null_repr(mut self, null_repr: impl Into<String>) -> Self {
        self.null_repr = Some(null_repr.into());
        self
    }

    pub fn with_blob_mode(mut self, blob_mode: BlobMode) -> Self {
        self.blob_mode = blob_mode;
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(temp_dir.into());
        self
    }
}

/// One successfully exported table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRecord {
    pub source_db: PathBuf,
    pub table_name: String,
    pub csv_filename: String,
    pub rows_exported: u64,
    pub notes: String,
}

/// Outcome of a whole export run
#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    pub records: Vec<ExportRecord>,
    /// `None` when nothing was exported
    pub manifest_path: Option<PathBuf>,
    /// Input paths skipped because no such file exists
    pub skipped_paths: usize,
    /// Databases abandoned because they could not be opened
    pub failed_databases: usize,
}

/// Export all user tables of every database in `databases`
///
/// Databases are processed in the given order, one at a time. Missing
/// files are skipped, databases that cannot be opened are abandoned, and
/// tables that fail are left out; each of these is reported as a
/// diagnostic and the run carries on. The manifest is written once every
/// database has been attempted, and only if at least one table was
/// exported.
///
/// # Errors
///
/// Only for problems that leave nothing to continue with: the output
/// directory cannot be created, or the manifest cannot be written.
///
/// # Examples
///
/// ```no_run
/// # use delivery_db_tools::export::{run, ExportOptions};
/// # use delivery_db_tools::sqlite::converter::BlobMode;
/// # use std::path::PathBuf;
/// # fn example() -> anyhow::Result<()> {
/// let options = ExportOptions::new("csv_exports")
///     .with_blob_mode(BlobMode::Placeholder)
///     .with_timestamp("20251104_170211");
/// let report = run(&[PathBuf::from("delivery.db")], &options)?;
/// println!("{} tables exported", report.records.len());
/// # Ok(())
/// # }
/// ```
pub fn run(databases: &[PathBuf], options: &ExportOptions) -> Result<ExportReport> {
    std::fs::create_dir_all(&options.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            options.output_dir.display()
        )
    })?;

    let mut report = ExportReport::default();
    let mut names = ArtifactNames::new();

    for (idx, db_path) in databases.iter().enumerate() {
        if !db_path.is_file() {
            tracing::warn!("Database file not found: {}", db_path.display());
            report.skipped_paths += 1;
            continue;
        }

        tracing::info!(
            "Exporting database {}/{}: {}",
            idx + 1,
            databases.len(),
            db_path.display()
        );

        match export_database(db_path, options, &mut names) {
            Ok(records) => report.records.extend(records),
            Err(e) => {
                tracing::error!("✗ Failed to export {}: {:#}", db_path.display(), e);
                report.failed_databases += 1;
            }
        }
    }

    if report.records.is_empty() {
        tracing::info!("No tables exported.");
        return Ok(report);
    }

    let manifest_path = write_manifest(&report.records, &options.output_dir, &options.timestamp)?;
    tracing::info!("Wrote manifest: {}", manifest_path.display());
    report.manifest_path = Some(manifest_path);

    Ok(report)
}

/// Export every user table of one database
///
/// A failing table is logged, its partial artifact removed by
/// [`export_table`], and the next table attempted; it contributes no
/// record. The database handle (and any
/// temporary copy behind it) is released when this function returns, on
/// every path.
///
/// # Errors
///
/// Returns an error if the database cannot be opened, even from a
/// temporary copy, or its catalog cannot be read.
pub fn export_database(
    db_path: &Path,
    options: &ExportOptions,
    names: &mut ArtifactNames,
) -> Result<Vec<ExportRecord>> {
    let db = match &options.temp_dir {
        Some(temp_dir) => SourceDatabase::open_in(db_path, temp_dir)?,
        None => SourceDatabase::open(db_path)?,
    };
    let tables = reader::list_tables(db.connection())
        .with_context(|| format!("Failed to list tables in {}", db_path.display()))?;

    if tables.is_empty() {
        tracing::warn!("No user tables found in {}", db_path.display());
        return Ok(Vec::new());
    }

    let notes = if db.is_temporary_copy() {
        format!("blob={}; read from temporary copy", options.blob_mode)
    } else {
        format!("blob={}", options.blob_mode)
    };

    let mut records = Vec::with_capacity(tables.len());
    for table in &tables {
        let csv_filename = names.table_csv(db_path, table, &options.timestamp);
        let csv_path = options.output_dir.join(&csv_filename);

        match export_table(
            db.connection(),
            table,
            &csv_path,
            options.null_repr.as_deref(),
            options.blob_mode,
        ) {
            Ok(rows_exported) => {
                tracing::info!(
                    "  ✓ Exported {} ({} rows) -> {}",
                    table,
                    rows_exported,
                    csv_path.display()
                );
                records.push(ExportRecord {
                    source_db: db_path.to_path_buf(),
                    table_name: table.clone(),
                    csv_filename,
                    rows_exported,
                    notes: notes.clone(),
                });
            }
            Err(e) => {
                tracing::error!(
                    "  ✗ Failed to export table {} from {}: {:#}",
                    table,
                    db_path.display(),
                    e
                );
            }
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn create_db(path: &Path, sql: &str) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(sql).unwrap();
    }

    #[test]
    fn test_export_options_defaults() {
        let options = ExportOptions::new("out");

        assert_eq!(options.output_dir, PathBuf::from("out"));
        assert_eq!(options.null_repr, None);
        assert_eq!(options.blob_mode, BlobMode::Base64);
        assert!(utils::validate_timestamp(&options.timestamp).is_ok());
    }

    #[test]
    fn test_export_database_returns_records_in_catalog_order() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("delivery.db");
        create_db(
            &db_path,
            "CREATE TABLE vehicle (id INTEGER);
             CREATE TABLE JobsTable (id INTEGER);
             INSERT INTO vehicle VALUES (1), (2);",
        );
        let options = ExportOptions::new(dir.path().join("out")).with_timestamp("t");
        std::fs::create_dir_all(&options.output_dir).unwrap();

        let records = export_database(&db_path, &options, &mut ArtifactNames::new()).unwrap();

        let tables: Vec<_> = records.iter().map(|r| r.table_name.as_str()).collect();
        assert_eq!(tables, vec!["JobsTable", "vehicle"]);
        assert_eq!(records[0].rows_exported, 0);
        assert_eq!(records[1].rows_exported, 2);
        assert_eq!(records[1].csv_filename, "delivery__vehicle__t.csv");
        assert_eq!(records[1].notes, "blob=base64");
        assert!(options.output_dir.join("delivery__vehicle__t.csv").is_file());
    }

    #[test]
    fn test_export_database_skips_failed_table_and_removes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("delivery.db");
        create_db(
            &db_path,
            "CREATE TABLE a_notes (body TEXT);
             INSERT INTO a_notes VALUES ('ok'), (CAST(X'FF' AS TEXT)), ('never reached');
             CREATE TABLE b_vehicle (id INTEGER);
             INSERT INTO b_vehicle VALUES (7);",
        );
        let options = ExportOptions::new(dir.path().join("out")).with_timestamp("t");
        std::fs::create_dir_all(&options.output_dir).unwrap();

        let records = export_database(&db_path, &options, &mut ArtifactNames::new()).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].table_name, "b_vehicle");
        assert!(!options.output_dir.join("delivery__a_notes__t.csv").exists());
    }

    #[test]
    fn test_export_database_without_tables() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("empty.db");
        create_db(&db_path, "PRAGMA user_version = 1;");
        let options = ExportOptions::new(dir.path().join("out")).with_timestamp("t");
        std::fs::create_dir_all(&options.output_dir).unwrap();

        let records = export_database(&db_path, &options, &mut ArtifactNames::new()).unwrap();

        assert!(records.is_empty());
        assert_eq!(std::fs::read_dir(&options.output_dir).unwrap().count(), 0);
    }

    #[test]
    fn test_run_fails_when_output_directory_cannot_be_created() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let options = ExportOptions::new(blocker.join("out"));

        let result = run(&[dir.path().join("delivery.db")], &options);

        assert!(result.is_err());
    }

    #[test]
    fn test_run_with_nothing_to_export_writes_no_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let options = ExportOptions::new(dir.path().join("out")).with_timestamp("t");

        let report = run(&[dir.path().join("missing.db")], &options).unwrap();

        assert!(report.records.is_empty());
        assert_eq!(report.manifest_path, None);
        assert_eq!(report.skipped_paths, 1);
        assert!(options.output_dir.is_dir());
        assert!(!options.output_dir.join("export_index__t.csv").exists());
    }
}
