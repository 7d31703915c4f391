// ABOUTME: Deterministic artifact naming for CSV exports
// ABOUTME: Builds per-table and manifest filenames and keeps them unique within a run

use crate::utils::sanitize_name;
use std::collections::HashSet;
use std::path::Path;

/// Separator between the parts of a generated filename
pub const NAME_DELIMITER: &str = "__";

/// Filename of the manifest for a run
pub fn manifest_file_name(timestamp: &str) -> String {
    format!("export_index{}{}.csv", NAME_DELIMITER, timestamp)
}

/// Registry of artifact names issued during one export run
///
/// Two different inputs can sanitize to the same name (`My Table` and
/// `my_table`, or `delivery.db` in two directories). Repeats get a numeric
/// suffix so no artifact overwrites another within the run.
#[derive(Debug, Default)]
pub struct ArtifactNames {
    issued: HashSet<String>,
}

impl ArtifactNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the CSV filename for one table of one database
    ///
    /// The name is `<db stem>__<table>__<timestamp>.csv` with both names
    /// sanitized, or `<db stem>__<table>__<timestamp>__<n>.csv` when that
    /// name was already issued in this run.
    pub fn table_csv(&mut self, db_path: &Path, table: &str, timestamp: &str) -> String {
        let db_stem = db_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        let base = [sanitize_name(&db_stem), sanitize_name(table), timestamp.to_string()]
            .join(NAME_DELIMITER);

        let mut candidate = format!("{}.csv", base);
        let mut n = 2;
        while !self.issued.insert(candidate.clone()) {
            candidate = format!("{}{}{}.csv", base, NAME_DELIMITER, n);
            n += 1;
        }

        candidate
    }
}
