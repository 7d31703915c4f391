// ABOUTME: Streams one SQLite table into a CSV artifact
// ABOUTME: Writes the header from the result-set description, then converts rows one at a time

use crate::sqlite::converter::{value_to_field, BlobMode};
use crate::utils::quote_identifier;
use anyhow::{Context, Result};
use csv::{QuoteStyle, WriterBuilder};
use rusqlite::{Connection, Statement};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Export every row of `table` to a CSV file at `csv_path`
///
/// The header is the column list of `SELECT * FROM <table>` as SQLite
/// reports it for the prepared statement, so it always matches the fields
/// in each data row. Rows are read from the cursor and written one at a
/// time; the table is never held in memory.
///
/// # Returns
///
/// The number of data rows written (header excluded).
///
/// # Errors
///
/// Any failure while querying, converting a value, or writing the file.
/// A file this call created is removed before returning the error; a
/// failure before the file is created leaves any existing file untouched.
pub fn export_table(
    conn: &Connection,
    table: &str,
    csv_path: &Path,
    null_repr: Option<&str>,
    blob_mode: BlobMode,
) -> Result<u64> {
    let sql = format!("SELECT * FROM {}", quote_identifier(table));
    let mut stmt = conn
        .prepare(&sql)
        .with_context(|| format!("Failed to prepare select on '{}'", table))?;

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let file = File::create(csv_path)
        .with_context(|| format!("Failed to create {}", csv_path.display()))?;

    match write_rows(&mut stmt, &columns, file, table, null_repr, blob_mode) {
        Ok(rows_written) => Ok(rows_written),
        Err(e) => {
            remove_partial_artifact(csv_path);
            Err(e)
        }
    }
}

fn write_rows(
    stmt: &mut Statement<'_>,
    columns: &[String],
    file: File,
    table: &str,
    null_repr: Option<&str>,
    blob_mode: BlobMode,
) -> Result<u64> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .from_writer(BufWriter::new(file));

    writer
        .write_record(columns)
        .context("Failed to write CSV header")?;

    let mut rows = stmt
        .query([])
        .with_context(|| format!("Failed to query '{}'", table))?;

    let mut rows_written: u64 = 0;
    let mut fields: Vec<String> = Vec::with_capacity(columns.len());
    while let Some(row) = rows
        .next()
        .with_context(|| format!("Failed to read row {} of '{}'", rows_written + 1, table))?
    {
        fields.clear();
        for (idx, column) in columns.iter().enumerate() {
            let value = row.get_ref(idx)?;
            let field = value_to_field(value, null_repr, blob_mode).with_context(|| {
                format!("Row {}, column '{}'", rows_written + 1, column)
            })?;
            fields.push(field);
        }

        writer
            .write_record(&fields)
            .with_context(|| format!("Failed to write row {}", rows_written + 1))?;
        rows_written += 1;
    }

    writer.flush().context("Failed to flush CSV output")?;

    Ok(rows_written)
}

fn remove_partial_artifact(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!("Removed partial artifact {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            "Failed to remove partial artifact {}: {}",
            path.display(),
            e
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_csv(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect()
    }

    #[test]
    fn test_export_table_writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE deliveryData (id INTEGER, address TEXT, weight REAL, note TEXT);
             INSERT INTO deliveryData VALUES (1, '12 Elm St, Apt 4', 2.0, NULL);
             INSERT INTO deliveryData VALUES (2, 'Box \"B\"', 0.25, 'fragile');",
        )
        .unwrap();
        let out = dir.path().join("out.csv");

        let rows = export_table(&conn, "deliveryData", &out, None, BlobMode::Base64).unwrap();

        assert_eq!(rows, 2);
        let records = read_csv(&out);
        assert_eq!(records[0], vec!["id", "address", "weight", "note"]);
        assert_eq!(records[1], vec!["1", "12 Elm St, Apt 4", "2.0", ""]);
        assert_eq!(records[2], vec!["2", "Box \"B\"", "0.25", "fragile"]);
    }

    #[test]
    fn test_export_table_uses_minimal_quoting() {
        let dir = tempfile::tempdir().unwrap();
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (a TEXT, b TEXT);
             INSERT INTO t VALUES ('plain', 'needs, quoting');",
        )
        .unwrap();
        let out = dir.path().join("t.csv");

        export_table(&conn, "t", &out, None, BlobMode::Base64).unwrap();

        let content = std::fs::read_to_string(&out).unwrap();
        assert_eq!(content, "a,b\nplain,\"needs, quoting\"\n");
    }

    #[test]
    fn test_export_table_header_follows_result_set() {
        let dir = tempfile::tempdir().unwrap();
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE vehicle (vehicleID INTEGER);
             ALTER TABLE vehicle ADD COLUMN vehicleModel TEXT;",
        )
        .unwrap();
        let out = dir.path().join("vehicle.csv");

        let rows = export_table(&conn, "vehicle", &out, None, BlobMode::Base64).unwrap();

        assert_eq!(rows, 0);
        assert_eq!(read_csv(&out), vec![vec!["vehicleID", "vehicleModel"]]);
    }

    #[test]
    fn test_export_table_fails_on_malformed_text() {
        let dir = tempfile::tempdir().unwrap();
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE notes (body TEXT);
             INSERT INTO notes VALUES ('fine');
             INSERT INTO notes VALUES (CAST(X'FF' AS TEXT));",
        )
        .unwrap();
        let out = dir.path().join("notes.csv");

        let result = export_table(&conn, "notes", &out, None, BlobMode::Base64);

        assert!(result.is_err());
        let msg = format!("{:#}", result.unwrap_err());
        assert!(msg.contains("Row 2"), "unexpected error: {}", msg);
        assert!(!out.exists(), "partial artifact should be removed");
    }

    #[test]
    fn test_export_table_failing_before_create_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let conn = Connection::open_in_memory().unwrap();
        let out = dir.path().join("delivery__vehicle__t.csv");
        std::fs::write(&out, "vehicleID\n7\n").unwrap();

        let result = export_table(&conn, "vehicle", &out, None, BlobMode::Base64);

        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "vehicleID\n7\n");
    }

    #[test]
    fn test_export_table_missing_table_fails() {
        let dir = tempfile::tempdir().unwrap();
        let conn = Connection::open_in_memory().unwrap();
        let out = dir.path().join("ghost.csv");

        assert!(export_table(&conn, "ghost", &out, None, BlobMode::Base64).is_err());
        assert!(!out.exists());
    }
}
