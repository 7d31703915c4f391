// ABOUTME: Inspect command - prints catalog, column layouts, and sample rows
// ABOUTME: Reads through the same read-only/temporary-copy path as the exporter

use crate::sqlite::{reader, SourceDatabase};
use anyhow::{Context, Result};
use std::path::Path;

/// Default number of sample rows printed per table
pub const DEFAULT_SAMPLE_LIMIT: usize = 5;

/// Print an overview of a database for ad hoc inspection
///
/// Lists every table and view, then for each table in `tables` (all user
/// tables when empty) prints its `PRAGMA table_info` rows and up to
/// `limit` sample rows.
pub fn inspect(db_path: &Path, tables: &[String], limit: usize) -> Result<()> {
    let db = SourceDatabase::open(db_path)?;
    let conn = db.connection();

    println!("Using DB: {}", db_path.display());
    if db.is_temporary_copy() {
        println!("(database is locked; reading a temporary copy)");
    }

    println!();
    println!("{:<32} {:<8}", "Name", "Type");
    println!("{}", "─".repeat(41));
    for entry in reader::list_catalog(conn)? {
        println!("{:<32} {:<8}", entry.name, entry.kind);
    }

    let selected = if tables.is_empty() {
        reader::list_tables(conn)?
    } else {
        tables.to_vec()
    };

    for table in &selected {
        let columns = reader::table_columns(conn, table)?;
        if columns.is_empty() {
            tracing::warn!("⚠ Table '{}' not found", table);
            continue;
        }

        println!();
        println!("Columns for {}:", table);
        println!(
            "{:>4}  {:<28} {:<12} {:<8} {:<16} {:>3}",
            "cid", "name", "type", "notnull", "default", "pk"
        );
        for column in &columns {
            println!(
                "{:>4}  {:<28} {:<12} {:<8} {:<16} {:>3}",
                column.cid,
                column.name,
                column.declared_type,
                column.not_null,
                column.default_value.as_deref().unwrap_or("NULL"),
                column.primary_key
            );
        }

        let sample = reader::sample_rows(conn, table, limit)
            .with_context(|| format!("Failed to sample rows from '{}'", table))?;
        println!();
        println!("Sample rows from {} (up to {}):", table, limit);
        println!("{}", sample.columns.join(" | "));
        for row in &sample.rows {
            println!("{}", row.join(" | "));
        }
        if sample.rows.is_empty() {
            println!("(no rows)");
        }
    }

    Ok(())
}
