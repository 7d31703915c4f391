// ABOUTME: Schema patch command - adds missing columns to an existing table
// ABOUTME: Idempotent: columns that already exist are reported and left alone

use crate::sqlite::{self, reader};
use crate::utils::quote_identifier;
use anyhow::{bail, Context, Result};
use dialoguer::{theme::ColorfulTheme, Confirm};
use rusqlite::Connection;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

/// Table patched when neither the CLI nor the config names one
pub const DEFAULT_TABLE: &str = "vehicle";

/// A column to add: its name and the SQL that follows it in `ADD COLUMN`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnSpec {
    pub name: String,
    pub definition: String,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: definition.into(),
        }
    }
}

/// Parses `name:DEFINITION`, e.g. `currentVehicleMiles:INTEGER DEFAULT 0`
impl FromStr for ColumnSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, definition) = s
            .split_once(':')
            .ok_or_else(|| format!("expected NAME:DEFINITION, got '{}'", s))?;

        let name = name.trim();
        let definition = definition.trim();
        if name.is_empty() {
            return Err(format!("column name missing in '{}'", s));
        }
        if definition.is_empty() {
            return Err(format!("column definition missing in '{}'", s));
        }

        Ok(ColumnSpec::new(name, definition))
    }
}

/// Columns the vehicle table gained after its first release
pub fn default_columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::new("vehicleModel", "TEXT"),
        ColumnSpec::new("currentVehicleDriven", "TEXT DEFAULT 'false'"),
        ColumnSpec::new("currentVehicleMiles", "INTEGER DEFAULT 0"),
    ]
}

/// What happened to each requested column
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchReport {
    pub added: Vec<String>,
    pub already_present: Vec<String>,
    /// Column name and the error SQLite returned
    pub failed: Vec<(String, String)>,
}

/// Add any missing columns to `table`
///
/// Shows the current layout, asks for confirmation unless
/// `skip_confirmation` is set, then issues one `ALTER TABLE ... ADD COLUMN`
/// per column. A column that already exists is recorded as already present;
/// any other per-column failure is recorded and the remaining columns are
/// still attempted.
///
/// # Errors
///
/// Returns an error if the database cannot be opened, the table does not
/// exist, or the user declines the confirmation prompt.
pub fn patch_schema(
    db_path: &Path,
    table: &str,
    columns: &[ColumnSpec],
    skip_confirmation: bool,
) -> Result<PatchReport> {
    tracing::info!("Patching schema of '{}' in {}", table, db_path.display());

    let conn = sqlite::open_read_write(db_path)?;

    let existing = reader::table_columns(&conn, table)?;
    if existing.is_empty() {
        bail!("Table '{}' not found in {}", table, db_path.display());
    }

    tracing::info!("Current table structure:");
    log_columns(&conn, table)?;

    if !skip_confirmation {
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        let proceed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "Add column(s) {} to '{}' in {}?",
                names.join(", "),
                table,
                db_path.display()
            ))
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
        if !proceed {
            bail!("Schema patch cancelled by user");
        }
    }

    let mut report = PatchReport::default();
    for column in columns {
        if existing
            .iter()
            .any(|c| c.name.eq_ignore_ascii_case(&column.name))
        {
            tracing::info!("  {} already present", column.name);
            report.already_present.push(column.name.clone());
            continue;
        }

        let sql = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            quote_identifier(table),
            quote_identifier(&column.name),
            column.definition
        );
        match conn.execute_batch(&sql) {
            Ok(()) => {
                tracing::info!("  ✓ Added {} column", column.name);
                report.added.push(column.name.clone());
            }
            Err(e) if e.to_string().contains("duplicate column name") => {
                tracing::info!("  {} already present", column.name);
                report.already_present.push(column.name.clone());
            }
            Err(e) => {
                tracing::warn!("  ✗ {}: {}", column.name, e);
                report.failed.push((column.name.clone(), e.to_string()));
            }
        }
    }

    tracing::info!("Updated table structure:");
    log_columns(&conn, table)?;

    tracing::info!(
        "✓ Schema patch done: {} added, {} already present, {} failed",
        report.added.len(),
        report.already_present.len(),
        report.failed.len()
    );

    Ok(report)
}

fn log_columns(conn: &Connection, table: &str) -> Result<()> {
    for column in reader::table_columns(conn, table)? {
        tracing::info!(
            "  {} {} {}{}{}",
            column.cid,
            column.name,
            column.declared_type,
            if column.not_null { " NOT NULL" } else { "" },
            column
                .default_value
                .map(|d| format!(" DEFAULT {}", d))
                .unwrap_or_default()
        );
    }
    Ok(())
}
