// ABOUTME: SQLite catalog introspection and row sampling
// ABOUTME: Lists user tables, column layouts, and sample rows for export and inspection

use crate::sqlite::converter::display_value;
use crate::utils::quote_identifier;
use anyhow::{Context, Result};
use rusqlite::Connection;

/// Name prefix SQLite reserves for its own catalog tables
pub const INTERNAL_TABLE_PREFIX: &str = "sqlite_";

/// One entry of `sqlite_master` (a table or a view)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: String,
    pub kind: String,
}

/// One row of `PRAGMA table_info`
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub cid: i64,
    pub name: String,
    pub declared_type: String,
    pub not_null: bool,
    pub default_value: Option<String>,
    /// 1-based position within the primary key, 0 if not part of it
    pub primary_key: i64,
}

/// Column names plus a handful of display-formatted rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSample {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// List user tables in catalog order
///
/// Tables whose names start with [`INTERNAL_TABLE_PREFIX`] belong to the
/// storage engine and are excluded. Names are ordered by SQLite's binary
/// collation so exports are deterministic.
///
/// # Examples
///
/// ```
/// # use delivery_db_tools::sqlite::reader::list_tables;
/// # fn example() -> anyhow::Result<()> {
/// let conn = rusqlite::Connection::open_in_memory()?;
/// conn.execute_batch("CREATE TABLE vehicle (id INTEGER); CREATE TABLE JobsTable (id INTEGER);")?;
/// assert_eq!(list_tables(&conn)?, vec!["JobsTable", "vehicle"]);
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
pub fn list_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .context("Failed to query table catalog")?;

    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .context("Failed to list tables")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to read table catalog")?;

    let user_tables: Vec<String> = names
        .into_iter()
        .filter(|name| !name.starts_with(INTERNAL_TABLE_PREFIX))
        .collect();

    tracing::debug!("Found {} user tables", user_tables.len());

    Ok(user_tables)
}

/// List every table and view in the catalog, internal ones included
pub fn list_catalog(conn: &Connection) -> Result<Vec<CatalogEntry>> {
    let mut stmt = conn
        .prepare(
            "SELECT name, type FROM sqlite_master
             WHERE type IN ('table', 'view')
             ORDER BY type, name",
        )
        .context("Failed to query catalog")?;

    let entries = stmt
        .query_map([], |row| {
            Ok(CatalogEntry {
                name: row.get(0)?,
                kind: row.get(1)?,
            })
        })
        .context("Failed to list catalog")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to read catalog")?;

    Ok(entries)
}

/// Column layout of a table as declared in the schema
///
/// Returns an empty list for a table that does not exist.
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<ColumnInfo>> {
    let sql = format!("PRAGMA table_info({})", quote_identifier(table));
    let mut stmt = conn
        .prepare(&sql)
        .with_context(|| format!("Failed to inspect columns of '{}'", table))?;

    let columns = stmt
        .query_map([], |row| {
            Ok(ColumnInfo {
                cid: row.get(0)?,
                name: row.get(1)?,
                declared_type: row.get(2)?,
                not_null: row.get::<_, i64>(3)? != 0,
                default_value: row.get(4)?,
                primary_key: row.get(5)?,
            })
        })
        .with_context(|| format!("Failed to inspect columns of '{}'", table))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .with_context(|| format!("Failed to read columns of '{}'", table))?;

    Ok(columns)
}

/// Read up to `limit` rows of a table, formatted for display
pub fn sample_rows(conn: &Connection, table: &str, limit: usize) -> Result<TableSample> {
    let sql = format!("SELECT * FROM {} LIMIT ?1", quote_identifier(table));
    let mut stmt = conn
        .prepare(&sql)
        .with_context(|| format!("Failed to query table '{}'", table))?;

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let column_count = columns.len();

    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let mut rows = stmt
        .query([limit])
        .with_context(|| format!("Failed to query table '{}'", table))?;

    let mut sampled = Vec::new();
    while let Some(row) = rows
        .next()
        .with_context(|| format!("Failed to read row from '{}'", table))?
    {
        let mut values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            values.push(display_value(row.get_ref(idx)?));
        }
        sampled.push(values);
    }

    Ok(TableSample {
        columns,
        rows: sampled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE vehicle (
                 vehicleID INTEGER PRIMARY KEY AUTOINCREMENT,
                 plate TEXT NOT NULL,
                 status TEXT DEFAULT 'idle'
             );
             CREATE TABLE userAccount (userName TEXT, authorization TEXT);
             CREATE VIEW idle_vehicles AS SELECT * FROM vehicle WHERE status = 'idle';
             INSERT INTO vehicle (plate) VALUES ('ABC-123'), ('XYZ-789'), ('JKL-456');
             INSERT INTO userAccount VALUES ('testUser', NULL);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_list_tables_excludes_internal_and_orders_by_name() {
        let conn = fixture();

        let tables = list_tables(&conn).unwrap();

        // AUTOINCREMENT creates sqlite_sequence, which must be hidden
        assert_eq!(tables, vec!["userAccount", "vehicle"]);
    }

    #[test]
    fn test_list_tables_empty_database() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(list_tables(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_list_catalog_includes_views() {
        let conn = fixture();

        let entries = list_catalog(&conn).unwrap();

        assert!(entries.contains(&CatalogEntry {
            name: "idle_vehicles".to_string(),
            kind: "view".to_string(),
        }));
        assert!(entries.iter().any(|e| e.name == "sqlite_sequence"));
    }

    #[test]
    fn test_table_columns() {
        let conn = fixture();

        let columns = table_columns(&conn, "vehicle").unwrap();

        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].name, "vehicleID");
        assert_eq!(columns[0].primary_key, 1);
        assert!(columns[1].not_null);
        assert_eq!(columns[2].default_value.as_deref(), Some("'idle'"));
    }

    #[test]
    fn test_table_columns_missing_table_is_empty() {
        let conn = fixture();
        assert!(table_columns(&conn, "nope").unwrap().is_empty());
    }

    #[test]
    fn test_sample_rows_respects_limit() {
        let conn = fixture();

        let sample = sample_rows(&conn, "vehicle", 2).unwrap();

        assert_eq!(sample.columns, vec!["vehicleID", "plate", "status"]);
        assert_eq!(sample.rows.len(), 2);
        assert_eq!(sample.rows[0], vec!["1", "ABC-123", "idle"]);
    }

    #[test]
    fn test_sample_rows_displays_null() {
        let conn = fixture();

        let sample = sample_rows(&conn, "userAccount", 5).unwrap();

        assert_eq!(sample.rows, vec![vec!["testUser".to_string(), "NULL".to_string()]]);
    }
}
