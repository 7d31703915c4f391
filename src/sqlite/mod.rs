// ABOUTME: SQLite access layer for the delivery database utilities
// ABOUTME: Opens source databases read-only, falling back to a private copy when locked

pub mod converter;
pub mod reader;

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempPath;

/// Filename prefix of temporary copies made from locked databases
pub const TEMP_COPY_PREFIX: &str = "delivery-db-copy-";

/// The file a [`SourceDatabase`] actually reads from
///
/// Either the original path, or a private temporary copy of a locked
/// original. The temporary copy is deleted when this value is dropped.
#[derive(Debug)]
pub enum WorkingPath {
    Original(PathBuf),
    TemporaryCopy(TempPath),
}

impl WorkingPath {
    pub fn path(&self) -> &Path {
        match self {
            WorkingPath::Original(path) => path.as_path(),
            WorkingPath::TemporaryCopy(temp) => &**temp,
        }
    }

    pub fn is_temporary_copy(&self) -> bool {
        matches!(self, WorkingPath::TemporaryCopy(_))
    }
}

/// An open source database and the working file behind it
///
/// Field order matters: the connection is declared (and therefore dropped)
/// before the working path, so the handle is closed before a temporary
/// copy is unlinked.
#[derive(Debug)]
pub struct SourceDatabase {
    conn: Connection,
    working: WorkingPath,
    source: PathBuf,
}

impl SourceDatabase {
    /// Open a database for reading without ever mutating the original
    ///
    /// First tries the original file read-only and probes it with a trivial
    /// catalog query. If that fails for any reason (typically another process
    /// holding an exclusive lock), the file is copied to a private temporary
    /// location and the copy is opened instead.
    ///
    /// # Errors
    ///
    /// Returns an error if neither the original nor a temporary copy can be
    /// opened and probed. Any copy made along the way is removed before
    /// returning.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use delivery_db_tools::sqlite::SourceDatabase;
    /// # fn example() -> anyhow::Result<()> {
    /// let db = SourceDatabase::open("delivery.db")?;
    /// if db.is_temporary_copy() {
    ///     println!("reading from a copy of a locked database");
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_in(path, &std::env::temp_dir())
    }

    /// Same as [`SourceDatabase::open`], placing any temporary copy in `temp_dir`
    pub fn open_in(path: impl AsRef<Path>, temp_dir: &Path) -> Result<Self> {
        let source = path.as_ref().to_path_buf();
        if !source.is_file() {
            anyhow::bail!("Database file not found: {}", source.display());
        }

        match open_read_only(&source) {
            Ok(conn) => {
                tracing::debug!("Opened {} read-only", source.display());
                Ok(Self {
                    conn,
                    working: WorkingPath::Original(source.clone()),
                    source,
                })
            }
            Err(e) => {
                tracing::warn!(
                    "Could not read {} directly ({:#}); exporting from a temporary copy",
                    source.display(),
                    e
                );

                let copy = copy_to_temp(&source, temp_dir)?;
                let conn = open_working_copy(&copy).with_context(|| {
                    format!(
                        "Failed to open {} even from a temporary copy",
                        source.display()
                    )
                })?;

                Ok(Self {
                    conn,
                    working: WorkingPath::TemporaryCopy(copy),
                    source,
                })
            }
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Path the caller asked for (never the temporary copy)
    pub fn source_path(&self) -> &Path {
        &self.source
    }

    pub fn working_path(&self) -> &Path {
        self.working.path()
    }

    pub fn is_temporary_copy(&self) -> bool {
        self.working.is_temporary_copy()
    }
}

/// Open a database read-only and verify it can actually be read
///
/// The busy timeout is zero so a locked file fails immediately instead of
/// stalling the export.
pub fn open_read_only(path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("Failed to open {} read-only", path.display()))?;

    conn.busy_timeout(Duration::ZERO)
        .context("Failed to set busy timeout")?;
    probe(&conn).with_context(|| format!("Failed to read catalog of {}", path.display()))?;

    Ok(conn)
}

/// Open a database read-write for maintenance commands
///
/// The file must already exist; a typo in the path should not silently
/// create an empty database.
pub fn open_read_write(path: &Path) -> Result<Connection> {
    if !path.is_file() {
        anyhow::bail!("Database file not found: {}", path.display());
    }

    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("Failed to open {}", path.display()))?;

    probe(&conn).with_context(|| format!("Failed to read catalog of {}", path.display()))?;

    Ok(conn)
}

fn probe(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("PRAGMA schema_version", [], |row| row.get(0))
}

// The copy is private to this process, so it is opened read-write: a
// read-only open of a WAL-mode copy can fail for lack of a -shm file.
fn open_working_copy(path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("Failed to open temporary copy {}", path.display()))?;

    probe(&conn)
        .with_context(|| format!("Failed to read catalog of temporary copy {}", path.display()))?;

    Ok(conn)
}

fn copy_to_temp(source: &Path, temp_dir: &Path) -> Result<TempPath> {
    let temp = tempfile::Builder::new()
        .prefix(TEMP_COPY_PREFIX)
        .suffix(".db")
        .tempfile_in(temp_dir)
        .with_context(|| {
            format!(
                "Failed to create temporary file for database copy in {}",
                temp_dir.display()
            )
        })?
        .into_temp_path();

    std::fs::copy(source, &temp).with_context(|| {
        format!(
            "Failed to copy {} to {}",
            source.display(),
            temp.display()
        )
    })?;

    tracing::debug!("Copied {} to {}", source.display(), temp.display());

    Ok(temp)
}
