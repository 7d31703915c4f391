// ABOUTME: Utility functions for naming, validation, and resource cleanup
// ABOUTME: Provides filename sanitization, run timestamps, and stale temp-copy removal

use anyhow::{bail, Context, Result};
use chrono::{SecondsFormat, Utc};
use std::path::Path;
use std::time::Duration;

/// Replacement used when a name sanitizes down to nothing
pub const UNNAMED: &str = "unnamed";

/// Sanitize a database or table name for use inside a filename
///
/// Lowercases the input, collapses every run of characters outside
/// `[0-9a-z]` into a single underscore, and trims underscores from both
/// ends. An empty result becomes [`UNNAMED`].
///
/// The output is deterministic and sanitizing it again yields the same
/// string.
///
/// # Examples
///
/// ```
/// # use delivery_db_tools::utils::sanitize_name;
/// assert_eq!(sanitize_name("My Table! 2"), "my_table_2");
/// assert_eq!(sanitize_name("__deliveryData__"), "deliverydata");
/// assert_eq!(sanitize_name("!!!"), "unnamed");
/// ```
pub fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_separator = false;

    for ch in name.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_separator && !out.is_empty() {
                out.push('_');
            }
            pending_separator = false;
            out.push(ch);
        } else {
            pending_separator = true;
        }
    }

    if out.is_empty() {
        UNNAMED.to_string()
    } else {
        out
    }
}

/// Quote an SQLite identifier (table or column name) for interpolation into SQL
///
/// Wraps the name in double quotes and doubles any embedded quote, so
/// names with spaces or punctuation survive intact.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Default run timestamp embedded in generated filenames (UTC, second precision)
pub fn run_timestamp() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Wall-clock UTC time in RFC 3339 form, e.g. `2025-11-04T17:02:11.493021Z`
pub fn utc_now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Validate a caller-supplied run timestamp
///
/// The timestamp is embedded verbatim in output filenames, so it must be
/// non-empty and must not be able to escape the output directory.
pub fn validate_timestamp(timestamp: &str) -> Result<()> {
    if timestamp.trim().is_empty() {
        bail!("Timestamp cannot be empty");
    }

    if timestamp.contains('/') || timestamp.contains('\\') || timestamp.contains("..") {
        bail!(
            "Invalid timestamp '{}': it is used in filenames and cannot contain path separators or '..'",
            timestamp
        );
    }

    Ok(())
}

/// Remove temporary database copies left behind by earlier runs
///
/// Copies are normally deleted when the export that made them finishes,
/// but a process killed with SIGKILL never gets that far. Scans the system
/// temp directory for files carrying [`crate::sqlite::TEMP_COPY_PREFIX`]
/// that are older than `max_age` and deletes them.
///
/// Returns the number of files removed.
pub fn cleanup_stale_temp_copies(max_age: Duration) -> Result<usize> {
    cleanup_stale_temp_copies_in(&std::env::temp_dir(), max_age)
}

/// Same as [`cleanup_stale_temp_copies`], scanning `dir` instead of the system temp directory
pub fn cleanup_stale_temp_copies_in(dir: &Path, max_age: Duration) -> Result<usize> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read temp directory {}", dir.display()))?;

    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        if !name
            .to_string_lossy()
            .starts_with(crate::sqlite::TEMP_COPY_PREFIX)
        {
            continue;
        }

        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }

        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .unwrap_or_default();
        if age < max_age {
            continue;
        }

        match std::fs::remove_file(entry.path()) {
            Ok(()) => {
                tracing::debug!("Removed stale temp copy {}", entry.path().display());
                removed += 1;
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to remove stale temp copy {}: {}",
                    entry.path().display(),
                    e
                );
            }
        }
    }

    Ok(removed)
}
