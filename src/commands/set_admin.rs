// ABOUTME: Access-flag command - changes a user's authorization level
// ABOUTME: Lists accounts, updates one user with a parameterized statement, and verifies

use crate::sqlite;
use anyhow::{bail, Context, Result};
use dialoguer::{theme::ColorfulTheme, Confirm};
use rusqlite::{params, Connection};
use std::path::Path;

/// Authorization level granted when none is specified
pub const DEFAULT_LEVEL: &str = "admin";

/// A row of `userAccount`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAuthorization {
    pub user_name: String,
    pub authorization: Option<String>,
}

/// Set `user_name`'s authorization level to `level`
///
/// Returns the number of rows updated. Zero means no such user and is
/// logged as a warning rather than treated as an error, so re-running
/// against a database without that account is harmless.
///
/// # Errors
///
/// Returns an error if the database cannot be opened, the `userAccount`
/// table is missing, or the user declines the confirmation prompt.
pub fn set_authorization(
    db_path: &Path,
    user_name: &str,
    level: &str,
    skip_confirmation: bool,
) -> Result<usize> {
    let conn = sqlite::open_read_write(db_path)?;

    tracing::info!("Current users and authorization levels:");
    for user in list_users(&conn)? {
        tracing::info!(
            "  {}: {}",
            user.user_name,
            user.authorization.as_deref().unwrap_or("<none>")
        );
    }

    if !skip_confirmation {
        let proceed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Set '{}' to '{}'?", user_name, level))
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
        if !proceed {
            bail!("Authorization update cancelled by user");
        }
    }

    tracing::info!("Updating '{}' to {}...", user_name, level);
    let updated = conn
        .execute(
            "UPDATE userAccount SET authorization = ?1 WHERE userName = ?2",
            params![level, user_name],
        )
        .with_context(|| format!("Failed to update authorization for '{}'", user_name))?;

    if updated == 0 {
        tracing::warn!("⚠ No user named '{}' in userAccount", user_name);
    } else {
        tracing::info!("✓ Rows affected: {}", updated);
    }

    let holders = users_with_level(&conn, level)?;
    tracing::info!("Users with '{}': {}", level, holders.join(", "));

    Ok(updated)
}

/// All accounts with their authorization level
pub fn list_users(conn: &Connection) -> Result<Vec<UserAuthorization>> {
    let mut stmt = conn
        .prepare("SELECT userName, authorization FROM userAccount")
        .context("Failed to query userAccount")?;

    let users = stmt
        .query_map([], |row| {
            Ok(UserAuthorization {
                user_name: row.get(0)?,
                authorization: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to read userAccount")?;

    Ok(users)
}

/// Names of the accounts currently holding `level`
pub fn users_with_level(conn: &Connection, level: &str) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT userName FROM userAccount WHERE authorization = ?1 ORDER BY userName")
        .context("Failed to query userAccount")?;

    let names = stmt
        .query_map([level], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()
        .context("Failed to read userAccount")?;

    Ok(names)
}
