// ABOUTME: CLI entry point for delivery-db-tools
// ABOUTME: Parses commands and routes to appropriate handlers

use clap::{Parser, Subcommand};
use delivery_db_tools::commands;
use delivery_db_tools::commands::patch_schema::ColumnSpec;
use delivery_db_tools::config::{self, ExportSettings};
use delivery_db_tools::sqlite::converter::BlobMode;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "delivery-db-tools")]
#[command(about = "Maintenance utilities for the delivery-tracking SQLite database", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export every user table of one or more databases to CSV, plus a manifest
    Export {
        /// SQLite database files to export
        #[arg(long = "db", num_args = 1.., required = true)]
        databases: Vec<PathBuf>,
        /// Output directory for CSV files (default: csv_exports)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Representation for NULL values (default: empty field)
        #[arg(long)]
        null_repr: Option<String>,
        /// How to write BLOB values (default: base64)
        #[arg(long, value_enum)]
        blob: Option<BlobMode>,
        /// Timestamp embedded in filenames (default: now, UTC, YYYYMMDD_HHMMSS)
        #[arg(long)]
        timestamp: Option<String>,
        /// TOML file with [export] defaults
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Add missing columns to a table (defaults to the vehicle table's late additions)
    PatchSchema {
        #[arg(long, default_value = "delivery.db")]
        db: PathBuf,
        /// Table to patch (default: vehicle)
        #[arg(long)]
        table: Option<String>,
        /// Column to add as NAME:DEFINITION, e.g. "vehicleModel:TEXT" (repeatable)
        #[arg(long = "add-column")]
        columns: Vec<ColumnSpec>,
        /// TOML file with a [schema_patch] section
        #[arg(long)]
        config: Option<PathBuf>,
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Change a user's authorization level in userAccount
    SetAdmin {
        #[arg(long, default_value = "delivery.db")]
        db: PathBuf,
        /// userName of the account to update
        #[arg(long)]
        user: String,
        #[arg(long, default_value = commands::set_admin::DEFAULT_LEVEL)]
        level: String,
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Print tables, views, column layouts, and sample rows
    Inspect {
        #[arg(long, default_value = "delivery.db")]
        db: PathBuf,
        /// Tables to describe (repeatable; default: all user tables)
        #[arg(long)]
        table: Vec<String>,
        /// Sample rows per table
        #[arg(long, default_value_t = commands::inspect::DEFAULT_SAMPLE_LIMIT)]
        limit: usize,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize logging - default to INFO level if RUST_LOG not set
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Copies of locked databases are removed after each export, but not if
    // the process was killed; sweep anything older than 24 hours
    if let Err(e) =
        delivery_db_tools::utils::cleanup_stale_temp_copies(Duration::from_secs(86400))
    {
        tracing::warn!("Failed to clean up stale temp copies: {}", e);
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            databases,
            out,
            null_repr,
            blob,
            timestamp,
            config: config_path,
        } => {
            let file = config::load_optional(config_path.as_deref())?;
            let settings = file.export.merge(ExportSettings {
                out,
                null_repr,
                blob,
            });
            commands::export(&databases, settings, timestamp).map(|_| ())
        }
        Commands::PatchSchema {
            db,
            table,
            columns,
            config: config_path,
            yes,
        } => {
            let file = config::load_optional(config_path.as_deref())?;
            let (file_table, file_columns) = match file.schema_patch {
                Some(patch) => (Some(patch.table), patch.columns),
                None => (None, Vec::new()),
            };

            let table = table
                .or(file_table)
                .unwrap_or_else(|| commands::patch_schema::DEFAULT_TABLE.to_string());
            let columns = if !columns.is_empty() {
                columns
            } else if !file_columns.is_empty() {
                file_columns
            } else {
                commands::patch_schema::default_columns()
            };

            commands::patch_schema(&db, &table, &columns, yes).map(|_| ())
        }
        Commands::SetAdmin {
            db,
            user,
            level,
            yes,
        } => commands::set_authorization(&db, &user, &level, yes).map(|_| ()),
        Commands::Inspect { db, table, limit } => commands::inspect(&db, &table, limit),
    }
}
