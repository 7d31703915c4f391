// ABOUTME: TOML configuration for the maintenance utilities
// ABOUTME: Supplies export defaults and schema-patch columns that CLI flags can override

use crate::commands::patch_schema::ColumnSpec;
use crate::sqlite::converter::BlobMode;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Contents of a configuration file
///
/// ```toml
/// [export]
/// out = "csv_exports"
/// null_repr = "\\N"
/// blob = "placeholder"
///
/// [schema_patch]
/// table = "vehicle"
/// columns = [
///     { name = "vehicleModel", definition = "TEXT" },
/// ]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolConfig {
    #[serde(default)]
    pub export: ExportSettings,
    pub schema_patch: Option<SchemaPatchSettings>,
}

/// Export settings; every field is optional so layers can be stacked
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportSettings {
    pub out: Option<PathBuf>,
    pub null_repr: Option<String>,
    pub blob: Option<BlobMode>,
}

impl ExportSettings {
    /// Layer `overrides` on top of `self`; fields set in `overrides` win
    pub fn merge(self, overrides: ExportSettings) -> ExportSettings {
        ExportSettings {
            out: overrides.out.or(self.out),
            null_repr: overrides.null_repr.or(self.null_repr),
            blob: overrides.blob.or(self.blob),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaPatchSettings {
    pub table: String,
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
}

/// Parse configuration from TOML text
pub fn parse_config(contents: &str) -> Result<ToolConfig> {
    toml::from_str(contents).context("Failed to parse configuration")
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<ToolConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("Invalid config file {}", path.display()))
}

/// Load configuration if a path was given, otherwise use defaults
pub fn load_optional(path: Option<&Path>) -> Result<ToolConfig> {
    match path {
        Some(path) => load_config(path),
        None => Ok(ToolConfig::default()),
    }
}
