// ABOUTME: SQLite value to CSV field conversion
// ABOUTME: Applies NULL sentinels and blob encoding modes to row values

use anyhow::{Context, Result};
use base64::Engine;
use rusqlite::types::ValueRef;
use serde::Deserialize;
use std::fmt;

/// Marker written for binary values in placeholder mode
pub const BLOB_PLACEHOLDER: &str = "<BLOB>";

/// How binary (BLOB) column values are represented in text output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BlobMode {
    /// Standard base64 with padding
    #[default]
    Base64,
    /// Empty field
    Skip,
    /// The fixed `<BLOB>` marker
    Placeholder,
}

impl BlobMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlobMode::Base64 => "base64",
            BlobMode::Skip => "skip",
            BlobMode::Placeholder => "placeholder",
        }
    }
}

impl fmt::Display for BlobMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convert one SQLite value into the text of a CSV field
///
/// Mapping:
/// - NULL → `null_repr`, or an empty field when none is given
/// - INTEGER → decimal text
/// - REAL → see [`format_real`]
/// - TEXT → unchanged (quoting is the CSV writer's job)
/// - BLOB → per [`BlobMode`]
///
/// # Errors
///
/// Returns an error for TEXT values that are not valid UTF-8. The caller
/// treats this as malformed data and abandons the table.
///
/// # Examples
///
/// ```
/// # use delivery_db_tools::sqlite::converter::{value_to_field, BlobMode};
/// # use rusqlite::types::ValueRef;
/// let field = value_to_field(ValueRef::Null, Some("\\N"), BlobMode::Base64).unwrap();
/// assert_eq!(field, "\\N");
///
/// let field = value_to_field(ValueRef::Blob(&[0, 1, 255]), None, BlobMode::Base64).unwrap();
/// assert_eq!(field, "AAH/");
/// ```
pub fn value_to_field(
    value: ValueRef<'_>,
    null_repr: Option<&str>,
    blob_mode: BlobMode,
) -> Result<String> {
    let field = match value {
        ValueRef::Null => null_repr.unwrap_or_default().to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => format_real(f),
        ValueRef::Text(_) => value
            .as_str()
            .context("Text value is not valid UTF-8")?
            .to_string(),
        ValueRef::Blob(bytes) => encode_blob(bytes, blob_mode),
    };

    Ok(field)
}

/// Represent binary data according to the blob mode
pub fn encode_blob(bytes: &[u8], mode: BlobMode) -> String {
    match mode {
        BlobMode::Base64 => base64::engine::general_purpose::STANDARD.encode(bytes),
        BlobMode::Skip => String::new(),
        BlobMode::Placeholder => BLOB_PLACEHOLDER.to_string(),
    }
}

/// Format a REAL the way a reader of the CSV expects
///
/// Uses the shortest text that round-trips, keeps a trailing `.0` on
/// integral values so `3.0` does not come out looking like an INTEGER, and
/// switches to exponent form for very large or very small magnitudes.
pub fn format_real(value: f64) -> String {
    format!("{:?}", value)
}

/// Render a value for human inspection rather than export
pub fn display_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => format_real(f),
        ValueRef::Text(t) => String::from_utf8_lossy(t).to_string(),
        ValueRef::Blob(b) => format!("<BLOB: {} bytes>", b.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_without_sentinel_is_empty() {
        let field = value_to_field(ValueRef::Null, None, BlobMode::Base64).unwrap();
        assert_eq!(field, "");
    }

    #[test]
    fn test_null_with_sentinel() {
        let field = value_to_field(ValueRef::Null, Some("∅"), BlobMode::Base64).unwrap();
        assert_eq!(field, "∅");
    }

    #[test]
    fn test_integer_and_text_pass_through() {
        assert_eq!(
            value_to_field(ValueRef::Integer(-42), None, BlobMode::Base64).unwrap(),
            "-42"
        );
        assert_eq!(
            value_to_field(ValueRef::Text(b"a, \"quoted\" value"), None, BlobMode::Base64)
                .unwrap(),
            "a, \"quoted\" value"
        );
    }

    #[test]
    fn test_invalid_utf8_text_is_an_error() {
        let result = value_to_field(ValueRef::Text(&[0x66, 0xff]), None, BlobMode::Base64);
        assert!(result.is_err());
    }

    #[test]
    fn test_blob_modes() {
        let bytes: &[u8] = b"\x00\x01\xff";
        assert_eq!(encode_blob(bytes, BlobMode::Base64), "AAH/");
        assert_eq!(encode_blob(bytes, BlobMode::Skip), "");
        assert_eq!(encode_blob(bytes, BlobMode::Placeholder), BLOB_PLACEHOLDER);
    }

    #[test]
    fn test_base64_field_decodes_to_original_bytes() {
        let bytes: &[u8] = b"\x00\x01\xff";
        let field = value_to_field(ValueRef::Blob(bytes), None, BlobMode::Base64).unwrap();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(field)
            .unwrap();
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn test_format_real() {
        assert_eq!(format_real(3.0), "3.0");
        assert_eq!(format_real(-0.5), "-0.5");
        assert_eq!(format_real(12.75), "12.75");
        assert_eq!(format_real(0.1), "0.1");
        assert_eq!(format_real(f64::INFINITY), "inf");
    }

    #[test]
    fn test_format_real_extreme_magnitudes_use_exponent() {
        assert_eq!(format_real(1e300), "1e300");
        assert_eq!(format_real(1e-7), "1e-7");
        assert_eq!(format_real(1e16), "1e16");
        assert_eq!(format_real(123456.0), "123456.0");
        assert_eq!(format_real(1e300).parse::<f64>().unwrap(), 1e300);
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(ValueRef::Null), "NULL");
        assert_eq!(display_value(ValueRef::Blob(&[1, 2, 3])), "<BLOB: 3 bytes>");
        assert_eq!(display_value(ValueRef::Text(b"van")), "van");
    }

    #[test]
    fn test_blob_mode_display_matches_cli_names() {
        assert_eq!(BlobMode::Base64.to_string(), "base64");
        assert_eq!(BlobMode::Skip.to_string(), "skip");
        assert_eq!(BlobMode::Placeholder.to_string(), "placeholder");
        assert_eq!(BlobMode::default(), BlobMode::Base64);
    }
}
