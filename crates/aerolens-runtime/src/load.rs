#![forbid(unsafe_code)]

//! Dataset loading: CSV and JSON sources to [`RawRow`]s.
//!
//! The reader is picked by file extension. Everything here stops at raw rows;
//! typing and validation belong to the [`Normalizer`].
//!
//! # Failure Modes
//!
//! | Condition | Error |
//! |-----------|-------|
//! | File missing or unreadable | [`LoadError::Io`] |
//! | Malformed CSV record or JSON line | [`LoadError::Parse`] with the line |
//! | Malformed JSON document | [`LoadError::Json`] |
//! | Unknown extension | [`LoadError::UnsupportedFormat`] |
//!
//! Well-formed input that yields no usable records is not an error; the
//! [`NormalizeReport`](aerolens_core::NormalizeReport) says what was dropped.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use aerolens_core::{NormalizeConfig, Normalized, Normalizer, RawRow};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::csv;

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Error loading a dataset.
#[derive(Debug)]
pub enum LoadError {
    /// I/O error while reading.
    Io(std::io::Error),
    /// A record could not be parsed.
    Parse { line: usize, message: String },
    /// The JSON document is malformed or not an array of objects.
    Json(serde_json::Error),
    /// No reader for this file type.
    UnsupportedFormat(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io(e) => write!(f, "I/O error: {e}"),
            LoadError::Parse { line, message } => write!(f, "parse error on line {line}: {message}"),
            LoadError::Json(e) => write!(f, "JSON error: {e}"),
            LoadError::UnsupportedFormat(what) => write!(f, "unsupported dataset format: {what}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io(e) => Some(e),
            LoadError::Json(e) => Some(e),
            LoadError::Parse { .. } | LoadError::UnsupportedFormat(_) => None,
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        LoadError::Io(e)
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(e: serde_json::Error) -> Self {
        LoadError::Json(e)
    }
}

impl From<csv::CsvError> for LoadError {
    fn from(e: csv::CsvError) -> Self {
        LoadError::Parse {
            line: e.line,
            message: e.message,
        }
    }
}

/// Result type for loading.
pub type LoadResult<T> = Result<T, LoadError>;

// ─────────────────────────────────────────────────────────────────────────────
// Format detection
// ─────────────────────────────────────────────────────────────────────────────

/// Supported source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    /// A single JSON array of flat objects.
    Json,
    /// One JSON object per line.
    JsonLines,
}

impl Format {
    /// Pick a format from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> LoadResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("csv") => Ok(Format::Csv),
            Some("json") => Ok(Format::Json),
            Some("jsonl" | "ndjson") => Ok(Format::JsonLines),
            Some(other) => Err(LoadError::UnsupportedFormat(format!(".{other}"))),
            None => Err(LoadError::UnsupportedFormat(format!(
                "{} (no extension)",
                path.display()
            ))),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Readers
// ─────────────────────────────────────────────────────────────────────────────

/// Read raw rows from `path`, choosing the reader by extension.
pub fn load_path(path: impl AsRef<Path>) -> LoadResult<Vec<RawRow>> {
    let path = path.as_ref();
    let format = Format::from_path(path)?;
    let reader = BufReader::new(File::open(path)?);
    let rows = match format {
        Format::Csv => read_csv(reader)?,
        Format::Json => read_json(reader)?,
        Format::JsonLines => read_json_lines(reader)?,
    };
    info!(path = %path.display(), ?format, rows = rows.len(), "dataset read");
    Ok(rows)
}

/// Read rows and normalize them in one step.
pub fn load_dataset(path: impl AsRef<Path>, config: NormalizeConfig) -> LoadResult<Normalized> {
    let rows = load_path(path)?;
    Ok(Normalizer::with_config(config).normalize_with_report(&rows))
}

/// CSV with a header line.
pub fn read_csv<R: BufRead>(mut reader: R) -> LoadResult<Vec<RawRow>> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    let table = csv::parse(&text)?;
    debug!(columns = table.header.len(), records = table.records.len(), "csv parsed");
    Ok(table
        .records
        .iter()
        .map(|record| RawRow::from_pairs(table.pairs(record)))
        .collect())
}

/// A JSON array of flat objects.
pub fn read_json<R: BufRead>(reader: R) -> LoadResult<Vec<RawRow>> {
    let value: Value = serde_json::from_reader(reader)?;
    let Value::Array(items) = value else {
        return Err(shape_error("expected a top-level array of objects"));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| match item {
            Value::Object(map) => Ok(row_from_object(map)),
            other => Err(shape_error(&format!(
                "element {idx}: expected an object, found {}",
                kind(&other)
            ))),
        })
        .collect()
}

/// One JSON object per line; blank lines are skipped.
pub fn read_json_lines<R: BufRead>(reader: R) -> LoadResult<Vec<RawRow>> {
    let mut rows = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(&line) {
            Ok(Value::Object(map)) => rows.push(row_from_object(map)),
            Ok(other) => {
                return Err(LoadError::Parse {
                    line: line_no,
                    message: format!("expected an object, found {}", kind(&other)),
                });
            }
            Err(e) => {
                return Err(LoadError::Parse {
                    line: line_no,
                    message: e.to_string(),
                });
            }
        }
    }
    Ok(rows)
}

fn row_from_object(map: Map<String, Value>) -> RawRow {
    let mut row = RawRow::new();
    for (key, value) in map {
        match value {
            Value::Null => {}
            Value::String(s) => row.insert(key, s),
            other => row.insert(key, other.to_string()),
        }
    }
    row
}

fn shape_error(message: &str) -> LoadError {
    LoadError::Json(<serde_json::Error as serde::de::Error>::custom(message))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
