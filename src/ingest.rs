//! Failure-record ingestion.
//!
//! Each input line is one candidate JSON record. Lines are decoded
//! independently; a bad line yields a [`RecordDecodeError`] and is skipped,
//! it never aborts the batch.

use std::io::BufRead;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::policy::kind_of;

/// Untyped mapping decoded from one input line.
pub type RawRecord = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordDecodeError {
    #[error("line {line}: invalid JSON record: {message}")]
    Malformed { line: usize, message: String },

    #[error("line {line}: record must be a mapping, found {found}")]
    NotAMapping { line: usize, found: &'static str },
}

impl RecordDecodeError {
    /// 1-based physical line number of the rejected record.
    pub fn line(&self) -> usize {
        match self {
            Self::Malformed { line, .. } | Self::NotAMapping { line, .. } => *line,
        }
    }
}

/// A normalized failure record, ready for scoring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    pub test_id: Option<String>,
    pub module: String,
    pub environment: String,
    pub failure_type: String,
    pub impacted_layers: Vec<String>,
}

impl Incident {
    pub fn from_raw(raw: &RawRecord) -> Self {
        Self {
            test_id: raw.get("test_id").and_then(scalar_text),
            module: trimmed_field(raw, "module"),
            environment: trimmed_field(raw, "environment"),
            failure_type: trimmed_field(raw, "failure_type"),
            impacted_layers: normalize_layers(raw.get("impacted_layers")),
        }
    }
}

/// Outcome of ingesting a batch: the incidents in input order plus one
/// error per skipped line.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub incidents: Vec<Incident>,
    pub skipped: Vec<RecordDecodeError>,
}

/// Ingest a batch of raw lines. Blank lines are ignored without a warning.
pub fn ingest<I, S>(lines: I) -> IngestReport
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut report = IngestReport::default();

    for (idx, line) in lines.into_iter().enumerate() {
        let line_no = idx + 1;
        let line = line.as_ref();
        if line.trim().is_empty() {
            continue;
        }

        match decode_line(line_no, line) {
            Ok(raw) => report.incidents.push(Incident::from_raw(&raw)),
            Err(e) => {
                warn!(line = line_no, error = %e, "skipping malformed failure record");
                report.skipped.push(e);
            }
        }
    }

    debug!(
        incidents = report.incidents.len(),
        skipped = report.skipped.len(),
        "ingested failure records"
    );
    report
}

/// Ingest every line of `reader`. I/O errors are fatal; decode errors are not.
pub fn ingest_reader<R: BufRead>(reader: R) -> std::io::Result<IngestReport> {
    let lines = reader.lines().collect::<std::io::Result<Vec<_>>>()?;
    Ok(ingest(lines))
}

/// Decode one line, applying the bare `key: value` fallback once.
pub fn decode_line(line_no: usize, line: &str) -> Result<RawRecord, RecordDecodeError> {
    let first = match serde_json::from_str::<Value>(line) {
        Ok(value) => return into_mapping(line_no, value),
        Err(e) => e,
    };

    let trimmed = line.trim();
    if !trimmed.starts_with('{') && trimmed.contains(':') {
        let wrapped = format!("{{{}}}", trimmed.trim_end_matches(','));
        match serde_json::from_str::<Value>(&wrapped) {
            Ok(value) => {
                debug!(line = line_no, "recovered record by wrapping in braces");
                return into_mapping(line_no, value);
            }
            Err(e) => {
                return Err(RecordDecodeError::Malformed {
                    line: line_no,
                    message: e.to_string(),
                })
            }
        }
    }

    Err(RecordDecodeError::Malformed {
        line: line_no,
        message: first.to_string(),
    })
}

fn into_mapping(line_no: usize, value: Value) -> Result<RawRecord, RecordDecodeError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(RecordDecodeError::NotAMapping {
            line: line_no,
            found: kind_of(&other),
        }),
    }
}

fn trimmed_field(raw: &RawRecord, key: &str) -> String {
    match raw.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => {
            debug!(field = key, found = kind_of(other), "non-string field treated as empty");
            String::new()
        }
    }
}

fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Layers arrive either as a sequence or as one comma-separated string.
fn normalize_layers(v: Option<&Value>) -> Vec<String> {
    match v {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_text).collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}
