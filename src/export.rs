//! Plan serialization. Exporters write the plan in the order they are given
//! and never re-sort it.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::score::ScoredIncident;

pub const CSV_HEADER: [&str; 8] = [
    "test_id",
    "module",
    "environment",
    "failure_type",
    "impacted_layers",
    "base_minutes",
    "final_minutes",
    "priority_score",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to serialize plan: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanFormat {
    Json,
    Csv,
}

impl PlanFormat {
    /// CSV for a `.csv` extension, JSON for everything else.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::Json,
        }
    }
}

pub fn render(plan: &[ScoredIncident], format: PlanFormat) -> Result<String, ExportError> {
    match format {
        PlanFormat::Json => Ok(serde_json::to_string_pretty(plan)?),
        PlanFormat::Csv => Ok(to_csv(plan)),
    }
}

pub fn write_plan(path: &Path, plan: &[ScoredIncident]) -> Result<PlanFormat, ExportError> {
    let format = PlanFormat::from_path(path);
    let body = render(plan, format)?;
    std::fs::write(path, body).map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), ?format, incidents = plan.len(), "wrote plan");
    Ok(format)
}

fn to_csv(plan: &[ScoredIncident]) -> String {
    let mut out = CSV_HEADER.join(",");
    for r in plan {
        let row = [
            csv_cell(r.test_id.as_deref().unwrap_or("")),
            csv_cell(&r.module),
            csv_cell(&r.environment),
            csv_cell(&r.failure_type),
            csv_cell(&r.impacted_layers.join("; ")),
            r.base_minutes.to_string(),
            r.final_minutes.to_string(),
            r.priority_score.to_string(),
        ];
        out.push('\n');
        out.push_str(&row.join(","));
    }
    out
}

fn csv_cell(value: &str) -> String {
    if value.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<ScoredIncident> {
        vec![
            ScoredIncident {
                test_id: Some("T1".into()),
                module: "checkout".into(),
                environment: "prod".into(),
                failure_type: "flaky".into(),
                impacted_layers: vec!["api".into(), "db".into()],
                base_minutes: 30,
                final_minutes: 25,
                priority_score: 5.0,
            },
            ScoredIncident {
                test_id: None,
                module: "search, v2".into(),
                environment: "staging".into(),
                failure_type: "say \"hi\"".into(),
                impacted_layers: vec![],
                base_minutes: 0,
                final_minutes: 0,
                priority_score: 0.125,
            },
        ]
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(PlanFormat::from_path(Path::new("plan.csv")), PlanFormat::Csv);
        assert_eq!(PlanFormat::from_path(Path::new("plan.CSV")), PlanFormat::Csv);
        assert_eq!(PlanFormat::from_path(Path::new("plan.json")), PlanFormat::Json);
        assert_eq!(PlanFormat::from_path(Path::new("plan")), PlanFormat::Json);
    }

    #[test]
    fn test_json_keeps_field_names_and_null_id() {
        let json = render(&sample(), PlanFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        for key in CSV_HEADER {
            assert!(rows[0].get(key).is_some(), "missing {key}");
        }
        assert!(rows[1]["test_id"].is_null());
        assert_eq!(rows[0]["final_minutes"], 25);
    }

    #[test]
    fn test_csv_layout() {
        let csv = render(&sample(), PlanFormat::Csv).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER.join(","));
        assert_eq!(lines[1], "T1,checkout,prod,flaky,api; db,30,25,5");
        assert_eq!(lines[2], ",\"search, v2\",staging,\"say \"\"hi\"\"\",,0,0,0.125");
    }

    #[test]
    fn test_empty_plan() {
        assert_eq!(render(&[], PlanFormat::Json).unwrap(), "[]");
        assert_eq!(render(&[], PlanFormat::Csv).unwrap(), CSV_HEADER.join(","));
    }

    #[test]
    fn test_write_plan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.csv");
        let format = write_plan(&path, &sample()).unwrap();
        assert_eq!(format, PlanFormat::Csv);
        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.starts_with("test_id,module"));
    }
}
