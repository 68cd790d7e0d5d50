//! remediplan -- deterministic remediation planning for test-failure batches.
//!
//! The core is a pure pipeline: raw JSON lines are ingested into
//! [`Incident`]s, scored against a [`Policy`], and totally ordered into a
//! plan. Exporters and reporters consume the plan read-only.

pub mod config;
pub mod export;
pub mod ingest;
pub mod policy;
pub mod rank;
pub mod report;
pub mod score;

pub use ingest::{Incident, RecordDecodeError};
pub use policy::{Policy, PolicyError};
pub use score::ScoredIncident;

use tracing::info;

/// A ranked remediation plan plus the lines that could not be ingested.
#[derive(Debug, Default)]
pub struct Plan {
    pub incidents: Vec<ScoredIncident>,
    pub skipped: Vec<RecordDecodeError>,
}

impl Plan {
    pub fn len(&self) -> usize {
        self.incidents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty()
    }

    pub fn total_minutes(&self) -> u64 {
        self.incidents.iter().map(|r| r.final_minutes).fold(0, u64::saturating_add)
    }

    /// Score and rank an already-ingested batch.
    pub fn from_ingested(ingested: ingest::IngestReport, policy: &Policy) -> Self {
        let scored = score::score_all(&ingested.incidents, policy);
        let plan = Self {
            incidents: rank::rank(scored),
            skipped: ingested.skipped,
        };
        info!(
            incidents = plan.len(),
            skipped = plan.skipped.len(),
            total_minutes = plan.total_minutes(),
            "built remediation plan"
        );
        plan
    }
}

/// `rank(score_all(ingest(lines), policy))`, keeping the skipped lines.
pub fn build_plan<I, S>(lines: I, policy: &Policy) -> Plan
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Plan::from_ingested(ingest::ingest(lines), policy)
}
