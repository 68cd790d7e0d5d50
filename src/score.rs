//! Scoring engine: applies a [`Policy`] to an [`Incident`].

use serde::{Deserialize, Serialize};

use crate::ingest::Incident;
use crate::policy::Policy;

/// An incident with its derived time estimate and priority.
///
/// Field names are part of the exported plan format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredIncident {
    pub test_id: Option<String>,
    pub module: String,
    pub environment: String,
    pub failure_type: String,
    pub impacted_layers: Vec<String>,
    /// Sum of per-layer minutes, before multipliers.
    pub base_minutes: u64,
    /// `ceil(min(cap, base * env * failure_type))`, never negative.
    pub final_minutes: u64,
    /// `module_priority * env * failure_type`, rounded to 3 decimals.
    pub priority_score: f64,
}

/// Score one incident. Pure; the result depends only on the arguments.
pub fn score(incident: &Incident, policy: &Policy) -> ScoredIncident {
    let env_mult = policy.environment_multiplier(&incident.environment);
    let ft_mult = policy.failure_type_multiplier(&incident.failure_type);
    let priority = policy.module_priority(&incident.module);

    let base_minutes: u64 = incident
        .impacted_layers
        .iter()
        .map(|layer| policy.layer_minutes(layer))
        .fold(0, u64::saturating_add);

    let raw = base_minutes as f64 * env_mult * ft_mult;
    let capped = (policy.cap_minutes() as f64).min(raw).ceil();
    // Negative multipliers are accepted, the estimate bottoms out at zero.
    let final_minutes = if capped > 0.0 { capped as u64 } else { 0 };

    ScoredIncident {
        test_id: incident.test_id.clone(),
        module: incident.module.clone(),
        environment: incident.environment.clone(),
        failure_type: incident.failure_type.clone(),
        impacted_layers: incident.impacted_layers.clone(),
        base_minutes,
        final_minutes,
        priority_score: round3(priority * env_mult * ft_mult),
    }
}

pub fn score_all(incidents: &[Incident], policy: &Policy) -> Vec<ScoredIncident> {
    incidents.iter().map(|i| score(i, policy)).collect()
}

fn round3(x: f64) -> f64 {
    // Adding 0.0 folds -0.0 into 0.0 so ordering never sees a signed zero.
    (x * 1000.0).round() / 1000.0 + 0.0
}
