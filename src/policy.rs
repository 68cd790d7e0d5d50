//! Weighting policy: environment and failure-type multipliers, per-layer
//! minute costs, module priorities and the per-incident minute cap.
//!
//! A partial policy never blocks a batch. Only a document whose root is not
//! a mapping is rejected; every missing section falls back to an empty map
//! (or the default cap) with a warning.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

/// Cap applied when `caps.per_incident_minutes_max` is absent or unusable.
pub const DEFAULT_CAP_MINUTES: u64 = 60;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to read policy file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse policy file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("policy document must be a mapping, found {found}")]
    NotAMapping { found: &'static str },
}

/// Immutable, fully-resolved weighting policy. Every lookup is total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Policy {
    environment_multiplier: BTreeMap<String, f64>,
    failure_type_multiplier: BTreeMap<String, f64>,
    layer_minutes: BTreeMap<String, u64>,
    module_priority: BTreeMap<String, f64>,
    cap_minutes: u64,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            environment_multiplier: BTreeMap::new(),
            failure_type_multiplier: BTreeMap::new(),
            layer_minutes: BTreeMap::new(),
            module_priority: BTreeMap::new(),
            cap_minutes: DEFAULT_CAP_MINUTES,
        }
    }
}

impl Policy {
    pub fn builder() -> PolicyBuilder {
        PolicyBuilder::default()
    }

    /// Load a policy file. The format follows the extension: `.yaml`/`.yml`
    /// and `.toml` are recognised, anything else is read as JSON.
    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let content = std::fs::read_to_string(path).map_err(|source| PolicyError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let parse_err = |message: String| PolicyError::Parse {
            path: path.to_path_buf(),
            message,
        };

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let doc: Value = match ext.as_deref() {
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&content).map_err(|e| parse_err(e.to_string()))?
            }
            Some("toml") => toml::from_str(&content).map_err(|e| parse_err(e.to_string()))?,
            _ => serde_json::from_str(&content).map_err(|e| parse_err(e.to_string()))?,
        };

        let policy = Self::from_value(&doc)?;
        info!(
            path = %path.display(),
            environments = policy.environment_multiplier.len(),
            failure_types = policy.failure_type_multiplier.len(),
            layers = policy.layer_minutes.len(),
            modules = policy.module_priority.len(),
            cap_minutes = policy.cap_minutes,
            "loaded policy"
        );
        Ok(policy)
    }

    /// Resolve a policy from an already-parsed structured document.
    pub fn from_value(doc: &Value) -> Result<Self, PolicyError> {
        let root = doc.as_object().ok_or(PolicyError::NotAMapping {
            found: kind_of(doc),
        })?;

        let multipliers = root.get("multipliers");
        let section = |parent: Option<&Value>, key: &str| parent.and_then(|p| p.get(key)).cloned();

        let environment_multiplier = rational_map(
            "multipliers.by_environment",
            section(multipliers, "by_environment").as_ref(),
        );
        let failure_type_multiplier = rational_map(
            "multipliers.by_failure_type",
            section(multipliers, "by_failure_type").as_ref(),
        );
        let layer_minutes = minutes_map(root.get("minutes_per_impacted_layer"));
        let module_priority =
            rational_map("module_priority_score", root.get("module_priority_score"));

        for (name, value) in environment_multiplier
            .iter()
            .chain(failure_type_multiplier.iter())
        {
            if *value <= 0.0 {
                warn!(%name, value, "non-positive multiplier accepted as-is");
            }
        }

        let cap_minutes = match root
            .get("caps")
            .and_then(|c| c.get("per_incident_minutes_max"))
        {
            Some(v) => match positive_ceil(v) {
                Some(n) => n,
                None => {
                    warn!(value = %v, default = DEFAULT_CAP_MINUTES, "unusable per-incident cap, using default");
                    DEFAULT_CAP_MINUTES
                }
            },
            None => {
                warn!(default = DEFAULT_CAP_MINUTES, "policy has no `caps.per_incident_minutes_max`, using default");
                DEFAULT_CAP_MINUTES
            }
        };

        Ok(Self {
            environment_multiplier,
            failure_type_multiplier,
            layer_minutes,
            module_priority,
            cap_minutes,
        })
    }

    pub fn environment_multiplier(&self, environment: &str) -> f64 {
        self.environment_multiplier
            .get(environment)
            .copied()
            .unwrap_or(1.0)
    }

    pub fn failure_type_multiplier(&self, failure_type: &str) -> f64 {
        self.failure_type_multiplier
            .get(failure_type)
            .copied()
            .unwrap_or(1.0)
    }

    pub fn layer_minutes(&self, layer: &str) -> u64 {
        self.layer_minutes.get(layer).copied().unwrap_or(0)
    }

    pub fn module_priority(&self, module: &str) -> f64 {
        self.module_priority.get(module).copied().unwrap_or(1.0)
    }

    pub fn cap_minutes(&self) -> u64 {
        self.cap_minutes
    }
}

/// Programmatic construction, mostly for tests and embedders.
#[derive(Debug, Default)]
pub struct PolicyBuilder {
    policy: Policy,
}

impl PolicyBuilder {
    pub fn environment(mut self, name: &str, multiplier: f64) -> Self {
        self.policy
            .environment_multiplier
            .insert(name.to_string(), multiplier);
        self
    }

    pub fn failure_type(mut self, name: &str, multiplier: f64) -> Self {
        self.policy
            .failure_type_multiplier
            .insert(name.to_string(), multiplier);
        self
    }

    pub fn layer(mut self, name: &str, minutes: u64) -> Self {
        self.policy.layer_minutes.insert(name.to_string(), minutes);
        self
    }

    pub fn module(mut self, name: &str, priority: f64) -> Self {
        self.policy.module_priority.insert(name.to_string(), priority);
        self
    }

    /// Zero is ignored; the cap stays at its previous value.
    pub fn cap_minutes(mut self, cap: u64) -> Self {
        if cap > 0 {
            self.policy.cap_minutes = cap;
        }
        self
    }

    pub fn build(self) -> Policy {
        self.policy
    }
}

fn rational_map(section: &str, value: Option<&Value>) -> BTreeMap<String, f64> {
    let Some(value) = value else {
        warn!(section, "policy section absent, every entry uses its default");
        return BTreeMap::new();
    };
    let Some(entries) = value.as_object() else {
        warn!(section, found = kind_of(value), "policy section is not a mapping, ignoring");
        return BTreeMap::new();
    };

    let mut out = BTreeMap::new();
    for (key, v) in entries {
        match v.as_f64().filter(|f| f.is_finite()) {
            Some(f) => {
                out.insert(key.clone(), f);
            }
            None => warn!(section, key = %key, value = %v, "ignoring non-numeric policy entry"),
        }
    }
    out
}

fn minutes_map(value: Option<&Value>) -> BTreeMap<String, u64> {
    const SECTION: &str = "minutes_per_impacted_layer";
    let Some(value) = value else {
        warn!(section = SECTION, "policy section absent, every layer costs 0 minutes");
        return BTreeMap::new();
    };
    let Some(entries) = value.as_object() else {
        warn!(section = SECTION, found = kind_of(value), "policy section is not a mapping, ignoring");
        return BTreeMap::new();
    };

    let mut out = BTreeMap::new();
    for (key, v) in entries {
        match as_whole(v) {
            Some(n) => {
                out.insert(key.clone(), n);
            }
            None => warn!(
                section = SECTION,
                key = %key,
                value = %v,
                "layer minutes must be a non-negative integer, ignoring"
            ),
        }
    }
    out
}

/// Positive finite number rounded up. Rounding the cap up is exact because
/// `ceil(min(cap, x)) == min(ceil(cap), ceil(x))`.
fn positive_ceil(v: &Value) -> Option<u64> {
    if let Some(n) = v.as_u64() {
        return (n > 0).then_some(n);
    }
    let f = v.as_f64()?;
    if f.is_finite() && f > 0.0 && f <= u64::MAX as f64 {
        Some(f.ceil() as u64)
    } else {
        None
    }
}

/// Non-negative integer, also accepting floats with no fractional part
/// (YAML and JSON writers are inconsistent about `10` vs `10.0`).
fn as_whole(v: &Value) -> Option<u64> {
    if let Some(n) = v.as_u64() {
        return Some(n);
    }
    let f = v.as_f64()?;
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 {
        Some(f as u64)
    } else {
        None
    }
}

pub(crate) fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
