//! TOML configuration for the reporting and notification collaborators.
//!
//! The scoring core never reads this; `main` loads it once and hands the
//! relevant sections to the reporter at construction time.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub const ENV_CONFIG_PATH: &str = "REMEDIPLAN_CONFIG";
pub const ENV_DASHBOARD_URL: &str = "DASHBOARD_URL";
pub const ENV_JIRA_ISSUE: &str = "JIRA_ISSUE_KEY";
pub const ENV_OUTBOX_DIR: &str = "REMEDIPLAN_OUTBOX";

const LOCAL_CONFIG_FILE: &str = "remediplan.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PlannerConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded planner configuration");
        Ok(config)
    }

    /// Try to load configuration from, in order:
    /// 1. The path specified by the `REMEDIPLAN_CONFIG` environment variable.
    /// 2. `./remediplan.toml` in the working directory.
    /// 3. Fall back to compiled-in defaults.
    pub fn load_or_default() -> Self {
        if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "REMEDIPLAN_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let local = Path::new(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load(local) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %local.display(),
                        error = %e,
                        "local config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Self::default()
    }

    /// Overlay process environment settings onto the loaded file.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty(ENV_DASHBOARD_URL) {
            self.report.dashboard_url = url;
        }
        if let Some(issue) = non_empty(ENV_JIRA_ISSUE) {
            self.notify.jira_issue = Some(issue);
        }
        if let Some(dir) = non_empty(ENV_OUTBOX_DIR) {
            self.notify.outbox_dir = Some(PathBuf::from(dir));
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Link target for module names in summary tables.
    pub dashboard_url: String,
    /// Rows per summary table.
    pub top_n: usize,
    /// Incidents above this many minutes get the near-cap marker.
    pub near_cap_minutes: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            dashboard_url: "http://localhost/dashboard.html".to_string(),
            top_n: 5,
            near_cap_minutes: 45,
        }
    }
}

// ---------------------------------------------------------------------------
// Notify
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Directory that receives one payload file per channel.
    pub outbox_dir: Option<PathBuf>,
    pub slack: bool,
    /// Jira issue key; the Jira channel is enabled when set.
    pub jira_issue: Option<String>,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
