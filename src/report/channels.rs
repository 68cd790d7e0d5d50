//! Notification channels.
//!
//! Each channel turns a [`PlanSummary`] into the payload its target service
//! expects and drops it into an outbox directory as `<channel>.json`. Posting
//! the payload is left to whatever picks up the outbox.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::{jira_comment, slack_message, PlanSummary};
use crate::config::{PlannerConfig, ReportConfig};

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel not configured: {0}")]
    NotConfigured(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub trait NotifyChannel {
    fn name(&self) -> &'static str;

    fn enabled(&self) -> bool;

    /// Service-specific payload for `summary`.
    fn payload(&self, summary: &PlanSummary<'_>) -> Value;

    fn deliver(&self, summary: &PlanSummary<'_>) -> Result<(), ChannelError>;
}

// ---------------------------------------------------------------------------
// Slack
// ---------------------------------------------------------------------------

/// Slack incoming-webhook message (`{"text": ...}`).
pub struct SlackChannel {
    report: ReportConfig,
    outbox: Option<PathBuf>,
    enabled: bool,
}

impl SlackChannel {
    pub fn new(report: ReportConfig, outbox: Option<PathBuf>, enabled: bool) -> Self {
        Self {
            report,
            outbox,
            enabled,
        }
    }
}

impl NotifyChannel for SlackChannel {
    fn name(&self) -> &'static str {
        "slack"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn payload(&self, summary: &PlanSummary<'_>) -> Value {
        json!({ "text": slack_message(summary, &self.report) })
    }

    fn deliver(&self, summary: &PlanSummary<'_>) -> Result<(), ChannelError> {
        write_outbox(self.outbox.as_deref(), self.name(), &self.payload(summary))
    }
}

// ---------------------------------------------------------------------------
// Jira
// ---------------------------------------------------------------------------

/// Jira issue comment (`{"issue": ..., "body": ...}`).
pub struct JiraChannel {
    report: ReportConfig,
    outbox: Option<PathBuf>,
    issue: Option<String>,
}

impl JiraChannel {
    pub fn new(report: ReportConfig, outbox: Option<PathBuf>, issue: Option<String>) -> Self {
        Self {
            report,
            outbox,
            issue,
        }
    }
}

impl NotifyChannel for JiraChannel {
    fn name(&self) -> &'static str {
        "jira"
    }

    fn enabled(&self) -> bool {
        self.issue.is_some()
    }

    fn payload(&self, summary: &PlanSummary<'_>) -> Value {
        json!({
            "issue": self.issue,
            "body": jira_comment(summary, &self.report),
        })
    }

    fn deliver(&self, summary: &PlanSummary<'_>) -> Result<(), ChannelError> {
        if self.issue.is_none() {
            return Err(ChannelError::NotConfigured("jira issue key".into()));
        }
        write_outbox(self.outbox.as_deref(), self.name(), &self.payload(summary))
    }
}

fn write_outbox(dir: Option<&Path>, name: &str, payload: &Value) -> Result<(), ChannelError> {
    let dir = dir.ok_or_else(|| ChannelError::NotConfigured("outbox directory".into()))?;
    std::fs::create_dir_all(dir).map_err(|source| ChannelError::Write {
        path: dir.to_path_buf(),
        source,
    })?;

    let path = dir.join(format!("{name}.json"));
    let body = serde_json::to_string_pretty(payload)?;
    std::fs::write(&path, body).map_err(|source| ChannelError::Write {
        path: path.clone(),
        source,
    })?;
    debug!(channel = name, path = %path.display(), "notification written to outbox");
    Ok(())
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Dispatches a summary to every enabled channel. A failing channel is
/// logged and reported back, it never aborts the others.
pub struct Notifier {
    channels: Vec<Box<dyn NotifyChannel>>,
}

impl Notifier {
    pub fn from_config(config: &PlannerConfig) -> Self {
        let outbox = config.notify.outbox_dir.clone();
        let channels: Vec<Box<dyn NotifyChannel>> = vec![
            Box::new(SlackChannel::new(
                config.report.clone(),
                outbox.clone(),
                config.notify.slack,
            )),
            Box::new(JiraChannel::new(
                config.report.clone(),
                outbox,
                config.notify.jira_issue.clone(),
            )),
        ];
        let notifier = Self::with_channels(channels);

        if notifier.channel_count() == 0 {
            warn!("no notification channels enabled");
        } else {
            info!(channel_count = notifier.channel_count(), "notification channels ready");
        }
        notifier
    }

    pub fn with_channels(channels: Vec<Box<dyn NotifyChannel>>) -> Self {
        Self { channels }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.iter().filter(|c| c.enabled()).count()
    }

    pub fn notify(&self, summary: &PlanSummary<'_>) -> Vec<(&'static str, Result<(), ChannelError>)> {
        let mut results = Vec::new();
        for channel in self.channels.iter().filter(|c| c.enabled()) {
            let name = channel.name();
            let result = channel.deliver(summary);
            match &result {
                Ok(()) => info!(channel = name, "notification delivered"),
                Err(e) => error!(channel = name, error = %e, "failed to deliver notification"),
            }
            results.push((name, result));
        }
        results
    }
}
