//! Human-facing renderings of a finished plan: summary tables, chat and
//! ticket messages, the HTML dashboard and notification delivery.
//!
//! Everything here consumes the ranked plan read-only.

pub mod channels;
pub mod dashboard;

use std::fmt::Write as _;

use crate::config::ReportConfig;
use crate::score::ScoredIncident;

const TABLE_HEADER: &str = "#  Module                          Env      Mins   Priority";

/// Aggregate view over a ranked plan.
#[derive(Debug, Clone)]
pub struct PlanSummary<'a> {
    pub incidents: usize,
    pub total_minutes: u64,
    /// First `top_n` entries in plan order.
    pub top_by_priority: Vec<&'a ScoredIncident>,
    /// Longest estimates first, priority breaking ties.
    pub top_by_minutes: Vec<&'a ScoredIncident>,
}

impl<'a> PlanSummary<'a> {
    pub fn from_plan(plan: &'a [ScoredIncident], top_n: usize) -> Self {
        let top_by_priority = plan.iter().take(top_n).collect();

        let mut by_minutes: Vec<&ScoredIncident> = plan.iter().collect();
        by_minutes.sort_by(|a, b| {
            b.final_minutes
                .cmp(&a.final_minutes)
                .then_with(|| b.priority_score.total_cmp(&a.priority_score))
        });
        by_minutes.truncate(top_n);

        Self {
            incidents: plan.len(),
            total_minutes: plan.iter().map(|r| r.final_minutes).fold(0, u64::saturating_add),
            top_by_priority,
            top_by_minutes: by_minutes,
        }
    }
}

/// One fixed-width summary row, e.g.
/// ` 1. ⚠️ <url|checkout>                 prod       50m   5.00`.
pub fn format_row(rank: usize, incident: &ScoredIncident, cfg: &ReportConfig) -> String {
    let marker = if incident.final_minutes > cfg.near_cap_minutes {
        "⚠️ "
    } else {
        "   "
    };
    let link = format!("<{}|{}>", cfg.dashboard_url, incident.module);
    format!(
        "{:>2}. {}{:<30} {:<8} {:>4}m   {:.2}",
        rank, marker, link, incident.environment, incident.final_minutes, incident.priority_score
    )
}

fn table(rows: &[&ScoredIncident], cfg: &ReportConfig) -> String {
    let mut out = String::from(TABLE_HEADER);
    for (i, r) in rows.iter().enumerate() {
        out.push('\n');
        out.push_str(&format_row(i + 1, r, cfg));
    }
    out
}

fn near_cap_note(cfg: &ReportConfig) -> String {
    format!(
        "_⚠️ indicates incidents with final_minutes > {} (near the max cap)_",
        cfg.near_cap_minutes
    )
}

/// Slack mrkdwn message with both top-N tables in code fences.
pub fn slack_message(summary: &PlanSummary<'_>, cfg: &ReportConfig) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "✅ *Deterministic Test Plan generated*");
    let _ = writeln!(text, "• Incidents: {}", summary.incidents);
    let _ = writeln!(text, "• Total minutes: {}", summary.total_minutes);
    let _ = writeln!(text);
    let _ = writeln!(text, "*Top {} by priority:*", cfg.top_n);
    let _ = writeln!(text, "```{}", table(&summary.top_by_priority, cfg));
    let _ = writeln!(text, "```");
    let _ = writeln!(text);
    let _ = writeln!(text, "*Top {} by final minutes:*", cfg.top_n);
    let _ = writeln!(text, "```{}", table(&summary.top_by_minutes, cfg));
    let _ = writeln!(text, "```");
    text.push_str(&near_cap_note(cfg));
    text
}

/// Jira wiki-markup comment body.
pub fn jira_comment(summary: &PlanSummary<'_>, cfg: &ReportConfig) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "✅ *Deterministic Test Plan generated*");
    let _ = writeln!(
        text,
        "*Incidents:* {} • *Total minutes:* {}",
        summary.incidents, summary.total_minutes
    );
    let _ = writeln!(text);
    let _ = writeln!(text, "*Top {} by priority:*", cfg.top_n);
    let _ = writeln!(text, "{{code}}\n{}\n{{code}}", table(&summary.top_by_priority, cfg));
    let _ = writeln!(text);
    let _ = writeln!(text, "*Top {} by final minutes:*", cfg.top_n);
    let _ = writeln!(text, "{{code}}\n{}\n{{code}}", table(&summary.top_by_minutes, cfg));
    text.push_str(&near_cap_note(cfg));
    text
}
