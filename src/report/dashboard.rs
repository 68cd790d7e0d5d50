//! Standalone HTML dashboard with client-side filtering and sorting.

use askama::Template;

use crate::score::ScoredIncident;

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate<'a> {
    total_incidents: usize,
    total_minutes: u64,
    rows: Vec<DashboardRow<'a>>,
}

struct DashboardRow<'a> {
    test_id: &'a str,
    module: &'a str,
    environment: &'a str,
    failure_type: &'a str,
    layers: String,
    base_minutes: u64,
    final_minutes: u64,
    priority: String,
}

impl<'a> From<&'a ScoredIncident> for DashboardRow<'a> {
    fn from(r: &'a ScoredIncident) -> Self {
        Self {
            test_id: r.test_id.as_deref().unwrap_or(""),
            module: &r.module,
            environment: &r.environment,
            failure_type: &r.failure_type,
            layers: r.impacted_layers.join(", "),
            base_minutes: r.base_minutes,
            final_minutes: r.final_minutes,
            priority: format!("{:.3}", r.priority_score),
        }
    }
}

/// Render the plan, one table row per incident in plan order.
pub fn render(plan: &[ScoredIncident]) -> askama::Result<String> {
    DashboardTemplate {
        total_incidents: plan.len(),
        total_minutes: plan.iter().map(|r| r.final_minutes).fold(0, u64::saturating_add),
        rows: plan.iter().map(DashboardRow::from).collect(),
    }
    .render()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incident(id: Option<&str>, module: &str) -> ScoredIncident {
        ScoredIncident {
            test_id: id.map(String::from),
            module: module.into(),
            environment: "prod".into(),
            failure_type: "flaky".into(),
            impacted_layers: vec!["api".into(), "db".into()],
            base_minutes: 30,
            final_minutes: 25,
            priority_score: 5.0,
        }
    }

    #[test]
    fn test_rows_in_plan_order() {
        let html = render(&[incident(Some("T1"), "checkout"), incident(Some("T2"), "search")]).unwrap();
        assert!(html.contains("<td>api, db</td>"));
        assert!(html.contains(r#"<td class="num">5.000</td>"#));
        assert!(html.contains(r#"data-module="checkout""#));
        let first = html.find("<td>T1</td>").unwrap();
        let second = html.find("<td>T2</td>").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_values_are_escaped() {
        let html = render(&[incident(None, "<script>alert(1)</script>")]).unwrap();
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_empty_plan_still_renders() {
        let html = render(&[]).unwrap();
        assert!(html.contains("<tbody>"));
        assert!(html.contains("Incidents: 0"));
    }
}
