//! Total ordering of scored incidents.
//!
//! Order: `priority_score` descending, then `module` ascending, then
//! `test_id` ascending with an absent id compared as the text `"null"`.
//! Strings compare by code point so the order does not depend on locale.
//! The sort is stable, fully tied incidents keep their input order.

use std::cmp::Ordering;

use crate::score::ScoredIncident;

const NULL_TEST_ID: &str = "null";

/// Comparator used by [`rank`].
pub fn plan_order(a: &ScoredIncident, b: &ScoredIncident) -> Ordering {
    b.priority_score
        .total_cmp(&a.priority_score)
        .then_with(|| a.module.cmp(&b.module))
        .then_with(|| {
            let a_id = a.test_id.as_deref().unwrap_or(NULL_TEST_ID);
            let b_id = b.test_id.as_deref().unwrap_or(NULL_TEST_ID);
            a_id.cmp(b_id)
        })
}

pub fn rank(mut scored: Vec<ScoredIncident>) -> Vec<ScoredIncident> {
    scored.sort_by(plan_order);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(test_id: Option<&str>, module: &str, priority: f64) -> ScoredIncident {
        ScoredIncident {
            test_id: test_id.map(String::from),
            module: module.to_string(),
            environment: String::new(),
            failure_type: String::new(),
            impacted_layers: Vec::new(),
            base_minutes: 0,
            final_minutes: 0,
            priority_score: priority,
        }
    }

    fn ids(plan: &[ScoredIncident]) -> Vec<String> {
        plan.iter()
            .map(|s| s.test_id.clone().unwrap_or_else(|| "-".into()))
            .collect()
    }

    #[test]
    fn test_priority_descending() {
        let plan = rank(vec![
            scored(Some("low"), "m", 0.5),
            scored(Some("high"), "m", 5.0),
            scored(Some("mid"), "m", 1.0),
        ]);
        assert_eq!(ids(&plan), vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_module_breaks_priority_ties() {
        let plan = rank(vec![
            scored(Some("1"), "search", 2.0),
            scored(Some("2"), "checkout", 2.0),
            scored(Some("3"), "Zeta", 2.0),
        ]);
        let modules: Vec<_> = plan.iter().map(|s| s.module.as_str()).collect();
        assert_eq!(modules, vec!["Zeta", "checkout", "search"]);
    }

    #[test]
    fn test_test_id_compares_as_text() {
        let plan = rank(vec![
            scored(Some("T2"), "checkout", 1.0),
            scored(Some("T10"), "checkout", 1.0),
        ]);
        assert_eq!(ids(&plan), vec!["T10", "T2"]);
    }

    #[test]
    fn test_absent_test_id_sorts_as_null_text() {
        let plan = rank(vec![
            scored(Some("zz"), "m", 1.0),
            scored(None, "m", 1.0),
            scored(Some("aa"), "m", 1.0),
        ]);
        assert_eq!(ids(&plan), vec!["aa", "-", "zz"]);
    }

    #[test]
    fn test_full_ties_keep_input_order() {
        let mut first = scored(Some("same"), "m", 1.0);
        first.environment = "first".into();
        let mut second = scored(Some("same"), "m", 1.0);
        second.environment = "second".into();

        let plan = rank(vec![first, second]);
        assert_eq!(plan[0].environment, "first");
        assert_eq!(plan[1].environment, "second");
    }

    #[test]
    fn test_nothing_dropped() {
        assert!(rank(Vec::new()).is_empty());
        let plan = rank(vec![scored(None, "", 0.0), scored(None, "", 0.0)]);
        assert_eq!(plan.len(), 2);
    }
}
