//! End-to-end tests of the planning pipeline through the public library API.

use remediplan::export::{self, PlanFormat};
use remediplan::rank::plan_order;
use remediplan::{build_plan, Policy};
use serde_json::json;
use std::cmp::Ordering;

fn scenario_policy() -> Policy {
    Policy::from_value(&json!({
        "multipliers": {
            "by_environment": { "prod": 2.0 },
            "by_failure_type": { "flaky": 0.5 }
        },
        "minutes_per_impacted_layer": { "api": 10, "db": 20 },
        "module_priority_score": { "checkout": 5 },
        "caps": { "per_incident_minutes_max": 25 }
    }))
    .unwrap()
}

fn mixed_batch() -> Vec<String> {
    vec![
        r#"{"test_id":"T2","module":"checkout","environment":"qa","failure_type":"timeout","impacted_layers":"api"}"#,
        r#"{"test_id":"T1","module":"checkout","environment":"prod","failure_type":"flaky","impacted_layers":["api","db"]}"#,
        "garbage line",
        r#"{"test_id":"T3","module":"search","environment":"staging","failure_type":"flaky","impacted_layers":["api"]}"#,
        "",
        r#"{"module":"search","environment":"prod","impacted_layers":["db","db"]}"#,
        r#"{"test_id":"T10","module":"checkout","environment":"qa","failure_type":"timeout"}"#,
        r#"{"test_id":"T9""#,
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[test]
fn test_capped_scenario() {
    let plan = build_plan(
        [r#"{"test_id":"T1","module":"checkout","environment":"prod","failure_type":"flaky","impacted_layers":["api","db"]}"#],
        &scenario_policy(),
    );
    let r = &plan.incidents[0];
    assert_eq!(r.base_minutes, 30);
    assert_eq!(r.final_minutes, 25);
    assert_eq!(r.priority_score, 5.0);
}

#[test]
fn test_unknown_environment_scenario() {
    let plan = build_plan(
        [r#"{"test_id":"T3","module":"search","environment":"staging","failure_type":"flaky","impacted_layers":["api"]}"#],
        &scenario_policy(),
    );
    let r = &plan.incidents[0];
    assert_eq!(r.base_minutes, 10);
    assert_eq!(r.final_minutes, 5);
    assert_eq!(r.priority_score, 0.5);
}

#[test]
fn test_text_order_of_test_ids() {
    let plan = build_plan(
        [
            r#"{"test_id":"T2","module":"checkout"}"#,
            r#"{"test_id":"T10","module":"checkout"}"#,
        ],
        &scenario_policy(),
    );
    let ids: Vec<_> = plan.incidents.iter().map(|r| r.test_id.as_deref().unwrap()).collect();
    assert_eq!(ids, vec!["T10", "T2"]);
}

#[test]
fn test_malformed_lines_are_counted_not_fatal() {
    let plan = build_plan(mixed_batch(), &scenario_policy());
    assert_eq!(plan.len(), 5);
    assert_eq!(plan.skipped.len(), 2);
    let lines: Vec<_> = plan.skipped.iter().map(|e| e.line()).collect();
    assert_eq!(lines, vec![3, 8]);
}

#[test]
fn test_plan_is_sorted_and_capped() {
    let policy = scenario_policy();
    let plan = build_plan(mixed_batch(), &policy);

    for pair in plan.incidents.windows(2) {
        assert_ne!(plan_order(&pair[0], &pair[1]), Ordering::Greater);
    }
    assert!(plan
        .incidents
        .iter()
        .all(|r| r.final_minutes <= policy.cap_minutes()));

    let order: Vec<_> = plan
        .incidents
        .iter()
        .map(|r| r.test_id.clone().unwrap_or_else(|| "null".into()))
        .collect();
    // checkout at 5.0 three times (ids as text), search/prod 2.0 with no id, search/staging 0.5
    assert_eq!(order, vec!["T1", "T10", "T2", "null", "T3"]);
}

#[test]
fn test_output_is_deterministic() {
    let policy = scenario_policy();
    let first = build_plan(mixed_batch(), &policy);
    let second = build_plan(mixed_batch(), &policy);

    for format in [PlanFormat::Json, PlanFormat::Csv] {
        assert_eq!(
            export::render(&first.incidents, format).unwrap(),
            export::render(&second.incidents, format).unwrap()
        );
    }
}

#[test]
fn test_input_order_does_not_change_plan() {
    let policy = scenario_policy();
    let forward = build_plan(mixed_batch(), &policy);
    let mut reversed_lines = mixed_batch();
    reversed_lines.reverse();
    let reversed = build_plan(reversed_lines, &policy);
    assert_eq!(forward.incidents, reversed.incidents);
}

#[test]
fn test_empty_batch_yields_empty_plan() {
    let plan = build_plan(Vec::<String>::new(), &scenario_policy());
    assert!(plan.is_empty());
    assert_eq!(plan.total_minutes(), 0);
    assert_eq!(export::render(&plan.incidents, PlanFormat::Json).unwrap(), "[]");

    let only_bad = build_plan(["{", "nope"], &scenario_policy());
    assert!(only_bad.is_empty());
    assert_eq!(only_bad.skipped.len(), 2);
}

#[test]
fn test_partial_policy_never_blocks() {
    let policy = Policy::from_value(&json!({ "module_priority_score": { "checkout": 3 } })).unwrap();
    let plan = build_plan(
        [r#"{"test_id":"T1","module":"checkout","environment":"prod","impacted_layers":["api"]}"#],
        &policy,
    );
    let r = &plan.incidents[0];
    assert_eq!(r.base_minutes, 0);
    assert_eq!(r.final_minutes, 0);
    assert_eq!(r.priority_score, 3.0);
}
