//! Structured plan extraction and the plan task end to end.

mod init_logging;

use coach::plan::{extract, PLAN_FUNCTION_NAME};
use coach::prompts::default_from_embedded;
use coach::{propose_plan, CoachError, ExtractError, MockGateway, PlanExtraction, PlanRequest};
use serde_json::json;

#[test]
fn summary_only_output_has_no_plan_keys() {
    let out = extract(r#"{"summary":"hi"}"#).unwrap();
    assert_eq!(serde_json::to_value(&out).unwrap(), json!({"summary": "hi"}));
}

#[test]
fn four_ideas_round_trip() {
    let args = json!({
        "summary": "s",
        "goal": "Build an emergency fund",
        "steps": [{
            "number": 1,
            "action": {
                "name": "A",
                "description": "D",
                "ideas": {
                    "mostObvious": "x",
                    "leastObvious": "y",
                    "inventiveOrImaginative": "z",
                    "rewardingOrSustainable": "w"
                }
            }
        }]
    });
    let out = extract(&args.to_string()).unwrap();
    let back = serde_json::to_value(&out).unwrap();
    assert_eq!(back["steps"][0]["action"]["ideas"], args["steps"][0]["action"]["ideas"]);
    assert_eq!(back["goal"], "Build an emergency fund");
    assert!(back["steps"][0]["action"].get("rawLinks").is_none());
}

#[test]
fn partial_ideas_are_reported_not_defaulted() {
    let args = json!({
        "summary": "s",
        "goal": "g",
        "steps": [{"number": 1, "action": {"name": "A", "description": "D", "ideas": {"mostObvious": "x"}}}]
    });
    match extract(&args.to_string()).unwrap_err() {
        ExtractError::Malformed { path, .. } => {
            assert_eq!(path, "steps[0].action.ideas.leastObvious")
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn plan_task_returns_extracted_plan() {
    let args = json!({
        "summary": "Let's start with a budget.",
        "goal": "Save $5,000",
        "steps": [
            {"number": 1, "action": {"name": "Budget", "description": "Track every expense", "rawLinks": ["https://example.org/budget"]}},
            {"number": 2, "action": {"name": "Automate", "description": "Schedule transfers"}}
        ]
    });
    let gw = MockGateway::with_function_call("", PLAN_FUNCTION_NAME, args.to_string());
    let out = propose_plan(
        &gw,
        &default_from_embedded(),
        &PlanRequest {
            current_plan: None,
            message: "I want to save $5,000 this year".to_string(),
        },
    )
    .await
    .unwrap();

    let plan = out.plan().unwrap();
    assert_eq!(plan.goal, "Save $5,000");
    assert_eq!(plan.steps.len(), 2);
    assert_eq!(
        plan.steps[0].action.raw_links.as_deref(),
        Some(&["https://example.org/budget".to_string()][..])
    );
    assert_eq!(out.summary, "Let's start with a budget.");
}

#[tokio::test]
async fn plan_task_text_reply_is_summary_only() {
    let gw = MockGateway::with_texts(["What is your monthly income?"]);
    let out = propose_plan(&gw, &default_from_embedded(), &PlanRequest::default())
        .await
        .unwrap();
    assert_eq!(out, PlanExtraction::summary_only("What is your monthly income?"));
}

#[tokio::test]
async fn plan_task_surfaces_malformed_output() {
    let gw = MockGateway::with_function_call("", PLAN_FUNCTION_NAME, r#"{"goal":"g"}"#);
    let err = propose_plan(&gw, &default_from_embedded(), &PlanRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CoachError::MalformedStructuredOutput(ExtractError::Malformed { .. })
    ));
}
