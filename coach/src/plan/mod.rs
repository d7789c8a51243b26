//! Structured plan extraction from function-call arguments.
//!
//! The model answers the plan prompt through the `propose_plan` function (see
//! [`plan_function`]). Its argument string is parsed into a [`PlanExtraction`]: always a
//! `summary`, plus `goal` and `steps` when the model chose to propose a plan. A missing
//! goal/steps pair is a normal summary-only outcome; a present but incomplete step is an
//! [`ExtractError::Malformed`] for the caller to handle.

mod schema;

pub use schema::{plan_function, PLAN_FUNCTION_NAME};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of resource links kept per action.
pub const MAX_RAW_LINKS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("structured output is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("malformed structured output at {path}: {message}")]
    Malformed { path: String, message: String },
}

/// The four idea variants attached to an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ideas {
    pub most_obvious: String,
    pub least_obvious: String,
    pub inventive_or_imaginative: String,
    pub rewarding_or_sustainable: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_links: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ideas: Option<Ideas>,
}

/// One plan step. `number` is what the client sees; the position in [`Plan::steps`] is
/// the internal order and the two need not match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub number: i64,
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub goal: String,
    pub steps: Vec<Step>,
}

/// Response body: `summary` always, `goal`/`steps` only when a plan was proposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanExtraction {
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<Step>>,
}

impl PlanExtraction {
    pub fn summary_only(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            goal: None,
            steps: None,
        }
    }

    /// The proposed plan, when there is one.
    pub fn plan(&self) -> Option<Plan> {
        match (&self.goal, &self.steps) {
            (Some(goal), Some(steps)) => Some(Plan {
                goal: goal.clone(),
                steps: steps.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct RawExtraction {
    summary: Option<String>,
    goal: Option<String>,
    steps: Option<Vec<RawStep>>,
}

#[derive(Deserialize)]
struct RawStep {
    number: Option<serde_json::Value>,
    action: Option<RawAction>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAction {
    name: Option<String>,
    description: Option<String>,
    raw_links: Option<Vec<String>>,
    ideas: Option<RawIdeas>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIdeas {
    most_obvious: Option<String>,
    least_obvious: Option<String>,
    inventive_or_imaginative: Option<String>,
    rewarding_or_sustainable: Option<String>,
}

fn malformed(path: impl Into<String>, message: impl Into<String>) -> ExtractError {
    ExtractError::Malformed {
        path: path.into(),
        message: message.into(),
    }
}

fn required(value: Option<String>, path: String) -> Result<String, ExtractError> {
    value.ok_or_else(|| malformed(path, "missing required string"))
}

/// Parses function-call `arguments` into a [`PlanExtraction`].
pub fn extract(arguments: &str) -> Result<PlanExtraction, ExtractError> {
    let raw: RawExtraction = serde_json::from_str(arguments).map_err(|e| {
        if e.is_data() {
            malformed("$", e.to_string())
        } else {
            ExtractError::InvalidJson(e.to_string())
        }
    })?;

    let summary = required(raw.summary, "summary".to_string())?;
    let (goal, raw_steps) = match (raw.goal, raw.steps) {
        (Some(goal), Some(steps)) => (goal, steps),
        _ => return Ok(PlanExtraction::summary_only(summary)),
    };

    let steps = raw_steps
        .into_iter()
        .enumerate()
        .map(|(i, s)| convert_step(i, s))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PlanExtraction {
        summary,
        goal: Some(goal),
        steps: Some(steps),
    })
}

/// Integer step number; a float with no fractional part (`2.0`) is accepted.
fn step_number(value: &serde_json::Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

fn convert_step(index: usize, raw: RawStep) -> Result<Step, ExtractError> {
    let at = format!("steps[{}]", index);
    let number = raw
        .number
        .as_ref()
        .and_then(step_number)
        .ok_or_else(|| malformed(format!("{}.number", at), "expected an integer"))?;
    let action = raw
        .action
        .ok_or_else(|| malformed(format!("{}.action", at), "missing action object"))?;
    let at = format!("{}.action", at);

    let raw_links = action.raw_links.map(|mut links| {
        if links.len() > MAX_RAW_LINKS {
            tracing::warn!(path = %at, count = links.len(), "truncating rawLinks");
            links.truncate(MAX_RAW_LINKS);
        }
        links
    });

    let ideas = match action.ideas {
        Some(ideas) => {
            let at = format!("{}.ideas", at);
            Some(Ideas {
                most_obvious: required(ideas.most_obvious, format!("{}.mostObvious", at))?,
                least_obvious: required(ideas.least_obvious, format!("{}.leastObvious", at))?,
                inventive_or_imaginative: required(
                    ideas.inventive_or_imaginative,
                    format!("{}.inventiveOrImaginative", at),
                )?,
                rewarding_or_sustainable: required(
                    ideas.rewarding_or_sustainable,
                    format!("{}.rewardingOrSustainable", at),
                )?,
            })
        }
        None => None,
    };

    Ok(Step {
        number,
        action: Action {
            name: required(action.name, format!("{}.name", at))?,
            description: required(action.description, format!("{}.description", at))?,
            raw_links,
            ideas,
        },
    })
}
