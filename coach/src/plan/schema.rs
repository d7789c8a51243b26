//! JSON schema of the `propose_plan` function offered to the model.

use serde_json::json;

use crate::llm::FunctionSpec;

use super::MAX_RAW_LINKS;

pub const PLAN_FUNCTION_NAME: &str = "propose_plan";

/// Function spec for plan proposals. Only `summary` is required; `goal` and `steps` are
/// supplied together when the model proposes or updates a plan.
pub fn plan_function() -> FunctionSpec {
    let idea = json!({"type": "string"});
    FunctionSpec {
        name: PLAN_FUNCTION_NAME.to_string(),
        description: Some(
            "Reply to the client with a summary and, when appropriate, a step-by-step plan."
                .to_string(),
        ),
        parameters: json!({
            "type": "object",
            "properties": {
                "summary": {
                    "type": "string",
                    "description": "Short reply to the client."
                },
                "goal": {
                    "type": "string",
                    "description": "The client's financial goal."
                },
                "steps": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "number": {"type": "integer"},
                            "action": {
                                "type": "object",
                                "properties": {
                                    "name": {"type": "string"},
                                    "description": {"type": "string"},
                                    "rawLinks": {
                                        "type": "array",
                                        "items": {"type": "string"},
                                        "maxItems": MAX_RAW_LINKS
                                    },
                                    "ideas": {
                                        "type": "object",
                                        "properties": {
                                            "mostObvious": idea,
                                            "leastObvious": idea,
                                            "inventiveOrImaginative": idea,
                                            "rewardingOrSustainable": idea
                                        },
                                        "required": [
                                            "mostObvious",
                                            "leastObvious",
                                            "inventiveOrImaginative",
                                            "rewardingOrSustainable"
                                        ]
                                    }
                                },
                                "required": ["name", "description"]
                            }
                        },
                        "required": ["number", "action"]
                    }
                }
            },
            "required": ["summary"]
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_requires_summary_and_all_ideas() {
        let f = plan_function();
        assert_eq!(f.name, "propose_plan");
        assert_eq!(f.parameters["required"], json!(["summary"]));
        let ideas = &f.parameters["properties"]["steps"]["items"]["properties"]["action"]
            ["properties"]["ideas"];
        assert_eq!(ideas["required"].as_array().unwrap().len(), 4);
        let links = &f.parameters["properties"]["steps"]["items"]["properties"]["action"]
            ["properties"]["rawLinks"];
        assert_eq!(links["maxItems"], 3);
    }
}
