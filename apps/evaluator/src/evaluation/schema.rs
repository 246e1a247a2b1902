//! JSON schemas attached to completion requests. The completion service enforces
//! them, so the extracted payload already has the right field names and enums;
//! the skill count is still re-checked after extraction.

use serde_json::{json, Value};

use crate::models::interview::InterviewMode;

/// Allowed values for a skill score.
pub const SCORE_VALUES: [f64; 7] = [1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0];

pub fn schema_name(mode: InterviewMode) -> &'static str {
    match mode {
        InterviewMode::Full => "full_interview_evaluation",
        InterviewMode::QuickQuestion => "quick_question_evaluation",
        InterviewMode::JobSpecific => "job_specific_evaluation",
    }
}

/// Builds the strict output schema for `mode`. `skills` is pinned to exactly
/// `skill_names.len()` entries and each `skillName` must be one of `skill_names`.
pub fn evaluation_schema(mode: InterviewMode, skill_names: &[String]) -> Value {
    let skill_count = skill_names.len();

    let mut properties = json!({
        "skills": {
            "type": "array",
            "minItems": skill_count,
            "maxItems": skill_count,
            "items": {
                "type": "object",
                "properties": {
                    "skillName": { "type": "string", "enum": skill_names },
                    "score": { "type": "number", "enum": SCORE_VALUES },
                    "explanation": { "type": "string" },
                    "supportingQuotes": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["skillName", "score", "explanation", "supportingQuotes"],
                "additionalProperties": false
            }
        },
        "overallVerdict": { "type": "string", "enum": mode.verdicts() },
        "overallExplanation": { "type": "string" },
        "recommendedImprovements": {
            "type": "array",
            "items": { "type": "string" },
            "maxItems": mode.max_improvements()
        }
    });

    let mut required = vec![
        "skills",
        "overallVerdict",
        "overallExplanation",
        "recommendedImprovements",
    ];

    if mode == InterviewMode::JobSpecific {
        properties["companyFitAssessment"] = json!({ "type": "string" });
        required.push("companyFitAssessment");
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Skill {i}")).collect()
    }

    #[test]
    fn test_skills_array_is_pinned_to_count() {
        let schema = evaluation_schema(InterviewMode::QuickQuestion, &names(4));
        let skills = &schema["properties"]["skills"];
        assert_eq!(skills["minItems"], 4);
        assert_eq!(skills["maxItems"], 4);
        assert_eq!(skills["items"]["properties"]["skillName"]["enum"][3], "Skill 3");
    }

    #[test]
    fn test_company_fit_only_for_job_specific() {
        let job = evaluation_schema(InterviewMode::JobSpecific, &names(6));
        assert!(job["properties"].get("companyFitAssessment").is_some());
        assert!(job["required"]
            .as_array()
            .unwrap()
            .iter()
            .any(|r| r == "companyFitAssessment"));

        let full = evaluation_schema(InterviewMode::Full, &names(12));
        assert!(full["properties"].get("companyFitAssessment").is_none());
    }

    #[test]
    fn test_score_enum_is_half_point_steps() {
        let schema = evaluation_schema(InterviewMode::Full, &names(12));
        let scores = schema["properties"]["skills"]["items"]["properties"]["score"]["enum"]
            .as_array()
            .unwrap()
            .clone();
        assert_eq!(scores.len(), 7);
        assert_eq!(scores[1], 1.5);
        assert_eq!(scores[6], 4.0);
    }
}
