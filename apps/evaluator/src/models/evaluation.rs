use serde::{Deserialize, Serialize};

use crate::models::interview::{JobContext, PracticedQuestion};

/// One scored skill as returned by the completion service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillScore {
    pub skill_name: String,
    /// 1.0 – 4.0 in half-point steps.
    pub score: f64,
    pub explanation: String,
    #[serde(default)]
    pub supporting_quotes: Vec<String>,
}

/// Structured result of one interview evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub skills: Vec<SkillScore>,
    pub overall_verdict: String,
    pub overall_explanation: String,
    #[serde(default)]
    pub recommended_improvements: Vec<String>,
    /// Only present for job-specific interviews.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_fit_assessment: Option<String>,
}

/// Job context as echoed back onto the stored evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluatedJob {
    pub company: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_description: Option<String>,
}

impl From<&JobContext> for EvaluatedJob {
    fn from(job: &JobContext) -> Self {
        Self {
            company: job.company.clone(),
            role: job.role.clone(),
            job_description: job.job_description.clone(),
        }
    }
}

/// The document written to `interviews.evaluation`: the extracted evaluation
/// merged with what was practiced. Carries no timestamps so a re-write is identical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEvaluation {
    #[serde(flatten)]
    pub evaluation: Evaluation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<PracticedQuestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_context: Option<EvaluatedJob>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions_asked: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_evaluation_parses_camel_case_payload() {
        let payload = json!({
            "skills": [{
                "skillName": "Story Structure & Clarity",
                "score": 3.5,
                "explanation": "Clear STAR structure.",
                "supportingQuotes": ["First, the situation was..."]
            }],
            "overallVerdict": "Good",
            "overallExplanation": "Solid answer.",
            "recommendedImprovements": ["Quantify the result."]
        });
        let evaluation: Evaluation = serde_json::from_value(payload).unwrap();
        assert_eq!(evaluation.skills[0].score, 3.5);
        assert!(evaluation.company_fit_assessment.is_none());
    }

    #[test]
    fn test_stored_evaluation_flattens_and_omits_absent_context() {
        let stored = StoredEvaluation {
            evaluation: Evaluation {
                skills: vec![],
                overall_verdict: "Hire".to_string(),
                overall_explanation: "Good".to_string(),
                recommended_improvements: vec![],
                company_fit_assessment: None,
            },
            question: None,
            job_context: None,
            questions_asked: None,
        };
        let value = serde_json::to_value(&stored).unwrap();
        assert_eq!(value["overallVerdict"], "Hire");
        assert!(value.get("question").is_none());
        assert!(value.get("jobContext").is_none());
        assert!(value.get("companyFitAssessment").is_none());
    }
}
