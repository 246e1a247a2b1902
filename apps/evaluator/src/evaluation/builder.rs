//! Prompt Builder: turns a transcript and its mode context into the rendered
//! prompt, the output schema and the expected skill count. Pure: no I/O.
//!
//! CRITICAL: a mode whose required context is missing is rejected here, before
//! anything is sent to the completion service.

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::evaluation::prompts::{
    FULL_INTERVIEW_TEMPLATE, FULL_VERDICT_SCALE, JOB_DESCRIPTION_MAX_CHARS,
    JOB_SPECIFIC_TEMPLATE, NO_JOB_DESCRIPTION, QUICK_QUESTION_TEMPLATE, QUICK_VERDICT_SCALE,
};
use crate::evaluation::rubrics::{
    full_rubric, job_specific_rubric, job_specific_verdict_scale, rubric_for_category,
    CategoryRubric, SkillDefinition,
};
use crate::evaluation::schema::{evaluation_schema, schema_name};
use crate::evaluation::EvaluationError;
use crate::llm_client::prompts::{EVALUATOR_SYSTEM, EVIDENCE_INSTRUCTION, SCORE_SCALE};
use crate::models::interview::{
    InterviewMode, InterviewRecord, JobContext, PracticedQuestion, TranscriptMessage,
};

/// Everything the Completion Requester needs. Stored as a step checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuiltPrompt {
    pub mode: InterviewMode,
    pub system: String,
    pub prompt: String,
    pub schema: Value,
    pub schema_name: String,
    pub expected_skill_count: usize,
}

/// Mode plus the context that mode requires.
#[derive(Debug, Clone, Copy)]
pub enum ModeContext<'a> {
    Full,
    QuickQuestion(&'a PracticedQuestion),
    JobSpecific(&'a JobContext),
}

impl<'a> ModeContext<'a> {
    /// Pairs the record's mode with its context, failing if the context is absent.
    pub fn from_record(record: &'a InterviewRecord) -> Result<Self, EvaluationError> {
        match record.mode {
            InterviewMode::Full => Ok(ModeContext::Full),
            InterviewMode::QuickQuestion => record
                .question
                .as_ref()
                .map(ModeContext::QuickQuestion)
                .ok_or_else(|| missing(record.mode, "no practice question linked")),
            InterviewMode::JobSpecific => record
                .job_context
                .as_ref()
                .map(ModeContext::JobSpecific)
                .ok_or_else(|| missing(record.mode, "no job context stored")),
        }
    }

    pub fn mode(&self) -> InterviewMode {
        match self {
            ModeContext::Full => InterviewMode::Full,
            ModeContext::QuickQuestion(_) => InterviewMode::QuickQuestion,
            ModeContext::JobSpecific(_) => InterviewMode::JobSpecific,
        }
    }
}

fn missing(mode: InterviewMode, detail: &str) -> EvaluationError {
    EvaluationError::MissingContext {
        mode,
        detail: detail.to_string(),
    }
}

/// Renders the prompt and schema for one interview.
pub fn build_prompt(
    transcript: &[TranscriptMessage],
    context: &ModeContext<'_>,
) -> Result<BuiltPrompt, EvaluationError> {
    if transcript.iter().all(|m| m.message.trim().is_empty()) {
        return Err(EvaluationError::EmptyTranscript);
    }
    let transcript_text = render_transcript(transcript);
    let mode = context.mode();

    let (prompt, skill_names) = match context {
        ModeContext::Full => {
            let rubric = full_rubric();
            let prompt = FULL_INTERVIEW_TEMPLATE
                .replace("{rubric}", &render_definitions(&rubric))
                .replace("{verdict_scale}", FULL_VERDICT_SCALE)
                .replace("{skill_count}", &rubric.len().to_string());
            (prompt, names_of(&rubric))
        }
        ModeContext::QuickQuestion(question) => {
            if question.question.trim().is_empty() {
                return Err(missing(mode, "practice question text is empty"));
            }
            let (rubric, matched) = rubric_for_category(&question.category);
            if !matched {
                warn!(
                    "Unknown question category {:?}; using {} rubric",
                    question.category, rubric.category
                );
            }
            let prompt = QUICK_QUESTION_TEMPLATE
                .replace("{category}", rubric.category)
                .replace("{question}", question.question.trim())
                .replace("{rubric}", &render_category_rubric(rubric))
                .replace("{verdict_scale}", QUICK_VERDICT_SCALE)
                .replace("{skill_count}", &rubric.skills.len().to_string());
            let names = rubric.skills.iter().map(|s| s.name.to_string()).collect();
            (prompt, names)
        }
        ModeContext::JobSpecific(job) => {
            let company = job.company.trim();
            let role = job.role.trim();
            if company.is_empty() || role.is_empty() {
                return Err(missing(mode, "company and role are required"));
            }
            if job.generated_questions.iter().all(|q| q.trim().is_empty()) {
                return Err(missing(mode, "no generated interview questions"));
            }
            let rubric = job_specific_rubric(company, role);
            let prompt = JOB_SPECIFIC_TEMPLATE
                .replace("{company}", company)
                .replace("{role}", role)
                .replace("{rubric}", &render_definitions(&rubric))
                .replace("{verdict_scale}", &job_specific_verdict_scale(company, role))
                .replace("{skill_count}", &rubric.len().to_string())
                .replace("{job_description}", &job_description_excerpt(job))
                .replace("{questions}", &render_questions(&job.generated_questions));
            (prompt, names_of(&rubric))
        }
    };

    if skill_names.len() != mode.expected_skill_count() {
        return Err(EvaluationError::Internal(anyhow!(
            "{mode} rubric has {} skills, expected {}",
            skill_names.len(),
            mode.expected_skill_count()
        )));
    }

    // Transcript last: candidate text is never scanned for placeholders.
    let prompt = prompt
        .replace("{evidence_instruction}", EVIDENCE_INSTRUCTION)
        .replace("{score_scale}", SCORE_SCALE)
        .replace("{transcript}", &transcript_text);

    Ok(BuiltPrompt {
        mode,
        system: EVALUATOR_SYSTEM.to_string(),
        prompt,
        schema: evaluation_schema(mode, &skill_names),
        schema_name: schema_name(mode).to_string(),
        expected_skill_count: skill_names.len(),
    })
}

fn render_transcript(transcript: &[TranscriptMessage]) -> String {
    transcript
        .iter()
        .filter(|m| !m.message.trim().is_empty())
        .map(|m| format!("{}: {}", m.sender.label(), m.message.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_definitions(rubric: &[SkillDefinition]) -> String {
    rubric
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {}: {}", i + 1, s.name, s.description))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_category_rubric(rubric: &CategoryRubric) -> String {
    let mut out = String::new();
    for (i, skill) in rubric.skills.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, skill.name));
        for (level, description) in skill.levels.iter().enumerate() {
            out.push_str(&format!("   {}: {}\n", level + 1, description));
        }
    }
    out.trim_end().to_string()
}

fn render_questions(questions: &[String]) -> String {
    questions
        .iter()
        .map(|q| q.trim())
        .filter(|q| !q.is_empty())
        .enumerate()
        .map(|(i, q)| format!("{}. {}", i + 1, q))
        .collect::<Vec<_>>()
        .join("\n")
}

fn job_description_excerpt(job: &JobContext) -> String {
    match job.job_description.as_deref().map(str::trim) {
        Some(jd) if !jd.is_empty() => jd.chars().take(JOB_DESCRIPTION_MAX_CHARS).collect(),
        _ => NO_JOB_DESCRIPTION.to_string(),
    }
}

fn names_of(rubric: &[SkillDefinition]) -> Vec<String> {
    rubric.iter().map(|s| s.name.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::rubrics::COMPANY_KNOWLEDGE_SKILL;
    use crate::models::interview::Sender;

    fn exchanges(n: usize) -> Vec<TranscriptMessage> {
        (0..n)
            .flat_map(|i| {
                [
                    TranscriptMessage {
                        sender: Sender::Interviewer,
                        message: format!("Question {i}?"),
                    },
                    TranscriptMessage {
                        sender: Sender::Candidate,
                        message: format!("Answer {i}."),
                    },
                ]
            })
            .collect()
    }

    fn skill_enum(built: &BuiltPrompt) -> Vec<String> {
        built.schema["properties"]["skills"]["items"]["properties"]["skillName"]["enum"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect()
    }

    fn verdict_enum(built: &BuiltPrompt) -> Vec<String> {
        built.schema["properties"]["overallVerdict"]["enum"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect()
    }

    fn acme_job() -> JobContext {
        JobContext {
            company: "Acme".to_string(),
            role: "PM".to_string(),
            job_description: Some("Own the anvil delivery roadmap.".to_string()),
            generated_questions: vec!["Why Acme?".to_string(), "Design a drone.".to_string()],
        }
    }

    #[test]
    fn test_expected_count_matches_schema_bounds_for_every_mode() {
        let question = PracticedQuestion {
            question: "Tell me about a time you failed.".to_string(),
            category: "Behavioral".to_string(),
        };
        let job = acme_job();
        let contexts = [
            (ModeContext::Full, 12),
            (ModeContext::QuickQuestion(&question), 4),
            (ModeContext::JobSpecific(&job), 6),
        ];
        for (context, expected) in contexts {
            let built = build_prompt(&exchanges(2), &context).unwrap();
            let skills = &built.schema["properties"]["skills"];
            assert_eq!(built.expected_skill_count, expected);
            assert_eq!(built.expected_skill_count, built.mode.expected_skill_count());
            assert_eq!(skills["minItems"], expected as u64);
            assert_eq!(skills["maxItems"], expected as u64);
        }
    }

    #[test]
    fn test_full_mode_requests_twelve_skills_and_hire_verdicts() {
        let built = build_prompt(&exchanges(6), &ModeContext::Full).unwrap();
        assert_eq!(built.mode, InterviewMode::Full);
        assert_eq!(built.expected_skill_count, 12);
        let mut verdicts = verdict_enum(&built);
        verdicts.sort();
        assert_eq!(verdicts, vec!["Hire", "No Hire", "Strong Hire", "Strong No Hire"]);
        assert!(built.prompt.contains("Answer 5."));
        assert!(built.prompt.contains("Candidate: Answer 0."));
        assert!(!built.prompt.contains("{transcript}"));
    }

    #[test]
    fn test_behavioral_quick_question_uses_behavioral_rubric() {
        let question = PracticedQuestion {
            question: "Tell me about a time you disagreed with your manager.".to_string(),
            category: "Behavioral".to_string(),
        };
        let built = build_prompt(&exchanges(1), &ModeContext::QuickQuestion(&question)).unwrap();
        assert_eq!(
            skill_enum(&built),
            vec![
                "Story Structure & Clarity",
                "Ownership & Accountability",
                "Impact & Results Orientation",
                "Communication & Executive Presence",
            ]
        );
        let mut verdicts = verdict_enum(&built);
        verdicts.sort();
        assert_eq!(verdicts, vec!["Good", "Needs Work", "Strong", "Weak"]);
        assert!(built.prompt.contains("disagreed with your manager"));
    }

    #[test]
    fn test_unknown_category_uses_default_rubric() {
        let question = PracticedQuestion {
            question: "Design an elevator.".to_string(),
            category: "Whiteboard".to_string(),
        };
        let built = build_prompt(&exchanges(1), &ModeContext::QuickQuestion(&question)).unwrap();
        assert_eq!(skill_enum(&built)[0], "User Empathy & Problem Framing");
    }

    #[test]
    fn test_job_specific_prompt_mentions_company_and_role() {
        let job = acme_job();
        let built = build_prompt(&exchanges(3), &ModeContext::JobSpecific(&job)).unwrap();

        let knowledge_line = built
            .prompt
            .lines()
            .find(|l| l.contains(COMPANY_KNOWLEDGE_SKILL))
            .unwrap();
        assert!(knowledge_line.contains("Acme") && knowledge_line.contains("PM"));

        let verdict_line = built
            .prompt
            .lines()
            .find(|l| l.starts_with("- Strong Hire:"))
            .unwrap();
        assert!(verdict_line.contains("Acme") && verdict_line.contains("PM"));

        assert!(built.prompt.contains("1. Why Acme?"));
        assert!(built.schema["properties"]
            .get("companyFitAssessment")
            .is_some());
        assert!(!built.prompt.contains("{company}"));
    }

    #[test]
    fn test_empty_transcript_is_rejected() {
        let err = build_prompt(&[], &ModeContext::Full).unwrap_err();
        assert!(matches!(err, EvaluationError::EmptyTranscript));

        let blank = vec![TranscriptMessage {
            sender: Sender::Candidate,
            message: "   ".to_string(),
        }];
        assert!(matches!(
            build_prompt(&blank, &ModeContext::Full),
            Err(EvaluationError::EmptyTranscript)
        ));
    }

    #[test]
    fn test_job_specific_without_questions_is_rejected() {
        let mut job = acme_job();
        job.generated_questions.clear();
        let err = build_prompt(&exchanges(1), &ModeContext::JobSpecific(&job)).unwrap_err();
        assert!(matches!(err, EvaluationError::MissingContext { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_missing_job_description_uses_placeholder() {
        let mut job = acme_job();
        job.job_description = None;
        let built = build_prompt(&exchanges(1), &ModeContext::JobSpecific(&job)).unwrap();
        assert!(built.prompt.contains(NO_JOB_DESCRIPTION));
    }

    #[test]
    fn test_mode_context_requires_question_for_quick_mode() {
        let record = InterviewRecord {
            id: uuid::Uuid::new_v4(),
            user_id: uuid::Uuid::new_v4(),
            mode: InterviewMode::QuickQuestion,
            transcript: exchanges(1),
            question: None,
            job_context: None,
            evaluation: None,
            evaluation_status: crate::models::interview::EvaluationStatus::Pending,
            evaluation_error: None,
        };
        assert!(matches!(
            ModeContext::from_record(&record),
            Err(EvaluationError::MissingContext { .. })
        ));
    }
}
