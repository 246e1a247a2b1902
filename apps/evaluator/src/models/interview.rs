use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

// ────────────────────────────────────────────────────────────────────────────
// Enumerations
// ────────────────────────────────────────────────────────────────────────────

/// Interview format. Selects the rubric, the output schema and the verdict vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewMode {
    Full,
    QuickQuestion,
    JobSpecific,
}

const HIRE_VERDICTS: &[&str] = &["Strong Hire", "Hire", "No Hire", "Strong No Hire"];
const QUALITY_VERDICTS: &[&str] = &["Strong", "Good", "Needs Work", "Weak"];

impl InterviewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewMode::Full => "full",
            InterviewMode::QuickQuestion => "quick_question",
            InterviewMode::JobSpecific => "job_specific",
        }
    }

    /// Exact number of entries the `skills` array must contain.
    pub fn expected_skill_count(&self) -> usize {
        match self {
            InterviewMode::Full => 12,
            InterviewMode::QuickQuestion => 4,
            InterviewMode::JobSpecific => 6,
        }
    }

    /// Closed set of labels allowed for `overallVerdict`, strongest first.
    pub fn verdicts(&self) -> &'static [&'static str] {
        match self {
            InterviewMode::Full | InterviewMode::JobSpecific => HIRE_VERDICTS,
            InterviewMode::QuickQuestion => QUALITY_VERDICTS,
        }
    }

    pub fn max_improvements(&self) -> usize {
        match self {
            InterviewMode::QuickQuestion => 3,
            InterviewMode::Full | InterviewMode::JobSpecific => 5,
        }
    }
}

impl fmt::Display for InterviewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterviewMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(InterviewMode::Full),
            "quick_question" => Ok(InterviewMode::QuickQuestion),
            "job_specific" => Ok(InterviewMode::JobSpecific),
            other => Err(anyhow!("Unknown interview mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationStatus {
    Pending,
    Completed,
    Failed,
}

impl EvaluationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationStatus::Pending => "pending",
            EvaluationStatus::Completed => "completed",
            EvaluationStatus::Failed => "failed",
        }
    }
}

impl FromStr for EvaluationStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(EvaluationStatus::Pending),
            "completed" => Ok(EvaluationStatus::Completed),
            "failed" => Ok(EvaluationStatus::Failed),
            other => Err(anyhow!("Unknown evaluation status '{other}'")),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Transcript and mode context
// ────────────────────────────────────────────────────────────────────────────

/// Who spoke a transcript line. The live-interview client writes `ai` / `user`,
/// so both spellings are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    #[serde(alias = "ai", alias = "assistant")]
    Interviewer,
    #[serde(alias = "user")]
    Candidate,
}

impl Sender {
    pub fn label(&self) -> &'static str {
        match self {
            Sender::Interviewer => "Interviewer",
            Sender::Candidate => "Candidate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub sender: Sender,
    pub message: String,
}

/// The practice question a quick-question session was about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticedQuestion {
    pub question: String,
    pub category: String,
}

/// Target job of a job-specific session, stored as JSONB on the interview row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobContext {
    pub company: String,
    pub role: String,
    #[serde(default)]
    pub job_description: Option<String>,
    #[serde(default)]
    pub generated_questions: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Rows
// ────────────────────────────────────────────────────────────────────────────

/// `interviews` joined with its optional `practice_questions` row.
#[derive(Debug, Clone, FromRow)]
pub struct InterviewRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub mode: String,
    pub transcript: Value,
    pub job_context: Option<Value>,
    pub question_text: Option<String>,
    pub question_category: Option<String>,
    pub evaluation: Option<Value>,
    pub evaluation_status: String,
    pub evaluation_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Typed view of one interview, as consumed by the evaluation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub mode: InterviewMode,
    pub transcript: Vec<TranscriptMessage>,
    pub question: Option<PracticedQuestion>,
    pub job_context: Option<JobContext>,
    pub evaluation: Option<Value>,
    pub evaluation_status: EvaluationStatus,
    pub evaluation_error: Option<String>,
}

impl TryFrom<InterviewRow> for InterviewRecord {
    type Error = anyhow::Error;

    fn try_from(row: InterviewRow) -> Result<Self, Self::Error> {
        let transcript: Vec<TranscriptMessage> = serde_json::from_value(row.transcript)
            .map_err(|e| anyhow!("Interview {} has a malformed transcript: {e}", row.id))?;

        let job_context = row
            .job_context
            .filter(|v| !v.is_null())
            .map(serde_json::from_value::<JobContext>)
            .transpose()
            .map_err(|e| anyhow!("Interview {} has a malformed job context: {e}", row.id))?;

        let question = match (row.question_text, row.question_category) {
            (Some(question), Some(category)) => Some(PracticedQuestion { question, category }),
            (Some(question), None) => Some(PracticedQuestion {
                question,
                category: String::new(),
            }),
            _ => None,
        };

        Ok(InterviewRecord {
            id: row.id,
            user_id: row.user_id,
            mode: row.mode.parse()?,
            transcript,
            question,
            job_context,
            evaluation: row.evaluation,
            evaluation_status: row.evaluation_status.parse()?,
            evaluation_error: row.evaluation_error,
        })
    }
}
