// In-memory implementations of the storage and completion seams, plus fixtures.
// Compiled for tests only.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::evaluation::store::InterviewStore;
use crate::jobs::checkpoints::CheckpointStore;
use crate::jobs::queue::JobQueue;
use crate::jobs::{EvaluationFailed, EvaluationRequested};
use crate::llm_client::{CompletionResponse, CompletionService, LlmError};
use crate::models::evaluation::Evaluation;
use crate::models::interview::{
    EvaluationStatus, InterviewMode, InterviewRecord, Sender, TranscriptMessage,
};

// =============================================================================
// Mock completion service
// =============================================================================

/// Arguments captured from a successful submit call
#[derive(Debug, Clone)]
pub struct SubmittedPrompt {
    pub prompt: String,
    pub schema: Value,
    pub schema_name: String,
}

/// Scripted completion service. Poll responses are returned in order and the
/// last one repeats forever; with no script every poll reports `in_progress`.
#[derive(Default)]
pub struct MockCompletionService {
    submissions: Mutex<Vec<SubmittedPrompt>>,
    submit_attempts: AtomicU32,
    submit_failures: AtomicU32,
    poll_script: Mutex<VecDeque<CompletionResponse>>,
    retrieved: Mutex<Vec<String>>,
}

impl MockCompletionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_poll_responses(self, responses: Vec<CompletionResponse>) -> Self {
        self.poll_script.lock().unwrap().extend(responses);
        self
    }

    /// The first `n` submit calls fail with a 500.
    pub fn with_submit_failures(self, n: u32) -> Self {
        self.submit_failures.store(n, Ordering::SeqCst);
        self
    }

    pub fn submissions(&self) -> Vec<SubmittedPrompt> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn submit_attempts(&self) -> u32 {
        self.submit_attempts.load(Ordering::SeqCst)
    }

    pub fn retrieve_calls(&self) -> usize {
        self.retrieved.lock().unwrap().len()
    }

    pub fn retrieved_ids(&self) -> Vec<String> {
        let mut ids = self.retrieved.lock().unwrap().clone();
        ids.dedup();
        ids
    }
}

#[async_trait]
impl CompletionService for MockCompletionService {
    async fn submit(
        &self,
        prompt: &str,
        _system: &str,
        schema: &Value,
        schema_name: &str,
    ) -> Result<String, LlmError> {
        self.submit_attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.submit_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.submit_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(LlmError::Api {
                status: 500,
                message: "internal error".to_string(),
            });
        }
        self.submissions.lock().unwrap().push(SubmittedPrompt {
            prompt: prompt.to_string(),
            schema: schema.clone(),
            schema_name: schema_name.to_string(),
        });
        Ok("resp_test".to_string())
    }

    async fn retrieve(&self, response_id: &str) -> Result<CompletionResponse, LlmError> {
        self.retrieved.lock().unwrap().push(response_id.to_string());
        let mut script = self.poll_script.lock().unwrap();
        let next = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        Ok(next.unwrap_or_else(in_progress))
    }
}

// =============================================================================
// Completion response fixtures
// =============================================================================

fn response(value: Value) -> CompletionResponse {
    serde_json::from_value(value).unwrap()
}

pub fn in_progress() -> CompletionResponse {
    response(json!({"id": "resp_test", "status": "in_progress"}))
}

pub fn completed_with_text(text: &str) -> CompletionResponse {
    response(json!({
        "id": "resp_test",
        "status": "completed",
        "output": [{
            "type": "message",
            "content": [{"type": "output_text", "text": text}]
        }]
    }))
}

pub fn failed_response(message: &str) -> CompletionResponse {
    response(json!({
        "id": "resp_test",
        "status": "failed",
        "error": {"code": "server_error", "message": message}
    }))
}

pub fn refusal_response(refusal: &str) -> CompletionResponse {
    response(json!({
        "id": "resp_test",
        "status": "completed",
        "output": [{
            "type": "message",
            "content": [{"type": "refusal", "refusal": refusal}]
        }]
    }))
}

/// A valid evaluation payload for `mode` with `skill_count` skills, as the
/// service would return it.
pub fn evaluation_json(mode: InterviewMode, skill_count: usize) -> String {
    let skills: Vec<Value> = (0..skill_count)
        .map(|i| {
            json!({
                "skillName": format!("Skill {i}"),
                "score": 3.0,
                "explanation": "Clear and structured.",
                "supportingQuotes": ["I started by clarifying the goal."]
            })
        })
        .collect();
    let mut payload = json!({
        "skills": skills,
        "overallVerdict": mode.verdicts()[1],
        "overallExplanation": "Meets the bar across most skills.",
        "recommendedImprovements": ["Quantify impact."]
    });
    if mode == InterviewMode::JobSpecific {
        payload["companyFitAssessment"] = json!("Knows the product line well.");
    }
    payload.to_string()
}

pub fn sample_evaluation(mode: InterviewMode) -> Evaluation {
    serde_json::from_str(&evaluation_json(mode, mode.expected_skill_count())).unwrap()
}

/// A pending interview with three exchanges and no mode context.
pub fn make_record(mode: InterviewMode) -> InterviewRecord {
    let transcript = (0..3)
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
        .collect();
    InterviewRecord {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        mode,
        transcript,
        question: None,
        job_context: None,
        evaluation: None,
        evaluation_status: EvaluationStatus::Pending,
        evaluation_error: None,
    }
}

// =============================================================================
// In-memory stores
// =============================================================================

#[derive(Default)]
pub struct MemoryInterviewStore {
    records: Mutex<HashMap<Uuid, InterviewRecord>>,
    save_calls: AtomicUsize,
}

impl MemoryInterviewStore {
    pub fn with_records(records: Vec<InterviewRecord>) -> Self {
        let store = Self::default();
        store
            .records
            .lock()
            .unwrap()
            .extend(records.into_iter().map(|r| (r.id, r)));
        store
    }

    pub fn get(&self, interview_id: Uuid) -> Option<InterviewRecord> {
        self.records.lock().unwrap().get(&interview_id).cloned()
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InterviewStore for MemoryInterviewStore {
    async fn load_interview(
        &self,
        interview_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<InterviewRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&interview_id)
            .filter(|r| r.user_id == user_id)
            .cloned())
    }

    async fn save_evaluation(
        &self,
        interview_id: Uuid,
        user_id: Uuid,
        evaluation: &Value,
    ) -> Result<u64> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.lock().unwrap();
        match records.get_mut(&interview_id) {
            Some(r) if r.user_id == user_id && r.evaluation_status != EvaluationStatus::Failed => {
                r.evaluation = Some(evaluation.clone());
                r.evaluation_status = EvaluationStatus::Completed;
                r.evaluation_error = None;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn mark_failed(&self, interview_id: Uuid, user_id: Uuid, message: &str) -> Result<u64> {
        let mut records = self.records.lock().unwrap();
        match records.get_mut(&interview_id) {
            Some(r) if r.user_id == user_id && r.evaluation_status == EvaluationStatus::Pending => {
                r.evaluation_status = EvaluationStatus::Failed;
                r.evaluation_error = Some(message.to_string());
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}

#[derive(Default)]
pub struct MemoryCheckpointStore {
    steps: Mutex<HashMap<(Uuid, String), (Value, DateTime<Utc>)>>,
}

impl MemoryCheckpointStore {
    pub fn insert(&self, job_id: Uuid, step: &str, output: Value) {
        self.insert_at(job_id, step, output, Utc::now());
    }

    pub fn insert_at(&self, job_id: Uuid, step: &str, output: Value, created_at: DateTime<Utc>) {
        self.steps
            .lock()
            .unwrap()
            .insert((job_id, step.to_string()), (output, created_at));
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self, job_id: Uuid, step: &str) -> Result<Option<Value>> {
        Ok(self
            .steps
            .lock()
            .unwrap()
            .get(&(job_id, step.to_string()))
            .map(|(output, _)| output.clone()))
    }

    async fn save(&self, job_id: Uuid, step: &str, output: &Value) -> Result<()> {
        self.steps
            .lock()
            .unwrap()
            .entry((job_id, step.to_string()))
            .or_insert_with(|| (output.clone(), Utc::now()));
        Ok(())
    }

    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut steps = self.steps.lock().unwrap();
        let before = steps.len();
        steps.retain(|_, (_, created_at)| *created_at >= cutoff);
        Ok((before - steps.len()) as u64)
    }
}

// =============================================================================
// In-memory queue
// =============================================================================

#[derive(Default)]
pub struct MemoryQueue {
    claims: Mutex<HashMap<Uuid, Uuid>>,
    requested: Mutex<Vec<EvaluationRequested>>,
    failures: Mutex<Vec<EvaluationFailed>>,
    fail_enqueue: AtomicBool,
    fail_publish: AtomicBool,
}

impl MemoryQueue {
    pub fn failing_enqueue(self) -> Self {
        self.fail_enqueue.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_publish(self) -> Self {
        self.fail_publish.store(true, Ordering::SeqCst);
        self
    }

    pub fn claim_holder(&self, interview_id: Uuid) -> Option<Uuid> {
        self.claims.lock().unwrap().get(&interview_id).copied()
    }

    pub fn requested(&self) -> Vec<EvaluationRequested> {
        self.requested.lock().unwrap().clone()
    }

    pub fn failures(&self) -> Vec<EvaluationFailed> {
        self.failures.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn claim(&self, interview_id: Uuid, job_id: Uuid) -> Result<bool> {
        let mut claims = self.claims.lock().unwrap();
        if claims.contains_key(&interview_id) {
            return Ok(false);
        }
        claims.insert(interview_id, job_id);
        Ok(true)
    }

    async fn release(&self, interview_id: Uuid, job_id: Uuid) -> Result<()> {
        let mut claims = self.claims.lock().unwrap();
        if claims.get(&interview_id) == Some(&job_id) {
            claims.remove(&interview_id);
        }
        Ok(())
    }

    async fn enqueue(&self, event: &EvaluationRequested) -> Result<()> {
        if self.fail_enqueue.load(Ordering::SeqCst) {
            bail!("connection refused");
        }
        self.requested.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn publish_failure(&self, failed: &EvaluationFailed) -> Result<()> {
        if self.fail_publish.load(Ordering::SeqCst) {
            bail!("connection refused");
        }
        self.failures.lock().unwrap().push(failed.clone());
        Ok(())
    }
}
