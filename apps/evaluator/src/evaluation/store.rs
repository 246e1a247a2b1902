//! Interview storage seam. The job reads and writes interview rows only through
//! `InterviewStore`, always scoped by (interview id, owning user id).

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::interview::{InterviewRecord, InterviewRow};

#[async_trait]
pub trait InterviewStore: Send + Sync {
    /// Loads an interview with its question / job context. `None` when the
    /// interview does not exist or belongs to another user.
    async fn load_interview(&self, interview_id: Uuid, user_id: Uuid)
        -> Result<Option<InterviewRecord>>;

    /// Overwrites the evaluation, sets status `completed` and clears the error.
    /// A `failed` interview is terminal and is never touched. Returns the number
    /// of rows updated.
    async fn save_evaluation(&self, interview_id: Uuid, user_id: Uuid, evaluation: &Value)
        -> Result<u64>;

    /// Sets status `failed` with `message`, only while the status is still `pending`.
    async fn mark_failed(&self, interview_id: Uuid, user_id: Uuid, message: &str) -> Result<u64>;
}

#[derive(Clone)]
pub struct PgInterviewStore {
    pool: PgPool,
}

impl PgInterviewStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InterviewStore for PgInterviewStore {
    async fn load_interview(
        &self,
        interview_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<InterviewRecord>> {
        let row: Option<InterviewRow> = sqlx::query_as(
            r#"
            SELECT i.id, i.user_id, i.mode, i.transcript, i.job_context,
                   q.question AS question_text, q.category AS question_category,
                   i.evaluation, i.evaluation_status, i.evaluation_error,
                   i.created_at, i.updated_at
            FROM interviews i
            LEFT JOIN practice_questions q ON q.id = i.question_id
            WHERE i.id = $1 AND i.user_id = $2
            "#,
        )
        .bind(interview_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(InterviewRecord::try_from).transpose()
    }

    async fn save_evaluation(
        &self,
        interview_id: Uuid,
        user_id: Uuid,
        evaluation: &Value,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE interviews
            SET evaluation = $3,
                evaluation_status = 'completed',
                evaluation_error = NULL,
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND evaluation_status <> 'failed'
            "#,
        )
        .bind(interview_id)
        .bind(user_id)
        .bind(evaluation)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn mark_failed(&self, interview_id: Uuid, user_id: Uuid, message: &str) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE interviews
            SET evaluation_status = 'failed',
                evaluation_error = $3,
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND evaluation_status = 'pending'
            "#,
        )
        .bind(interview_id)
        .bind(user_id)
        .bind(message)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
