use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::EvaluationRequested;
use crate::models::interview::{EvaluationStatus, InterviewMode};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub job_id: Uuid,
    pub interview_id: Uuid,
    pub status: EvaluationStatus,
}

#[derive(Debug, Serialize)]
pub struct EvaluationStatusResponse {
    pub interview_id: Uuid,
    pub mode: InterviewMode,
    pub evaluation_status: EvaluationStatus,
    pub evaluation: Option<Value>,
    pub evaluation_error: Option<String>,
}

/// POST /api/v1/interviews/:id/evaluate
pub async fn handle_request_evaluation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<EvaluateRequest>,
) -> Result<(StatusCode, Json<EvaluateResponse>), AppError> {
    let record = state
        .interviews
        .load_interview(id, req.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Interview {id} not found")))?;

    if record.transcript.iter().all(|m| m.message.trim().is_empty()) {
        return Err(AppError::Validation(
            "Interview transcript is empty; finish the interview before requesting an evaluation."
                .to_string(),
        ));
    }
    if record.evaluation_status != EvaluationStatus::Pending {
        return Err(AppError::Conflict(format!(
            "Interview {id} already has a {} evaluation",
            record.evaluation_status.as_str()
        )));
    }

    let job_id = Uuid::new_v4();
    let claimed = state
        .queue
        .claim(id, job_id)
        .await
        .map_err(queue_unavailable)?;
    if !claimed {
        return Err(AppError::Conflict(format!(
            "An evaluation of interview {id} is already in progress"
        )));
    }

    let event = EvaluationRequested {
        job_id,
        interview_id: id,
        user_id: req.user_id,
        interview_mode: record.mode,
    };
    if let Err(e) = state.queue.enqueue(&event).await {
        if let Err(release_err) = state.queue.release(id, job_id).await {
            warn!(interview_id = %id, "Failed to release evaluation claim: {release_err:#}");
        }
        return Err(queue_unavailable(e));
    }

    info!(job_id = %job_id, interview_id = %id, mode = %record.mode, "Evaluation requested");
    Ok((
        StatusCode::ACCEPTED,
        Json(EvaluateResponse {
            job_id,
            interview_id: id,
            status: EvaluationStatus::Pending,
        }),
    ))
}

fn queue_unavailable(e: anyhow::Error) -> AppError {
    AppError::Queue(format!("{e:#}"))
}

/// GET /api/v1/interviews/:id/evaluation
pub async fn handle_get_evaluation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<EvaluationStatusResponse>, AppError> {
    let record = state
        .interviews
        .load_interview(id, params.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Interview {id} not found")))?;

    Ok(Json(EvaluationStatusResponse {
        interview_id: record.id,
        mode: record.mode,
        evaluation_status: record.evaluation_status,
        evaluation: record.evaluation,
        evaluation_error: record.evaluation_error,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use tower::ServiceExt;

    use super::*;
    use crate::jobs::queue::JobQueue;
    use crate::models::interview::InterviewRecord;
    use crate::routes::build_router;
    use crate::testing::{make_record, MemoryInterviewStore, MemoryQueue};

    fn app(records: Vec<InterviewRecord>) -> axum::Router {
        app_with(records, MemoryQueue::default()).0
    }

    fn app_with(
        records: Vec<InterviewRecord>,
        queue: MemoryQueue,
    ) -> (axum::Router, Arc<MemoryInterviewStore>, Arc<MemoryQueue>) {
        let store = Arc::new(MemoryInterviewStore::with_records(records));
        let queue = Arc::new(queue);
        let router = build_router(AppState {
            interviews: store.clone(),
            queue: queue.clone(),
        });
        (router, store, queue)
    }

    fn failed_record() -> InterviewRecord {
        let mut record = make_record(InterviewMode::Full);
        record.evaluation_status = EvaluationStatus::Failed;
        record.evaluation_error = Some("Completion failed: model overloaded".to_string());
        record
    }

    fn evaluate_request(id: Uuid, user_id: Uuid) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/api/v1/interviews/{id}/evaluate"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::json!({ "user_id": user_id }).to_string(),
            ))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_evaluate_foreign_interview_is_not_found() {
        let record = make_record(InterviewMode::Full);
        let response = app(vec![record.clone()])
            .oneshot(evaluate_request(record.id, Uuid::new_v4()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_evaluate_completed_interview_conflicts() {
        let mut record = make_record(InterviewMode::Full);
        record.evaluation_status = EvaluationStatus::Completed;
        let response = app(vec![record.clone()])
            .oneshot(evaluate_request(record.id, record.user_id))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(response).await["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_evaluate_empty_transcript_is_rejected() {
        let mut record = make_record(InterviewMode::Full);
        record.transcript.clear();
        let response = app(vec![record.clone()])
            .oneshot(evaluate_request(record.id, record.user_id))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_evaluation_reports_failure() {
        let mut record = make_record(InterviewMode::QuickQuestion);
        record.evaluation_status = EvaluationStatus::Failed;
        record.evaluation_error = Some("Timed out waiting for completion after 60 polls".to_string());
        let response = app(vec![record.clone()])
            .oneshot(
                Request::builder()
                    .uri(format!(
                        "/api/v1/interviews/{}/evaluation?user_id={}",
                        record.id, record.user_id
                    ))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["evaluation_status"], "failed");
        assert_eq!(body["mode"], "quick_question");
        assert!(body["evaluation_error"]
            .as_str()
            .unwrap()
            .contains("Timed out"));
    }

    #[tokio::test]
    async fn test_pending_interview_is_claimed_and_enqueued() {
        let record = make_record(InterviewMode::Full);
        let (router, _, queue) = app_with(vec![record.clone()], MemoryQueue::default());

        let response = router
            .oneshot(evaluate_request(record.id, record.user_id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = body_json(response).await;
        let job_id: Uuid = serde_json::from_value(body["job_id"].clone()).unwrap();
        assert_eq!(body["status"], "pending");
        assert_eq!(queue.requested().len(), 1);
        assert_eq!(queue.requested()[0].job_id, job_id);
        assert_eq!(queue.claim_holder(record.id), Some(job_id));
    }

    #[tokio::test]
    async fn test_in_flight_evaluation_conflicts() {
        let record = make_record(InterviewMode::Full);
        let (router, _, queue) = app_with(vec![record.clone()], MemoryQueue::default());
        let running = Uuid::new_v4();
        assert!(queue.claim(record.id, running).await.unwrap());

        let response = router
            .oneshot(evaluate_request(record.id, record.user_id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert!(queue.requested().is_empty());
        assert_eq!(queue.claim_holder(record.id), Some(running));
    }

    #[tokio::test]
    async fn test_failed_interview_is_not_reevaluated() {
        let record = failed_record();
        let (router, store, queue) = app_with(vec![record.clone()], MemoryQueue::default());

        let response = router
            .oneshot(evaluate_request(record.id, record.user_id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert!(queue.requested().is_empty());
        assert_eq!(queue.claim_holder(record.id), None);
        assert_eq!(store.get(record.id).unwrap(), record);
    }

    #[tokio::test]
    async fn test_enqueue_failure_frees_claim_and_leaves_record_untouched() {
        let record = make_record(InterviewMode::Full);
        let (router, store, queue) =
            app_with(vec![record.clone()], MemoryQueue::default().failing_enqueue());

        let response = router
            .oneshot(evaluate_request(record.id, record.user_id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(response).await["error"]["code"], "QUEUE_UNAVAILABLE");
        assert_eq!(queue.claim_holder(record.id), None);
        assert_eq!(store.get(record.id).unwrap(), record);

        // The next trigger can claim the interview again.
        assert!(queue.claim(record.id, Uuid::new_v4()).await.unwrap());
    }
}
