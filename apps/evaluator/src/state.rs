use std::sync::Arc;

use crate::evaluation::store::InterviewStore;
use crate::jobs::queue::JobQueue;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Interview storage. Postgres in production, in-memory in tests.
    pub interviews: Arc<dyn InterviewStore>,
    /// Claims and trigger events. Redis in production, in-memory in tests.
    pub queue: Arc<dyn JobQueue>,
}
