use chrono::{DateTime, Utc};

use crate::pipeline::Pipeline;

/// Shared state for all handlers
pub struct AppState {
    pub pipeline: Pipeline,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            started_at: Utc::now(),
        }
    }

    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
