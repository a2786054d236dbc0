use jiff::Timestamp;
use tracing::{Level, event};
use uuid::Uuid;

use crate::errors::RefreshFailure;

#[derive(Clone, Debug)]
pub enum RefreshOutcome {
    Refreshed,
    Joined,
    Failed,
}

/// Structured events for one refresh round-trip, tagged with a per-attempt id.
#[derive(Clone, Debug)]
pub struct RefreshTelemetry {
    attempt_id: Uuid,
    context: String,
}

impl RefreshTelemetry {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            context: context.into(),
        }
    }

    pub fn emit_start(&self, at: Timestamp) {
        event!(
            Level::INFO,
            attempt_id = %self.attempt_id,
            context = %self.context,
            timestamp = %at,
            "refresh.start"
        );
    }

    pub fn emit_join(&self, waiter: &str) {
        event!(
            Level::DEBUG,
            attempt_id = %self.attempt_id,
            context = %self.context,
            waiter,
            outcome = ?RefreshOutcome::Joined,
            "refresh.join"
        );
    }

    pub fn emit_success(&self, at: Timestamp) {
        event!(
            Level::INFO,
            attempt_id = %self.attempt_id,
            context = %self.context,
            timestamp = %at,
            outcome = ?RefreshOutcome::Refreshed,
            "refresh.success"
        );
    }

    pub fn emit_failure(&self, failure: &RefreshFailure, at: Timestamp) {
        event!(
            Level::ERROR,
            attempt_id = %self.attempt_id,
            context = %self.context,
            timestamp = %at,
            outcome = ?RefreshOutcome::Failed,
            error = %failure,
            "refresh.failure"
        );
    }
}
