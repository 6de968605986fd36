use std::time::SystemTime;

use tracing::{Level, event};
use tokio::task::JoinError;
use uuid::Uuid;

use crate::errors::Error;

/// Structured events for one refresh round.
#[derive(Clone, Debug)]
pub struct RefreshTelemetry {
    round_id: Uuid,
    endpoint: String,
}

impl RefreshTelemetry {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            round_id: Uuid::new_v4(),
            endpoint: endpoint.into(),
        }
    }

    pub fn round_id(&self) -> Uuid {
        self.round_id
    }

    pub fn emit_start(&self, at: SystemTime) {
        event!(
            Level::INFO,
            round_id = %self.round_id,
            endpoint = %self.endpoint,
            timestamp = ?at,
            "refresh.start"
        );
    }

    pub fn emit_success(&self, at: SystemTime) {
        event!(
            Level::INFO,
            round_id = %self.round_id,
            endpoint = %self.endpoint,
            timestamp = ?at,
            "refresh.success"
        );
    }

    pub fn emit_failure(&self, error: &Error, at: SystemTime) {
        event!(
            Level::ERROR,
            round_id = %self.round_id,
            endpoint = %self.endpoint,
            timestamp = ?at,
            status = ?error.http_status(),
            error = %error,
            "refresh.failure"
        );
    }
}

/// A caller attached itself to a round already in flight.
pub fn emit_join(endpoint: &str) {
    event!(Level::DEBUG, endpoint = %endpoint, "refresh.join");
}

/// No refresh token was available, so no round was started.
pub fn emit_no_session(endpoint: &str) {
    event!(Level::WARN, endpoint = %endpoint, "refresh.no_session");
}

/// The round task panicked or was cancelled before publishing a result.
pub fn emit_aborted(endpoint: &str, error: &JoinError) {
    event!(
        Level::ERROR,
        endpoint = %endpoint,
        panicked = error.is_panic(),
        error = %error,
        "refresh.aborted"
    );
}
