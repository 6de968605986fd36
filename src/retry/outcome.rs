use std::time::Duration;

use tracing::Level;
use tracing::event;

/// Summary of one logical request, emitted once it reaches a terminal state.
#[derive(Debug, Clone)]
pub struct RetryOutcome {
    pub operation: String,
    pub attempts: u32,
    pub refreshed: bool,
    pub success: bool,
    pub total_delay: Duration,
}

impl RetryOutcome {
    pub fn log(&self) {
        if self.success {
            event!(
                Level::INFO,
                operation = %self.operation,
                attempts = self.attempts,
                refreshed = self.refreshed,
                success = self.success,
                total_delay_ms = self.total_delay.as_millis() as u64,
                "retry.outcome"
            );
        } else {
            event!(
                Level::WARN,
                operation = %self.operation,
                attempts = self.attempts,
                refreshed = self.refreshed,
                success = self.success,
                total_delay_ms = self.total_delay.as_millis() as u64,
                "retry.outcome"
            );
        }
    }
}
