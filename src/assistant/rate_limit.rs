//! Sliding-window limiter for the AI assistant endpoint.
//!
//! Best effort and process-local: it keeps the timestamps of accepted calls
//! inside the window and rejects a call once `max_requests` of them remain.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
pub struct SlidingWindowLimiter {
    config: RateLimitConfig,
    accepted: Mutex<VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            accepted: Mutex::new(VecDeque::with_capacity(config.max_requests)),
        }
    }

    /// Records a call if the window has room, otherwise returns how long until it will.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        self.try_acquire_at(Instant::now())
    }

    pub(crate) fn try_acquire_at(&self, now: Instant) -> Result<(), Duration> {
        let mut accepted = self
            .accepted
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        while let Some(oldest) = accepted.front() {
            if now.saturating_duration_since(*oldest) >= self.config.window {
                accepted.pop_front();
            } else {
                break;
            }
        }
        if accepted.len() < self.config.max_requests {
            accepted.push_back(now);
            return Ok(());
        }
        let retry_after = accepted
            .front()
            .map(|oldest| {
                self.config
                    .window
                    .saturating_sub(now.saturating_duration_since(*oldest))
            })
            .unwrap_or(self.config.window);
        tracing::warn!(
            max_requests = self.config.max_requests,
            window_ms = self.config.window.as_millis() as u64,
            retry_after_ms = retry_after.as_millis() as u64,
            "assistant.rate_limited"
        );
        Err(retry_after)
    }
}
