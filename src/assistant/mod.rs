use std::sync::Arc;

use reqwest::Method;

use crate::client::ApiClient;
use crate::errors::Error;
use crate::types::{AssistantMessage, AssistantReply};

mod rate_limit;

pub use rate_limit::{RateLimitConfig, SlidingWindowLimiter};

pub const ASSISTANT_PATH: &str = "/ai/chat";

/// AI assistant client: the shared pipeline plus a local sliding-window limit.
#[derive(Clone)]
pub struct AssistantClient {
    api: ApiClient,
    limiter: Arc<SlidingWindowLimiter>,
}

impl AssistantClient {
    pub fn new(api: ApiClient, limits: RateLimitConfig) -> Self {
        Self {
            api,
            limiter: Arc::new(SlidingWindowLimiter::new(limits)),
        }
    }

    pub async fn ask(&self, message: &str, pet_id: Option<&str>) -> Result<AssistantReply, Error> {
        self.limiter.try_acquire().map_err(Error::RateLimited)?;
        let body = AssistantMessage {
            message: message.to_string(),
            pet_id: pet_id.map(str::to_string),
        };
        let descriptor = self
            .api
            .request(Method::POST, ASSISTANT_PATH)
            // Assistant calls are never retried.
            .retries(0)
            .json(&body)?;
        self.api.execute(&descriptor).await
    }
}
