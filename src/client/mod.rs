use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::descriptor::RequestDescriptor;
use crate::errors::Error;
use crate::executor::RequestExecutor;
use crate::token::{RefreshCoordinator, SessionStore};
use crate::types::NoContent;

mod builder;

pub use builder::ApiClientBuilder;

/// Entry point used by the domain services (pets, bookings, chat, ...).
///
/// Services only describe requests; retry, refresh and error classification
/// all happen in the shared executor.
#[derive(Clone)]
pub struct ApiClient {
    config: ClientConfig,
    session: Arc<dyn SessionStore>,
    coordinator: RefreshCoordinator,
    executor: RequestExecutor,
}

impl ApiClient {
    pub fn new(config: ClientConfig, session: Arc<dyn SessionStore>) -> Result<Self, Error> {
        Self::builder(config, session).build()
    }

    pub fn builder(config: ClientConfig, session: Arc<dyn SessionStore>) -> ApiClientBuilder {
        ApiClientBuilder::new(config, session)
    }

    /// Descriptor pre-filled with configured defaults and the current access token.
    pub fn request(&self, method: Method, path: impl Into<String>) -> RequestDescriptor {
        let descriptor = RequestDescriptor::new(method, path)
            .timeout(self.config.request_timeout())
            .retries(self.config.max_retries)
            .retry_delay(self.config.retry_delay());
        match self.session.current_access_token() {
            Some(token) => descriptor.bearer(&token),
            None => descriptor,
        }
    }

    pub async fn execute<T: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<T, Error> {
        self.executor.execute(descriptor).await
    }

    pub async fn execute_no_content(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<NoContent, Error> {
        self.executor.execute_no_content(descriptor).await
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> Arc<dyn SessionStore> {
        Arc::clone(&self.session)
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }
}
