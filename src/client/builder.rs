use std::sync::Arc;

use reqwest::Client;

use crate::config::ClientConfig;
use crate::errors::Error;
use crate::executor::RequestExecutor;
use crate::request_context::RequestDispatchContext;
use crate::retry::{Sleeper, TokioSleeper};
use crate::token::{RefreshCoordinator, SessionStore};

use super::ApiClient;

pub struct ApiClientBuilder {
    config: ClientConfig,
    session: Arc<dyn SessionStore>,
    http_client: Option<Client>,
    sleeper: Option<Arc<dyn Sleeper>>,
}

impl ApiClientBuilder {
    pub(super) fn new(config: ClientConfig, session: Arc<dyn SessionStore>) -> Self {
        Self {
            config,
            session,
            http_client: None,
            sleeper: None,
        }
    }

    pub fn http_client(mut self, http_client: Client) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Replaces the backoff sleeper, e.g. with one that records delays in tests.
    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    pub fn build(self) -> Result<ApiClient, Error> {
        self.config.validate()?;
        let base_url = self.config.parsed_base_url()?;
        let http_client = self.http_client.unwrap_or_default();
        let sleeper = self.sleeper.unwrap_or_else(|| Arc::new(TokioSleeper));

        let mut context = RequestDispatchContext::build(
            http_client,
            base_url,
            self.config.refresh_path.clone(),
            sleeper,
        )
        .with_backoff_shape(
            self.config.jitter_strategy()?,
            self.config.retry_max_delay(),
        );
        if let Some(user_agent) = self.config.user_agent.as_deref() {
            context = context.with_user_agent(user_agent);
        }
        let context = Arc::new(context);

        let coordinator = RefreshCoordinator::new(
            Arc::clone(&context),
            Arc::clone(&self.session),
            self.config.refresh_timeout(),
        );
        let executor = RequestExecutor::new(context, coordinator.clone());

        Ok(ApiClient {
            config: self.config,
            session: self.session,
            coordinator,
            executor,
        })
    }
}
