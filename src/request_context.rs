use std::sync::Arc;
use std::time::Duration;

use rand::{SeedableRng, rngs::StdRng};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Client, Url};
use tokio::sync::Mutex;

use crate::descriptor::RequestDescriptor;
use crate::errors::Error;
use crate::retry::{JitterStrategy, RetryPlan, Sleeper};

pub const DEFAULT_USER_AGENT: &str = concat!("petcare-client/", env!("CARGO_PKG_VERSION"));

/// Shared context for outbound requests: transport, base URL and backoff sources.
pub struct RequestDispatchContext {
    http_client: Client,
    base_url: Url,
    refresh_path: String,
    user_agent: String,
    sleeper: Arc<dyn Sleeper>,
    jitter: JitterStrategy,
    max_delay: Option<Duration>,
    rng: Mutex<StdRng>,
}

impl RequestDispatchContext {
    pub fn build(
        http_client: Client,
        base_url: Url,
        refresh_path: impl Into<String>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            http_client,
            base_url,
            refresh_path: refresh_path.into(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            sleeper,
            jitter: JitterStrategy::None,
            max_delay: None,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_backoff_shape(mut self, jitter: JitterStrategy, max_delay: Option<Duration>) -> Self {
        self.jitter = jitter;
        self.max_delay = max_delay;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn refresh_path(&self) -> &str {
        &self.refresh_path
    }

    pub fn sleeper(&self) -> &dyn Sleeper {
        self.sleeper.as_ref()
    }

    pub fn plan_for(&self, descriptor: &RequestDescriptor) -> RetryPlan {
        RetryPlan::new(descriptor.max_retries(), descriptor.base_retry_delay())
            .with_jitter(self.jitter)
            .with_max_delay(self.max_delay)
    }

    pub async fn backoff_delay(&self, plan: &RetryPlan, retry: u32) -> Duration {
        let mut rng = self.rng.lock().await;
        plan.delay_for_retry(retry, &mut *rng)
    }

    /// Joins the base URL with the descriptor path and re-attaches any inline query.
    pub fn resolve_url(&self, descriptor: &RequestDescriptor) -> Result<Url, Error> {
        let (route, query) = descriptor.split_path();
        let mut url = self.base_url.clone();
        let base_path = url.path().trim_end_matches('/').to_string();
        let route = route.trim_start_matches('/');
        url.set_path(&format!("{base_path}/{route}"));
        url.set_query(None);

        if let Some(query) = query.filter(|q| !q.is_empty()) {
            let mut pairs = url.query_pairs_mut();
            for pair in query.split('&').filter(|p| !p.is_empty()) {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                let key = decode_component(key)?;
                let value = decode_component(value)?;
                pairs.append_pair(&key, &value);
            }
        }
        Ok(url)
    }

    /// Builds the physical request for one send of `descriptor`.
    pub fn build_request(&self, descriptor: &RequestDescriptor) -> Result<reqwest::Request, Error> {
        let url = self.resolve_url(descriptor)?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let user_agent = HeaderValue::from_str(&self.user_agent)
            .map_err(|e| Error::Request(format!("invalid user agent: {e}")))?;
        headers.insert(USER_AGENT, user_agent);
        if descriptor.body().is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        for (name, value) in descriptor.headers() {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::Request(format!("invalid header name '{name}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::Request(format!("invalid value for header '{name}': {e}")))?;
            headers.insert(name, value);
        }

        let mut builder = self
            .http_client
            .request(descriptor.method().clone(), url)
            .headers(headers)
            .timeout(descriptor.timeout_duration());
        if let Some(body) = descriptor.body() {
            builder = builder.body(serde_json::to_vec(body)?);
        }
        builder
            .build()
            .map_err(|e| Error::Request(format!("failed to build {}: {e}", descriptor.label())))
    }
}

fn decode_component(raw: &str) -> Result<String, Error> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| Error::Request(format!("invalid query component '{raw}': {e}")))
}
