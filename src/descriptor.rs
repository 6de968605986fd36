use std::time::Duration;

use reqwest::Method;
use serde::Serialize;

use crate::errors::Error;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Declarative description of one logical request.
///
/// Builder methods consume and return the descriptor; once handed to the
/// executor it is never mutated. Replays after a token refresh work on a copy
/// produced by [`RequestDescriptor::with_bearer`].
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
    body: Option<serde_json::Value>,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
    skip_auto_refresh: bool,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: None,
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            skip_auto_refresh: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Sets a header, replacing any earlier value with the same (case-insensitive) name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {token}"))
    }

    pub fn json<B: Serialize + ?Sized>(self, body: &B) -> Result<Self, Error> {
        let value = serde_json::to_value(body)?;
        Ok(self.json_value(value))
    }

    pub fn json_value(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Number of retries allowed after the first send (0 disables retrying).
    pub fn retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn retry_delay(mut self, base_delay: Duration) -> Self {
        self.retry_delay = base_delay;
        self
    }

    /// Marks the request as never triggering a token refresh on 401.
    pub fn skip_auto_refresh(mut self) -> Self {
        self.skip_auto_refresh = true;
        self
    }

    /// Copy of this descriptor carrying a new access token.
    pub fn with_bearer(&self, token: &str) -> Self {
        self.clone().bearer(token)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Full path as supplied, inline query string included.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path with any inline query string removed.
    pub fn route(&self) -> &str {
        self.split_path().0
    }

    pub(crate) fn split_path(&self) -> (&str, Option<&str>) {
        match self.path.split_once('?') {
            Some((route, query)) => (route, Some(query)),
            None => (self.path.as_str(), None),
        }
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    pub fn timeout_duration(&self) -> Duration {
        self.timeout
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn base_retry_delay(&self) -> Duration {
        self.retry_delay
    }

    pub fn skips_auto_refresh(&self) -> bool {
        self.skip_auto_refresh
    }

    /// `METHOD /route`, used as the operation label in logs.
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.route())
    }
}
