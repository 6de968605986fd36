//! Client configuration, read from a JSON file, the environment, or explicit values.

use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;

use crate::descriptor::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY, DEFAULT_TIMEOUT};
use crate::errors::Error;
use crate::retry::JitterStrategy;

pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub refresh_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default)]
    pub retry_max_delay_ms: Option<u64>,
    #[serde(default)]
    pub jitter: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_refresh_path() -> String {
    DEFAULT_REFRESH_PATH.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY.as_millis() as u64
}

impl ClientConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: ClientConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// # ENV Vars
    /// * `PETCARE_API_URL` - Base URL of the backend (required)
    /// * `PETCARE_REFRESH_PATH` - Token refresh endpoint path
    /// * `PETCARE_TIMEOUT_SECS` - Default per-request timeout
    /// * `PETCARE_MAX_RETRIES` - Default retry count for transient failures
    /// * `PETCARE_RETRY_DELAY_MS` - Base backoff delay
    /// * `PETCARE_RETRY_MAX_DELAY_MS` - Optional backoff cap
    /// * `PETCARE_JITTER` - `none`, `full` or `decorrelated`
    pub fn from_env() -> Result<Self, Error> {
        let base_url = std::env::var("PETCARE_API_URL")
            .map_err(|_| Error::Config("Missing PETCARE_API_URL env var".to_string()))?;
        let mut config = Self::from_values(base_url, None, None, None, None);
        if let Ok(path) = std::env::var("PETCARE_REFRESH_PATH") {
            config.refresh_path = path;
        }
        if let Some(secs) = parse_env::<u64>("PETCARE_TIMEOUT_SECS")? {
            config.request_timeout_secs = secs;
            config.refresh_timeout_secs = secs;
        }
        if let Some(retries) = parse_env::<u32>("PETCARE_MAX_RETRIES")? {
            config.max_retries = retries;
        }
        if let Some(delay) = parse_env::<u64>("PETCARE_RETRY_DELAY_MS")? {
            config.retry_delay_ms = delay;
        }
        config.retry_max_delay_ms = parse_env::<u64>("PETCARE_RETRY_MAX_DELAY_MS")?;
        config.jitter = std::env::var("PETCARE_JITTER").ok();
        config.validate()?;
        Ok(config)
    }

    pub fn from_values(
        base_url: impl Into<String>,
        refresh_path: Option<String>,
        request_timeout_secs: Option<u64>,
        max_retries: Option<u32>,
        retry_delay_ms: Option<u64>,
    ) -> Self {
        let timeout = request_timeout_secs.unwrap_or_else(default_timeout_secs);
        Self {
            base_url: base_url.into(),
            refresh_path: refresh_path.unwrap_or_else(default_refresh_path),
            request_timeout_secs: timeout,
            refresh_timeout_secs: timeout,
            max_retries: max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            retry_delay_ms: retry_delay_ms.unwrap_or_else(default_retry_delay_ms),
            retry_max_delay_ms: None,
            jitter: None,
            user_agent: None,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.parsed_base_url()?;
        if !self.refresh_path.starts_with('/') {
            return Err(Error::Config(format!(
                "Refresh path '{}' must start with '/'",
                self.refresh_path
            )));
        }
        if self.request_timeout_secs == 0 || self.refresh_timeout_secs == 0 {
            return Err(Error::Config("Timeouts must be > 0".into()));
        }
        self.jitter_strategy()?;
        Ok(())
    }

    pub fn parsed_base_url(&self) -> Result<Url, Error> {
        let raw = if self.base_url.starts_with("http") {
            self.base_url.clone()
        } else {
            format!("https://{}", self.base_url)
        };
        Url::parse(&raw)
            .map_err(|e| Error::Config(format!("Invalid base URL '{}': {}", self.base_url, e)))
    }

    pub fn jitter_strategy(&self) -> Result<JitterStrategy, Error> {
        match self.jitter.as_deref() {
            Some(raw) => raw.parse(),
            None => Ok(JitterStrategy::None),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn retry_max_delay(&self) -> Option<Duration> {
        self.retry_max_delay_ms.map(Duration::from_millis)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>, Error> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("Invalid value '{raw}' for {name}"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn reads_file_with_defaults() {
        let mut path = std::env::temp_dir();
        path.push(format!("petcare-config-{}.json", std::process::id()));
        fs::write(
            &path,
            r#"{ "baseUrl": "https://api.example.com/v2", "maxRetries": 5, "jitter": "full" }"#,
        )
        .unwrap();

        let config = ClientConfig::from_file(&path).expect("config loads");
        fs::remove_file(&path).ok();

        assert_eq!(config.max_retries, 5);
        assert_eq!(config.refresh_path, DEFAULT_REFRESH_PATH);
        assert_eq!(config.request_timeout(), DEFAULT_TIMEOUT);
        assert_eq!(config.retry_delay(), DEFAULT_RETRY_DELAY);
        assert_eq!(config.jitter_strategy().unwrap(), JitterStrategy::Full);
        assert_eq!(
            config.parsed_base_url().unwrap().as_str(),
            "https://api.example.com/v2"
        );
    }

    #[test]
    fn schemeless_base_url_gets_https() {
        let config = ClientConfig::from_values("api.example.com", None, None, None, None);
        assert_eq!(
            config.parsed_base_url().unwrap().as_str(),
            "https://api.example.com/"
        );
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = ClientConfig::from_values("https://api.example.com", None, None, None, None);
        config.refresh_path = "auth/refresh".into();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = ClientConfig::from_values("https://api.example.com", None, None, None, None);
        config.jitter = Some("sometimes".into());
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = ClientConfig::from_values("http://[::1", None, None, None, None);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
