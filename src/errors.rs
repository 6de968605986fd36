use std::time::Duration;

use reqwest::StatusCode;

use crate::classify::TransportKind;

/// Failure families surfaced to callers, used to decide presentation and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    TransientTransport,
    TerminalTransport,
    TransientServer,
    AuthExpired,
    TerminalClient,
    TerminalServer,
    DecodeFailure,
    RefreshFailure,
    /// Raised before anything reached the network (bad config, bad descriptor, local limits).
    Local,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{kind}: {message}")]
    Transport { kind: TransportKind, message: String },
    #[error("HTTP {status}: {body}")]
    Http { status: StatusCode, body: String },
    #[error("unauthorized after token refresh: {body}")]
    Unauthorized { body: String },
    #[error("token refresh failed: {message}")]
    RefreshFailed { message: String },
    #[error("failed to decode response (HTTP {status}): {message}")]
    Decode { status: StatusCode, message: String },
    #[error("invalid request: {0}")]
    Request(String),
    #[error("rate limited, retry after {0:?}")]
    RateLimited(Duration),
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::Transport { kind, .. } if kind.is_transient() => ErrorClass::TransientTransport,
            Error::Transport { .. } => ErrorClass::TerminalTransport,
            Error::Http { status, .. } => match status.as_u16() {
                502..=504 => ErrorClass::TransientServer,
                500..=599 => ErrorClass::TerminalServer,
                _ => ErrorClass::TerminalClient,
            },
            Error::Unauthorized { .. } => ErrorClass::AuthExpired,
            Error::RefreshFailed { .. } => ErrorClass::RefreshFailure,
            Error::Decode { .. } => ErrorClass::DecodeFailure,
            Error::Request(_)
            | Error::RateLimited(_)
            | Error::Config(_)
            | Error::Io(_)
            | Error::Json(_) => ErrorClass::Local,
        }
    }

    /// Terminal auth errors: the session is gone or the server keeps rejecting fresh tokens.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            Error::Unauthorized { .. } | Error::RefreshFailed { .. }
        )
    }

    pub fn http_status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } | Error::Decode { status, .. } => Some(status.as_u16()),
            Error::Unauthorized { .. } | Error::RefreshFailed { .. } => {
                Some(StatusCode::UNAUTHORIZED.as_u16())
            }
            _ => None,
        }
    }

    /// The raw message carried by the error: the server body for HTTP failures.
    pub fn message(&self) -> String {
        match self {
            Error::Transport { message, .. }
            | Error::RefreshFailed { message }
            | Error::Decode { message, .. } => message.clone(),
            Error::Http { body, .. } | Error::Unauthorized { body } => body.clone(),
            other => other.to_string(),
        }
    }

    /// Short text suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            Error::Transport { kind, .. } => kind.user_message().to_string(),
            Error::Http { status, body } => server_message(body)
                .unwrap_or_else(|| synthesized_status_message(*status)),
            Error::Unauthorized { .. } | Error::RefreshFailed { .. } => {
                "Your session has expired. Please sign in again.".to_string()
            }
            Error::RateLimited(_) => "Too many requests. Please wait a moment.".to_string(),
            other => other.to_string(),
        }
    }
}

/// Body text for a non-2xx response; falls back to `HTTP <status>` when empty or not UTF-8.
pub(crate) fn error_body(status: StatusCode, body: &[u8]) -> String {
    match std::str::from_utf8(body) {
        Ok(text) if !text.trim().is_empty() => text.to_string(),
        _ => synthesized_status_message(status),
    }
}

fn synthesized_status_message(status: StatusCode) -> String {
    format!("HTTP {}", status.as_u16())
}

fn server_message(body: &str) -> Option<String> {
    if body.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => ["message", "error", "detail"]
            .iter()
            .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
            .map(str::to_string)
            .or_else(|| Some(body.to_string())),
        Err(_) => Some(body.to_string()),
    }
}
