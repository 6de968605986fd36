//! Maps HTTP statuses and transport failures onto retry dispositions.
//!
//! This is the only place that decides retry and refresh eligibility; the
//! executor acts on the returned [`Disposition`] and nothing else.

use std::error::Error as StdError;
use std::fmt;
use std::io;

use reqwest::StatusCode;

use crate::descriptor::RequestDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Success,
    AuthExpired,
    RetryableStatus,
    TerminalStatus,
    RetryableTransport,
    TerminalTransport,
}

impl Disposition {
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Disposition::RetryableStatus | Disposition::RetryableTransport
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Timeout,
    Dns,
    Unreachable,
    ConnectionLost,
    Malformed,
    Other,
}

impl TransportKind {
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            TransportKind::Timeout
                | TransportKind::Dns
                | TransportKind::Unreachable
                | TransportKind::ConnectionLost
        )
    }

    pub fn user_message(self) -> &'static str {
        match self {
            TransportKind::Timeout => "The request timed out.",
            TransportKind::Dns | TransportKind::ConnectionLost => {
                "You appear to be offline."
            }
            TransportKind::Unreachable => "The server is unreachable.",
            TransportKind::Malformed => "The server sent an invalid response.",
            TransportKind::Other => "A network error occurred.",
        }
    }

    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            return TransportKind::Timeout;
        }
        if let Some(kind) = Self::from_source_chain(err) {
            return kind;
        }
        if err.is_connect() {
            return TransportKind::Unreachable;
        }
        if err.is_decode() || err.is_body() {
            return TransportKind::Malformed;
        }
        TransportKind::Other
    }

    /// Looks through an error and its sources for a known network cause.
    fn from_source_chain(err: &(dyn StdError + 'static)) -> Option<Self> {
        if chain_mentions(err, &["dns error", "failed to lookup address"]) {
            return Some(TransportKind::Dns);
        }
        if let Some(kind) = io_error_kind(err) {
            match kind {
                io::ErrorKind::TimedOut => return Some(TransportKind::Timeout),
                io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::BrokenPipe
                | io::ErrorKind::NotConnected
                | io::ErrorKind::UnexpectedEof => return Some(TransportKind::ConnectionLost),
                io::ErrorKind::ConnectionRefused => return Some(TransportKind::Unreachable),
                _ => {}
            }
        }
        if chain_mentions(
            err,
            &["connection closed before message completed", "connection reset"],
        ) {
            return Some(TransportKind::ConnectionLost);
        }
        None
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Timeout => write!(f, "timeout"),
            TransportKind::Dns => write!(f, "dns_failure"),
            TransportKind::Unreachable => write!(f, "host_unreachable"),
            TransportKind::ConnectionLost => write!(f, "connection_lost"),
            TransportKind::Malformed => write!(f, "malformed_response"),
            TransportKind::Other => write!(f, "transport_error"),
        }
    }
}

fn io_error_kind(err: &(dyn StdError + 'static)) -> Option<io::ErrorKind> {
    let mut source = Some(err);
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return Some(io_err.kind());
        }
        source = cause.source();
    }
    None
}

fn chain_mentions(err: &(dyn StdError + 'static), needles: &[&str]) -> bool {
    let mut source = Some(err);
    while let Some(cause) = source {
        let text = cause.to_string().to_lowercase();
        if needles.iter().any(|needle| text.contains(needle)) {
            return true;
        }
        source = cause.source();
    }
    false
}

/// Classifies a received status for the given logical request.
pub fn classify_status(
    status: StatusCode,
    descriptor: &RequestDescriptor,
    refresh_path: &str,
) -> Disposition {
    if status.is_success() {
        return Disposition::Success;
    }
    match status {
        StatusCode::UNAUTHORIZED
            if !descriptor.skips_auto_refresh()
                && !is_refresh_route(descriptor.route(), refresh_path) =>
        {
            Disposition::AuthExpired
        }
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            Disposition::RetryableStatus
        }
        _ => Disposition::TerminalStatus,
    }
}

pub fn classify_transport(kind: TransportKind) -> Disposition {
    if kind.is_transient() {
        Disposition::RetryableTransport
    } else {
        Disposition::TerminalTransport
    }
}

fn is_refresh_route(route: &str, refresh_path: &str) -> bool {
    route.trim_end_matches('/') == refresh_path.trim_end_matches('/')
}
