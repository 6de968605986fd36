use std::sync::Arc;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::classify::{Disposition, TransportKind, classify_status, classify_transport};
use crate::descriptor::RequestDescriptor;
use crate::errors::{Error, error_body};
use crate::request_context::RequestDispatchContext;
use crate::retry::{RetryOutcome, RetryPlan};
use crate::token::RefreshCoordinator;
use crate::types::NoContent;

/// 2xx status plus the raw body, before decoding.
struct SuccessBody {
    status: StatusCode,
    body: Vec<u8>,
}

/// Per-request bookkeeping; lives only for one call to `run`.
struct Attempts {
    count: u32,
    /// Enforces the single refresh replay. The replay also takes a slot of `count`.
    refreshed: bool,
    started: Instant,
}

/// Runs logical requests: send, classify, refresh-and-replay, back off, decode.
///
/// The executor holds no shared mutable state of its own. Token refresh is
/// delegated to the [`RefreshCoordinator`]; an executor built without one
/// treats an expired token as a terminal failure.
#[derive(Clone)]
pub struct RequestExecutor {
    context: Arc<RequestDispatchContext>,
    coordinator: Option<RefreshCoordinator>,
}

impl RequestExecutor {
    pub fn new(context: Arc<RequestDispatchContext>, coordinator: RefreshCoordinator) -> Self {
        Self {
            context,
            coordinator: Some(coordinator),
        }
    }

    /// Executor that never consults a refresh coordinator.
    pub fn without_refresh(context: Arc<RequestDispatchContext>) -> Self {
        Self {
            context,
            coordinator: None,
        }
    }

    pub fn context(&self) -> &RequestDispatchContext {
        &self.context
    }

    /// Executes `descriptor` and decodes a JSON body into `T`.
    ///
    /// A body that does not match `T` yields [`Error::Decode`]; decode failures
    /// are never retried.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<T, Error> {
        let success = self.run(descriptor).await?;
        serde_json::from_slice(&success.body).map_err(|e| {
            warn!(
                operation = %descriptor.label(),
                status = success.status.as_u16(),
                error = %e,
                "response.decode_failed"
            );
            Error::Decode {
                status: success.status,
                message: e.to_string(),
            }
        })
    }

    /// Executes `descriptor` for an endpoint that answers with an empty body.
    pub async fn execute_no_content(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<NoContent, Error> {
        self.run(descriptor).await.map(|_| NoContent)
    }

    async fn run(&self, descriptor: &RequestDescriptor) -> Result<SuccessBody, Error> {
        let plan = self.context.plan_for(descriptor);
        let mut attempts = Attempts {
            count: 0,
            refreshed: false,
            started: Instant::now(),
        };
        let result = self.drive(descriptor, &plan, &mut attempts).await;
        RetryOutcome {
            operation: descriptor.label(),
            attempts: attempts.count + 1,
            refreshed: attempts.refreshed,
            success: result.is_ok(),
            total_delay: attempts.started.elapsed(),
        }
        .log();
        result
    }

    async fn drive(
        &self,
        descriptor: &RequestDescriptor,
        plan: &RetryPlan,
        attempts: &mut Attempts,
    ) -> Result<SuccessBody, Error> {
        let mut current = descriptor.clone();
        loop {
            let request = self.context.build_request(&current)?;
            debug!(
                operation = %current.label(),
                attempt = attempts.count,
                "request.send"
            );

            let response = match self.context.http_client().execute(request).await {
                Ok(response) => response,
                Err(err) => {
                    let kind = TransportKind::from_reqwest(&err);
                    if classify_transport(kind).is_retryable() && plan.should_retry(attempts.count) {
                        self.back_off(&current, plan, attempts, &format!("{kind}: {err}"))
                            .await;
                        continue;
                    }
                    return Err(Error::Transport {
                        kind,
                        message: err.to_string(),
                    });
                }
            };

            let status = response.status();
            match classify_status(status, &current, self.context.refresh_path()) {
                Disposition::Success => match response.bytes().await {
                    Ok(body) => {
                        return Ok(SuccessBody {
                            status,
                            body: body.to_vec(),
                        });
                    }
                    Err(err) => {
                        let kind = TransportKind::from_reqwest(&err);
                        if classify_transport(kind).is_retryable()
                            && plan.should_retry(attempts.count)
                        {
                            self.back_off(&current, plan, attempts, &format!("{kind}: {err}"))
                                .await;
                            continue;
                        }
                        return Err(Error::Transport {
                            kind,
                            message: err.to_string(),
                        });
                    }
                },
                Disposition::AuthExpired => {
                    let body = read_error_body(status, response).await;
                    warn!(
                        operation = %current.label(),
                        status = status.as_u16(),
                        attempt = attempts.count,
                        replayed = attempts.refreshed,
                        "auth.expired"
                    );
                    if attempts.refreshed {
                        return Err(Error::Unauthorized { body });
                    }
                    let Some(coordinator) = self.coordinator.as_ref() else {
                        return Err(Error::Unauthorized { body });
                    };
                    match coordinator.refresh().await {
                        Some(tokens) => {
                            attempts.refreshed = true;
                            attempts.count += 1;
                            current = current.with_bearer(&tokens.access_token);
                        }
                        None => {
                            return Err(Error::RefreshFailed {
                                message: format!(
                                    "could not refresh credentials for {}",
                                    current.label()
                                ),
                            });
                        }
                    }
                }
                Disposition::RetryableStatus if plan.should_retry(attempts.count) => {
                    let body = read_error_body(status, response).await;
                    self.back_off(&current, plan, attempts, &format!("HTTP {status}: {body}"))
                        .await;
                }
                _ => {
                    let body = read_error_body(status, response).await;
                    return Err(Error::Http { status, body });
                }
            }
        }
    }

    async fn back_off(
        &self,
        descriptor: &RequestDescriptor,
        plan: &RetryPlan,
        attempts: &mut Attempts,
        cause: &str,
    ) {
        let delay = self.context.backoff_delay(plan, attempts.count + 1).await;
        warn!(
            operation = %descriptor.label(),
            attempt = attempts.count,
            max_retries = plan.max_retries,
            delay_ms = delay.as_millis() as u64,
            error = %cause,
            "retry.scheduling"
        );
        self.context.sleeper().sleep(delay).await;
        attempts.count += 1;
    }
}

async fn read_error_body(status: StatusCode, response: reqwest::Response) -> String {
    match response.bytes().await {
        Ok(bytes) => error_body(status, &bytes),
        Err(_) => error_body(status, &[]),
    }
}
