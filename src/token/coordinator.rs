use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use tokio::sync::{Mutex, watch};

use crate::descriptor::RequestDescriptor;
use crate::errors::Error;
use crate::executor::RequestExecutor;
use crate::request_context::RequestDispatchContext;
use crate::telemetry::refresh::{RefreshTelemetry, emit_aborted, emit_join, emit_no_session};

use super::{RefreshRequest, SessionStore, TokenPair};

/// `None` while the round is running, then the round's result.
type RoundState = Option<Option<TokenPair>>;

pub type RefreshFuture<'a> = Pin<Box<dyn Future<Output = Option<TokenPair>> + Send + 'a>>;

/// Single-flight access-token refresh shared by every executor of a client.
///
/// At most one refresh call is in flight at a time. Callers that hit a 401
/// while a round is running join that round and all receive its result. The
/// round itself runs on a detached task, so a joiner that is cancelled or
/// times out never cancels the refresh for the others. A round that panics
/// counts as a failed refresh: the session is invalidated and the slot is
/// freed for the next 401.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    executor: RequestExecutor,
    session: Arc<dyn SessionStore>,
    refresh_path: String,
    timeout: Duration,
    current: Mutex<Option<watch::Receiver<RoundState>>>,
    rounds: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new(
        context: Arc<RequestDispatchContext>,
        session: Arc<dyn SessionStore>,
        timeout: Duration,
    ) -> Self {
        let refresh_path = context.refresh_path().to_string();
        Self {
            inner: Arc::new(CoordinatorInner {
                executor: RequestExecutor::without_refresh(context),
                session,
                refresh_path,
                timeout,
                current: Mutex::new(None),
                rounds: AtomicU64::new(0),
            }),
        }
    }

    /// Refreshes the token pair, or joins the round already in flight.
    ///
    /// Returns `None` when there is no session to refresh or the refresh call
    /// failed; in the latter case the session has already been invalidated.
    ///
    /// The future is boxed because the round itself goes through a
    /// [`RequestExecutor`], whose future in turn awaits this one.
    pub fn refresh(&self) -> RefreshFuture<'_> {
        Box::pin(self.join_or_start())
    }

    async fn join_or_start(&self) -> Option<TokenPair> {
        let mut round = {
            let mut current = self.inner.current.lock().await;
            match current.as_ref() {
                Some(existing) => {
                    emit_join(&self.inner.refresh_path);
                    existing.clone()
                }
                None => {
                    let Some(refresh_token) = self.inner.session.current_refresh_token() else {
                        emit_no_session(&self.inner.refresh_path);
                        return None;
                    };
                    let (sender, receiver) = watch::channel(None);
                    *current = Some(receiver.clone());
                    let inner = Arc::clone(&self.inner);
                    tokio::spawn(async move {
                        let worker = Arc::clone(&inner);
                        let round =
                            tokio::spawn(async move { worker.run_round(&refresh_token).await });
                        let result = match round.await {
                            Ok(result) => result,
                            Err(err) => {
                                emit_aborted(&inner.refresh_path, &err);
                                inner.session.invalidate_session();
                                None
                            }
                        };
                        inner.current.lock().await.take();
                        sender.send_replace(Some(result));
                    });
                    receiver
                }
            }
        };

        let result = match round.wait_for(Option::is_some).await {
            Ok(state) => state.clone().flatten(),
            // The round task went away without publishing a result.
            Err(_) => None,
        };
        result
    }

    /// Number of refresh rounds started so far.
    pub fn rounds(&self) -> u64 {
        self.inner.rounds.load(Ordering::SeqCst)
    }

    pub async fn in_flight(&self) -> bool {
        self.inner.current.lock().await.is_some()
    }
}

impl CoordinatorInner {
    /// The refresh call never refreshes itself and never retries.
    fn refresh_descriptor(&self, refresh_token: &str) -> Result<RequestDescriptor, Error> {
        Ok(RequestDescriptor::post(self.refresh_path.clone())
            .bearer(refresh_token)
            .json(&RefreshRequest { refresh_token })?
            .timeout(self.timeout)
            .retries(0)
            .skip_auto_refresh())
    }

    async fn run_round(&self, refresh_token: &str) -> Option<TokenPair> {
        self.rounds.fetch_add(1, Ordering::SeqCst);
        let telemetry = RefreshTelemetry::new(self.refresh_path.clone());
        telemetry.emit_start(SystemTime::now());

        let outcome = match self.refresh_descriptor(refresh_token) {
            Ok(descriptor) => self.executor.execute::<TokenPair>(&descriptor).await,
            Err(err) => Err(err),
        };

        match outcome {
            Ok(tokens) => {
                self.session.replace_tokens(tokens.clone());
                telemetry.emit_success(SystemTime::now());
                tokio::spawn(Arc::clone(&self.session).refresh_user_profile());
                Some(tokens)
            }
            Err(err) => {
                telemetry.emit_failure(&err, SystemTime::now());
                self.session.invalidate_session();
                None
            }
        }
    }
}
