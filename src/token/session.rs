use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::watch;
use tracing::info;

use super::TokenPair;

pub type HookFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Credential/session collaborator consumed by the request pipeline.
///
/// Implementations own the token pair and its storage. The pipeline only reads
/// the current tokens, writes a refreshed pair back, and asks for the session
/// to be dropped when a refresh fails.
pub trait SessionStore: Send + Sync {
    fn current_access_token(&self) -> Option<String>;

    fn current_refresh_token(&self) -> Option<String>;

    fn replace_tokens(&self, tokens: TokenPair);

    /// Drops local credentials. Called once per failed refresh round.
    fn invalidate_session(&self);

    /// Fire-and-forget hook run after a successful refresh; never awaited by callers.
    fn refresh_user_profile(self: Arc<Self>) -> HookFuture {
        Box::pin(async {})
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    SignedIn,
    SignedOut,
}

/// Process-local session store.
///
/// Publishes [`SessionState`] changes on a watch channel so a presentation
/// layer can route to a signed-out screen after a failed refresh.
pub struct InMemorySession {
    tokens: RwLock<Option<TokenPair>>,
    state: watch::Sender<SessionState>,
    invalidations: AtomicUsize,
    replacements: AtomicUsize,
}

impl InMemorySession {
    pub fn new(tokens: TokenPair) -> Self {
        Self::with_tokens(Some(tokens))
    }

    pub fn signed_out() -> Self {
        Self::with_tokens(None)
    }

    fn with_tokens(tokens: Option<TokenPair>) -> Self {
        let initial = if tokens.is_some() {
            SessionState::SignedIn
        } else {
            SessionState::SignedOut
        };
        let (state, _) = watch::channel(initial);
        Self {
            tokens: RwLock::new(tokens),
            state,
            invalidations: AtomicUsize::new(0),
            replacements: AtomicUsize::new(0),
        }
    }

    /// Stores tokens obtained from a login flow.
    pub fn sign_in(&self, tokens: TokenPair) {
        self.replace_tokens(tokens);
    }

    pub fn tokens(&self) -> Option<TokenPair> {
        self.read().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn invalidation_count(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }

    pub fn replacement_count(&self) -> usize {
        self.replacements.load(Ordering::SeqCst)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<TokenPair>> {
        self.tokens
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<TokenPair>> {
        self.tokens
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl SessionStore for InMemorySession {
    fn current_access_token(&self) -> Option<String> {
        self.read().as_ref().map(|t| t.access_token.clone())
    }

    fn current_refresh_token(&self) -> Option<String> {
        self.read().as_ref().map(|t| t.refresh_token.clone())
    }

    fn replace_tokens(&self, tokens: TokenPair) {
        *self.write() = Some(tokens);
        self.replacements.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(SessionState::SignedIn);
    }

    fn invalidate_session(&self) {
        self.write().take();
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(SessionState::SignedOut);
        info!("session.invalidated");
    }
}
