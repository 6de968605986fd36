#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use petcare_client::retry::{SleepFuture, Sleeper};
use petcare_client::token::HookFuture;
use petcare_client::{ApiClient, ClientConfig, InMemorySession, SessionStore, TokenPair};
use wiremock::MockServer;

static INIT: Once = Once::new();

pub fn init_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct Pet {
    pub id: String,
    pub name: String,
}

pub fn pet_json(id: &str) -> serde_json::Value {
    serde_json::json!({ "id": id, "name": "Biscuit", "species": "dog" })
}

pub fn token_json(access: &str, refresh: &str) -> serde_json::Value {
    serde_json::json!({ "accessToken": access, "refreshToken": refresh })
}

#[derive(Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, delay: Duration) -> SleepFuture {
        self.delays.lock().unwrap().push(delay);
        Box::pin(async {})
    }
}

/// In-memory session that also counts profile refresh hooks.
pub struct TrackingSession {
    pub inner: InMemorySession,
    pub profile_refreshes: AtomicUsize,
}

impl TrackingSession {
    pub fn new(access: &str, refresh: &str) -> Self {
        Self {
            inner: InMemorySession::new(TokenPair::new(access, refresh)),
            profile_refreshes: AtomicUsize::new(0),
        }
    }

    pub fn profile_refresh_count(&self) -> usize {
        self.profile_refreshes.load(Ordering::SeqCst)
    }
}

impl SessionStore for TrackingSession {
    fn current_access_token(&self) -> Option<String> {
        self.inner.current_access_token()
    }

    fn current_refresh_token(&self) -> Option<String> {
        self.inner.current_refresh_token()
    }

    fn replace_tokens(&self, tokens: TokenPair) {
        self.inner.replace_tokens(tokens);
    }

    fn invalidate_session(&self) {
        self.inner.invalidate_session();
    }

    fn refresh_user_profile(self: Arc<Self>) -> HookFuture {
        Box::pin(async move {
            self.profile_refreshes.fetch_add(1, Ordering::SeqCst);
        })
    }
}

pub struct Harness {
    pub client: ApiClient,
    pub session: Arc<TrackingSession>,
    pub sleeper: Arc<RecordingSleeper>,
}

pub fn harness(server: &MockServer) -> Harness {
    harness_with(ClientConfig::from_values(
        server.uri(),
        None,
        Some(5),
        Some(3),
        Some(50),
    ))
}

pub fn harness_with(config: ClientConfig) -> Harness {
    init_logging();
    let session = Arc::new(TrackingSession::new("old-access", "r1"));
    let sleeper = Arc::new(RecordingSleeper::default());
    let client = ApiClient::builder(config, session.clone())
        .sleeper(sleeper.clone())
        .build()
        .expect("client builds");
    Harness {
        client,
        session,
        sleeper,
    }
}
