mod coordinator;
mod pair;
mod session;

pub use coordinator::{RefreshCoordinator, RefreshFuture};
pub(crate) use pair::RefreshRequest;
pub use pair::TokenPair;
pub use session::{HookFuture, InMemorySession, SessionState, SessionStore};
