//! Authenticated request pipeline for the petcare mobile backend.
//!
//! Every outbound call goes through [`RequestExecutor`]: it builds the request
//! from a [`RequestDescriptor`], retries transient failures with exponential
//! backoff, and on an expired access token asks the shared
//! [`RefreshCoordinator`] for new credentials before replaying once.

pub mod assistant;
pub mod classify;
pub mod client;
pub mod config;
pub mod descriptor;
pub mod errors;
pub mod executor;
pub mod request_context;
pub mod retry;
pub mod telemetry;
pub mod token;
pub mod types;

pub use assistant::AssistantClient;
pub use client::ApiClient;
pub use config::ClientConfig;
pub use descriptor::RequestDescriptor;
pub use errors::{Error, ErrorClass};
pub use executor::RequestExecutor;
pub use token::{InMemorySession, RefreshCoordinator, SessionStore, TokenPair};
pub use types::NoContent;

#[cfg(test)]
mod tests;
