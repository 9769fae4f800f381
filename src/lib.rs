//! Chat Relay
//!
//! A small in-memory messaging backend. Clients post text messages tagged
//! with a session identifier and can list, rename and delete sessions over a
//! JSON HTTP API.
//!
//! # Architecture
//!
//! - **Store**: Lock-guarded map of sessions with a store-wide message counter
//! - **API**: Axum handlers translating JSON requests into store calls
//! - **Server**: Router assembly, CORS, tracing and timeout middleware
//!
//! # Modules
//!
//! - [`session`]: Session store, messages and summaries
//! - [`api`]: HTTP handlers and error mapping
//! - [`config`]: Layered configuration (defaults, file, env, CLI)
//! - [`server`]: Router construction and startup
//! - [`telemetry`]: Logging setup

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::unused_async)]

pub mod api;
pub mod config;
pub mod server;
pub mod session;
pub mod telemetry;

use crate::config::AppConfig;

use session::SessionStore;
use std::sync::Arc;

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Session store for all conversations.
    pub sessions: SessionStore,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Create state with a fresh, empty store.
    #[must_use]
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self::with_store(config, SessionStore::new())
    }

    /// Create state around an existing store.
    #[must_use]
    pub fn with_store(config: Arc<AppConfig>, sessions: SessionStore) -> Self {
        Self { sessions, config }
    }
}
