//! HTTP server: router, shared state, and request handlers
//!
//! All endpoints live under `/api`. Conversation CRUD speaks JSON; the
//! chat endpoint streams SSE. Error bodies are `{"error": "..."}` with a
//! descriptive message.

use crate::config::Config;
use crate::conversations::ConversationStore;
use crate::providers::ChatProvider;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;

pub mod chat;
pub mod conversations;
pub mod rate_limit;

pub use rate_limit::SaveRateLimiter;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: ConversationStore,
    pub provider: Arc<dyn ChatProvider>,
    pub config: Arc<Config>,
    pub rate_limiter: SaveRateLimiter,
}

impl AppState {
    /// Assemble handler state from its parts
    pub fn new(config: Config, store: ConversationStore, provider: Arc<dyn ChatProvider>) -> Self {
        let rate_limiter =
            SaveRateLimiter::new(Duration::from_millis(config.chat.save_rate_limit_ms));
        Self {
            store,
            provider,
            config: Arc::new(config),
            rate_limiter,
        }
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat::chat))
        .route("/api/conversations/list", get(conversations::list))
        .route("/api/conversations/save", post(conversations::save))
        .route(
            "/api/conversations/clear-all",
            post(conversations::clear_all),
        )
        .route(
            "/api/conversations/:id",
            get(conversations::get_one).delete(conversations::delete_one),
        )
        .with_state(state)
}
