//! Shared fixtures for integration tests

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use aerin::config::Config;
use aerin::conversations::ConversationStore;
use aerin::error::Result;
use aerin::providers::{ChatProvider, ChatRequest, EventStream, StreamEvent};
use aerin::server::{build_router, AppState};
use aerin::storage::FileSystemStorage;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::Router;
use futures::StreamExt;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;

/// Provider that replays a scripted event sequence
pub struct MockProvider {
    events: Vec<StreamEvent>,
}

impl MockProvider {
    pub fn new(events: Vec<StreamEvent>) -> Self {
        Self { events }
    }

    pub fn finish_only() -> Self {
        Self::new(vec![StreamEvent::Finish])
    }
}

#[async_trait]
impl ChatProvider for MockProvider {
    async fn stream_chat(&self, _request: ChatRequest) -> Result<EventStream> {
        let events: Vec<Result<StreamEvent>> = self.events.iter().cloned().map(Ok).collect();
        Ok(futures::stream::iter(events).boxed())
    }
}

/// Test config with a short save window
pub fn test_config(save_rate_limit_ms: u64) -> Config {
    let mut config = Config::default();
    config.chat.save_rate_limit_ms = save_rate_limit_ms;
    config
}

/// Router over a tempdir-backed store and the given provider
pub fn test_router(
    dir: &tempfile::TempDir,
    provider: Arc<dyn ChatProvider>,
    config: Config,
) -> Router {
    let store = ConversationStore::new(Arc::new(FileSystemStorage::new(dir.path())));
    build_router(AppState::new(config, store, provider))
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request build failed")
}

pub fn get_request(uri: &str, user_id: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(user_id) = user_id {
        builder = builder.header("x-user-id", user_id);
    }
    builder.body(Body::empty()).expect("request build failed")
}

pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body is not JSON")
}

pub async fn response_text(response: axum::response::Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    String::from_utf8_lossy(&bytes).to_string()
}
