//! Conversation endpoint integration tests
//!
//! Drives the router directly with `tower::ServiceExt::oneshot` over a
//! tempdir-backed store, the same way a browser client would call it.

mod common;

use aerin::conversations::ConversationStore;
use aerin::error::{AerinError, Result};
use aerin::server::{build_router, AppState};
use aerin::storage::ObjectStore;
use async_trait::async_trait;
use axum::http::StatusCode;
use axum::Router;
use common::{
    get_request, json_request, response_json, test_config, test_router, MockProvider,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn messages(count: usize) -> Value {
    let items: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "id": format!("m{}", i),
                "role": if i % 2 == 0 { "user" } else { "assistant" },
                "parts": [{"type": "text", "text": format!("Message {}", i)}]
            })
        })
        .collect();
    Value::Array(items)
}

fn save_body(user_id: &str, conversation_id: Option<&str>, count: usize) -> Value {
    json!({
        "userId": user_id,
        "conversationId": conversation_id,
        "messages": messages(count),
    })
}

async fn save_ok(router: &Router, user_id: &str, count: usize) -> String {
    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/conversations/save",
            save_body(user_id, None, count),
        ))
        .await
        .expect("request failed");
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    body["conversationId"]
        .as_str()
        .expect("conversationId missing")
        .to_string()
}

fn no_throttle_router(dir: &tempfile::TempDir) -> Router {
    // Window of 0 is invalid config, so use 1ms and sleep between saves.
    test_router(dir, Arc::new(MockProvider::finish_only()), test_config(1))
}

async fn settle_throttle() {
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
}

#[tokio::test]
async fn test_save_requires_user_id() {
    let dir = tempfile::tempdir().expect("tempdir");
    let router = no_throttle_router(&dir);

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/conversations/save",
            json!({"messages": messages(2)}),
        ))
        .await
        .expect("request failed");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["error"].as_str().expect("error").contains("User ID"));
}

#[tokio::test]
async fn test_save_requires_messages() {
    let dir = tempfile::tempdir().expect("tempdir");
    let router = no_throttle_router(&dir);

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/conversations/save",
            json!({"userId": "u1"}),
        ))
        .await
        .expect("request failed");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_save_rejects_invalid_conversation_id() {
    let dir = tempfile::tempdir().expect("tempdir");
    let router = no_throttle_router(&dir);

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/conversations/save",
            save_body("u1", Some("not-a-uuid"), 2),
        ))
        .await
        .expect("request failed");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oversized_save_is_rejected_without_writing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let router = no_throttle_router(&dir);

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/conversations/save",
            save_body("u1", None, 101),
        ))
        .await
        .expect("request failed");
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    // Nothing reached storage: the listing is still empty.
    let response = router
        .oneshot(get_request("/api/conversations/list", Some("u1")))
        .await
        .expect("request failed");
    let body = response_json(response).await;
    assert_eq!(body["total"], 0);
    assert!(!dir.path().join("conversations").exists());
}

#[tokio::test]
async fn test_save_at_limit_is_accepted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let router = no_throttle_router(&dir);
    save_ok(&router, "u1", 100).await;
}

#[tokio::test]
async fn test_save_throttle_rejects_then_admits() {
    let dir = tempfile::tempdir().expect("tempdir");
    let router = test_router(
        &dir,
        Arc::new(MockProvider::finish_only()),
        test_config(100),
    );

    save_ok(&router, "u1", 2).await;

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/conversations/save",
            save_body("u1", None, 2),
        ))
        .await
        .expect("request failed");
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    tokio::time::sleep(std::time::Duration::from_millis(120)).await;
    save_ok(&router, "u1", 2).await;
}

#[tokio::test]
async fn test_save_then_get_roundtrip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let router = no_throttle_router(&dir);

    let id = save_ok(&router, "u1", 2).await;

    let response = router
        .oneshot(get_request(
            &format!("/api/conversations/{}", id),
            Some("u1"),
        ))
        .await
        .expect("request failed");
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["conversation"]["metadata"]["id"], id.as_str());
    assert_eq!(body["conversation"]["metadata"]["userId"], "u1");
    assert_eq!(body["conversation"]["messages"][0]["parts"][0]["text"], "Message 0");
}

#[tokio::test]
async fn test_get_requires_user_header() {
    let dir = tempfile::tempdir().expect("tempdir");
    let router = no_throttle_router(&dir);
    let id = save_ok(&router, "u1", 2).await;

    let response = router
        .oneshot(get_request(&format!("/api/conversations/{}", id), None))
        .await
        .expect("request failed");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_get_rejects_invalid_uuid() {
    let dir = tempfile::tempdir().expect("tempdir");
    let router = no_throttle_router(&dir);

    let response = router
        .oneshot(get_request("/api/conversations/not-a-uuid", Some("u1")))
        .await
        .expect("request failed");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_other_users_conversation_reads_as_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let router = no_throttle_router(&dir);
    let id = save_ok(&router, "owner", 2).await;

    let response = router
        .oneshot(get_request(
            &format!("/api/conversations/{}", id),
            Some("intruder"),
        ))
        .await
        .expect("request failed");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_without_header_is_empty_ok() {
    let dir = tempfile::tempdir().expect("tempdir");
    let router = no_throttle_router(&dir);

    let response = router
        .oneshot(get_request("/api/conversations/list", None))
        .await
        .expect("request failed");
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["total"], 0);
    assert_eq!(body["conversations"], json!([]));
}

#[tokio::test]
async fn test_list_orders_most_recent_first() {
    let dir = tempfile::tempdir().expect("tempdir");
    let router = no_throttle_router(&dir);

    let first = save_ok(&router, "u1", 2).await;
    settle_throttle().await;
    let second = save_ok(&router, "u1", 2).await;

    let response = router
        .oneshot(get_request("/api/conversations/list", Some("u1")))
        .await
        .expect("request failed");
    let body = response_json(response).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["conversations"][0]["id"], second.as_str());
    assert_eq!(body["conversations"][1]["id"], first.as_str());
}

#[tokio::test]
async fn test_delete_removes_conversation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let router = no_throttle_router(&dir);
    let id = save_ok(&router, "u1", 2).await;

    let response = router
        .clone()
        .oneshot(
            axum::http::Request::builder()
                .method("DELETE")
                .uri(format!("/api/conversations/{}", id))
                .header("x-user-id", "u1")
                .body(axum::body::Body::empty())
                .expect("request build failed"),
        )
        .await
        .expect("request failed");
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(get_request(
            &format!("/api/conversations/{}", id),
            Some("u1"),
        ))
        .await
        .expect("request failed");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_by_other_user_is_not_found_and_keeps_record() {
    let dir = tempfile::tempdir().expect("tempdir");
    let router = no_throttle_router(&dir);
    let id = save_ok(&router, "owner", 2).await;

    let response = router
        .clone()
        .oneshot(
            axum::http::Request::builder()
                .method("DELETE")
                .uri(format!("/api/conversations/{}", id))
                .header("x-user-id", "intruder")
                .body(axum::body::Body::empty())
                .expect("request build failed"),
        )
        .await
        .expect("request failed");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = router
        .oneshot(get_request(
            &format!("/api/conversations/{}", id),
            Some("owner"),
        ))
        .await
        .expect("request failed");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_clear_all_reports_deleted_count() {
    let dir = tempfile::tempdir().expect("tempdir");
    let router = no_throttle_router(&dir);

    for _ in 0..3 {
        save_ok(&router, "u1", 2).await;
        settle_throttle().await;
    }

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/conversations/clear-all",
            json!({"userId": "u1"}),
        ))
        .await
        .expect("request failed");
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["deletedCount"], 3);

    let response = router
        .oneshot(get_request("/api/conversations/list", Some("u1")))
        .await
        .expect("request failed");
    let body = response_json(response).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_clear_all_requires_user_id() {
    let dir = tempfile::tempdir().expect("tempdir");
    let router = no_throttle_router(&dir);

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/conversations/clear-all",
            json!({}),
        ))
        .await
        .expect("request failed");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Store whose writes always fail with a quota error
struct QuotaExceededStore;

#[async_trait]
impl ObjectStore for QuotaExceededStore {
    async fn save(&self, _key: &str, _value: &Value) -> Result<()> {
        Err(AerinError::StorageQuota("Quota exceeded for bucket".to_string()).into())
    }
    async fn load(&self, _key: &str) -> Result<Option<Value>> {
        Ok(None)
    }
    async fn delete(&self, _key: &str) -> Result<()> {
        Ok(())
    }
    async fn list(&self, _prefix: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
    async fn exists(&self, _key: &str) -> bool {
        false
    }
}

#[tokio::test]
async fn test_quota_exceeded_maps_to_507() {
    let store = ConversationStore::new(Arc::new(QuotaExceededStore));
    let state = AppState::new(
        test_config(1),
        store,
        Arc::new(MockProvider::finish_only()),
    );
    let router = build_router(state);

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/conversations/save",
            save_body("u1", None, 2),
        ))
        .await
        .expect("request failed");
    assert_eq!(response.status(), StatusCode::INSUFFICIENT_STORAGE);
}
