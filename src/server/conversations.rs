//! Conversation CRUD handlers
//!
//! User identity arrives as the `x-user-id` header for reads and deletes
//! and as a body field for writes. A conversation that does not exist and
//! one owned by another user are indistinguishable in every response.

use super::AppState;
use crate::conversations::{ContextMessage, UiMessage};
use crate::error::AerinError;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

const USER_ID_HEADER: &str = "x-user-id";

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"error": message}))).into_response()
}

fn header_user_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(String::from)
}

fn valid_uuid(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

/// `GET /api/conversations/list`
///
/// A missing user header is not an error: a brand-new browser profile
/// simply has no conversations yet.
pub async fn list(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(user_id) = header_user_id(&headers) else {
        return Json(json!({"conversations": [], "total": 0})).into_response();
    };

    match state.store.load_user_index(&user_id).await {
        Ok(index) => {
            let conversations = index.map(|i| i.conversations).unwrap_or_default();
            let total = conversations.len();
            Json(json!({"conversations": conversations, "total": total})).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to list conversations: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to list conversations",
            )
        }
    }
}

/// `GET /api/conversations/{id}`
pub async fn get_one(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let Some(user_id) = header_user_id(&headers) else {
        return error_response(StatusCode::UNAUTHORIZED, "User ID required");
    };
    if !valid_uuid(&conversation_id) {
        return error_response(StatusCode::BAD_REQUEST, "Invalid conversation ID");
    }

    match state.store.load_conversation(&user_id, &conversation_id).await {
        Ok(Some(conversation)) => Json(json!({"conversation": conversation})).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Conversation not found"),
        Err(e) => {
            tracing::error!("Failed to load conversation {}: {}", conversation_id, e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load conversation",
            )
        }
    }
}

/// `DELETE /api/conversations/{id}`
pub async fn delete_one(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let Some(user_id) = header_user_id(&headers) else {
        return error_response(StatusCode::UNAUTHORIZED, "User ID required");
    };
    if !valid_uuid(&conversation_id) {
        return error_response(StatusCode::BAD_REQUEST, "Invalid conversation ID");
    }

    match state
        .store
        .delete_conversation(&user_id, &conversation_id)
        .await
    {
        Ok(()) => Json(json!({"success": true})).into_response(),
        Err(e) => match e.downcast_ref::<AerinError>() {
            Some(AerinError::ConversationNotFound) => {
                error_response(StatusCode::NOT_FOUND, "Conversation not found")
            }
            _ => {
                tracing::error!("Failed to delete conversation {}: {}", conversation_id, e);
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to delete conversation",
                )
            }
        },
    }
}

/// Body of `POST /api/conversations/save`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub conversation_id: Option<String>,
    pub messages: Option<Vec<UiMessage>>,
    pub context_messages: Option<Vec<ContextMessage>>,
    pub user_id: Option<String>,
}

/// `POST /api/conversations/save`
///
/// Validation runs before any storage write, in a fixed order: user id,
/// messages presence, save throttle, message count, conversation id
/// format. An oversized or throttled payload never touches storage.
pub async fn save(State(state): State<AppState>, Json(body): Json<SaveRequest>) -> Response {
    let Some(user_id) = body.user_id.filter(|id| !id.is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "User ID required");
    };
    let Some(messages) = body.messages else {
        return error_response(StatusCode::BAD_REQUEST, "Messages required");
    };

    if !state.rate_limiter.try_acquire(&user_id) {
        return error_response(
            StatusCode::TOO_MANY_REQUESTS,
            "Please wait before saving again",
        );
    }

    let max_messages = state.config.chat.max_messages;
    if messages.len() > max_messages {
        return error_response(
            StatusCode::PAYLOAD_TOO_LARGE,
            &format!("Conversation exceeds the {} message limit", max_messages),
        );
    }

    if let Some(id) = &body.conversation_id {
        if !valid_uuid(id) {
            return error_response(StatusCode::BAD_REQUEST, "Invalid conversation ID");
        }
    }

    match state
        .store
        .save_conversation(
            &user_id,
            body.conversation_id.as_deref(),
            messages,
            body.context_messages,
        )
        .await
    {
        Ok(conversation_id) => {
            Json(json!({"conversationId": conversation_id, "success": true})).into_response()
        }
        Err(e) => match e.downcast_ref::<AerinError>() {
            Some(AerinError::StorageQuota(_)) => {
                tracing::error!("Storage quota exceeded for user {}", user_id);
                error_response(StatusCode::INSUFFICIENT_STORAGE, "Storage quota exceeded")
            }
            _ => {
                tracing::error!("Failed to save conversation: {}", e);
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to save conversation",
                )
            }
        },
    }
}

/// Body of `POST /api/conversations/clear-all`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearAllRequest {
    pub user_id: Option<String>,
}

/// `POST /api/conversations/clear-all`
pub async fn clear_all(
    State(state): State<AppState>,
    Json(body): Json<ClearAllRequest>,
) -> Response {
    let Some(user_id) = body.user_id.filter(|id| !id.is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "User ID required");
    };

    match state.store.clear_all_conversations(&user_id).await {
        Ok(count) => Json(json!({"success": true, "deletedCount": count})).into_response(),
        Err(e) => {
            tracing::error!("Failed to clear conversations for {}: {}", user_id, e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to clear conversations",
            )
        }
    }
}
