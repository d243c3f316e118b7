//! Streaming chat handler
//!
//! Assembles the provider request from the client's message history and
//! streams the normalized events back as SSE frames. Frames reuse the
//! `StreamEvent` wire shape; a terminal `finish` or `error` frame always
//! closes the stream. The whole stream is bounded by a configured
//! maximum duration.

use super::AppState;
use crate::conversations::{ContextMessage, UiMessage};
use crate::providers::{
    web_fetch_tool, web_search_tool, ChatRequest, ProviderMessage, StreamEvent,
};
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

const WEB_SEARCH_MAX_USES: u32 = 5;
const FRAME_CHANNEL_CAPACITY: usize = 64;

/// Body of `POST /api/chat`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequestBody {
    #[serde(default)]
    pub messages: Vec<UiMessage>,
    pub model: Option<String>,
    #[serde(default)]
    pub web_search: bool,
    pub context_messages: Option<Vec<ContextMessage>>,
}

/// Build the provider message list from client history
///
/// User text is wrapped in `<user_message>` markers so the model can
/// tell genuine user input from anything else in the transcript.
/// Questionnaire context, when present, is prepended once as a
/// `<context>` block ahead of the user's turns. Messages with no text
/// content are dropped.
pub fn build_provider_messages(
    messages: &[UiMessage],
    context: Option<&[ContextMessage]>,
) -> Vec<ProviderMessage> {
    let mut provider_messages = Vec::new();

    if let Some(context) = context.filter(|pairs| !pairs.is_empty()) {
        let mut block = String::from(
            "<context>\nBackground the user shared when getting started:\n",
        );
        for pair in context {
            block.push_str(&format!("Q: {}\nA: {}\n", pair.question, pair.answer));
        }
        block.push_str("</context>");
        provider_messages.push(ProviderMessage::user(block));
    }

    for message in messages {
        let text = message.text();
        if text.is_empty() {
            continue;
        }
        match message.role.as_str() {
            "user" => provider_messages.push(ProviderMessage::user(format!(
                "<user_message>{}</user_message>",
                text
            ))),
            "assistant" => provider_messages.push(ProviderMessage::assistant(text)),
            _ => {}
        }
    }

    provider_messages
}

fn json_event(value: &serde_json::Value) -> Event {
    match Event::default().json_data(value) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!("Failed to encode stream frame: {}", e);
            Event::default().data("{\"type\":\"error\",\"message\":\"encoding failure\"}")
        }
    }
}

fn error_frame(message: &str) -> Event {
    json_event(&json!({"type": "error", "message": message}))
}

/// `POST /api/chat`
pub async fn chat(State(state): State<AppState>, Json(body): Json<ChatRequestBody>) -> Response {
    let config = &state.config;

    let mut tools = Vec::new();
    if body.web_search {
        tools.push(web_search_tool(WEB_SEARCH_MAX_USES));
    }
    if config.chat.web_fetch.enabled {
        tools.push(web_fetch_tool(&config.chat.web_fetch));
    }

    let request = ChatRequest {
        model: body
            .model
            .unwrap_or_else(|| config.provider.default_model.clone()),
        messages: build_provider_messages(&body.messages, body.context_messages.as_deref()),
        system: crate::prompts::system_prompt(config.chat.system_prompt_path.as_deref())
            .to_string(),
        tools,
        max_tokens: config.provider.max_tokens,
        thinking_budget_tokens: config.provider.thinking_budget_tokens,
    };

    let timeout = Duration::from_secs(config.chat.stream_timeout_seconds);
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(FRAME_CHANNEL_CAPACITY);

    let provider = state.provider.clone();
    tokio::spawn(async move {
        let mut stream = match provider.stream_chat(request).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!("Chat request failed: {}", e);
                let _ = tx.send(Ok(error_frame("The assistant is unavailable"))).await;
                return;
            }
        };

        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    tracing::warn!("Chat stream exceeded {}s, closing", timeout.as_secs());
                    let _ = tx.send(Ok(error_frame("Response timed out"))).await;
                    return;
                }
                event = stream.next() => match event {
                    Some(Ok(event)) => {
                        let finished = event == StreamEvent::Finish;
                        let frame = match serde_json::to_value(&event) {
                            Ok(value) => json_event(&value),
                            Err(e) => {
                                tracing::error!("Failed to encode event: {}", e);
                                continue;
                            }
                        };
                        if tx.send(Ok(frame)).await.is_err() {
                            // Client disconnected.
                            return;
                        }
                        if finished {
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        tracing::error!("Provider stream error: {}", e);
                        let _ = tx.send(Ok(error_frame(&e.to_string()))).await;
                        return;
                    }
                    None => return,
                }
            }
        }
    });

    Sse::new(ReceiverStream::new(rx))
        .keep_alive(KeepAlive::default())
        .into_response()
}
