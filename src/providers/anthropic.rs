//! Anthropic Messages API streaming provider
//!
//! Issues `POST /v1/messages` with `stream: true` and incrementally
//! parses the SSE byte stream into normalized `StreamEvent`s. The wire
//! protocol interleaves content blocks by index; block kinds are tracked
//! per index so deltas land on the right variant (text deltas for text
//! blocks, thinking deltas for reasoning blocks). Unknown frames are
//! skipped so protocol additions do not break the stream.

use super::base::{ChatProvider, ChatRequest, EventStream, StreamEvent};
use super::tools::WEB_FETCH_BETA;
use crate::config::ProviderConfig;
use crate::error::{AerinError, Result};
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

const MESSAGES_PATH: &str = "/v1/messages";
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Streaming client for the Anthropic Messages API
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    api_version: String,
}

impl AnthropicProvider {
    /// Create a provider from configuration
    ///
    /// # Errors
    ///
    /// Returns a `Config` error when the API key environment variable is
    /// unset or empty.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                AerinError::Config(format!(
                    "{} is required; set it to your Anthropic API key",
                    config.api_key_env
                ))
            })?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            api_version: config.api_version.clone(),
        })
    }

    fn build_request_body(request: &ChatRequest) -> Value {
        let mut body = json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "stream": true,
            "system": request.system,
            "messages": request.messages,
            "thinking": {
                "type": "enabled",
                "budget_tokens": request.thinking_budget_tokens,
            },
        });
        if !request.tools.is_empty() {
            body["tools"] = Value::Array(request.tools.clone());
        }
        body
    }

    /// Whether the attached tools require the web-fetch beta header
    fn needs_fetch_beta(tools: &[Value]) -> bool {
        tools
            .iter()
            .any(|tool| tool["type"].as_str() == Some("web_fetch_20250910"))
    }
}

#[async_trait]
impl ChatProvider for AnthropicProvider {
    async fn stream_chat(&self, request: ChatRequest) -> Result<EventStream> {
        let url = format!("{}{}", self.api_base, MESSAGES_PATH);
        let body = Self::build_request_body(&request);

        let mut builder = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if Self::needs_fetch_beta(&request.tools) {
            builder = builder.header("anthropic-beta", WEB_FETCH_BETA);
        }

        let response = builder
            .json(&body)
            .send()
            .await
            .map_err(|e| AerinError::Provider(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(AerinError::Provider(format!(
                "API returned status {}: {}",
                status, detail
            ))
            .into());
        }

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut parser = SseParser::new();
            let mut state = StreamState::new();

            'outer: while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        let _ = tx
                            .send(Err(
                                AerinError::Provider(format!("Stream read failed: {}", e)).into()
                            ))
                            .await;
                        return;
                    }
                };

                for frame in parser.push(&chunk) {
                    let (events, done) = state.map_event(&frame);
                    for event in events {
                        if tx.send(event).await.is_err() {
                            // Receiver dropped: client disconnected.
                            return;
                        }
                    }
                    if done {
                        break 'outer;
                    }
                }
            }
        });

        Ok(ReceiverStream::new(rx).boxed())
    }
}

/// Incremental SSE frame parser
///
/// Buffers raw bytes and yields one JSON value per complete `data:`
/// frame. Decoding happens per assembled frame, so a multi-byte UTF-8
/// character split across network chunks stays intact. Frames are
/// delimited by a blank line; `event:` lines and comments are ignored,
/// as is the non-JSON `[DONE]` sentinel.
struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    fn push(&mut self, chunk: &[u8]) -> Vec<Value> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(boundary) = self.buffer.windows(2).position(|pair| pair == b"\n\n") {
            let raw: Vec<u8> = self.buffer.drain(..boundary + 2).collect();
            let data: String = String::from_utf8_lossy(&raw)
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(|rest| rest.trim_start())
                .collect::<Vec<_>>()
                .join("\n");
            if data.is_empty() || data == "[DONE]" {
                continue;
            }
            match serde_json::from_str(&data) {
                Ok(value) => frames.push(value),
                Err(e) => tracing::warn!("Skipping unparseable stream frame: {}", e),
            }
        }
        frames
    }
}

/// Content-block kind at one stream index
#[derive(Debug, Clone, Copy, PartialEq)]
enum BlockKind {
    Text,
    Thinking,
    ServerToolUse,
    WebSearchResult,
    Other,
}

/// Per-turn stream state: which kind of block lives at each index
struct StreamState {
    blocks: HashMap<u64, BlockKind>,
}

impl StreamState {
    fn new() -> Self {
        Self {
            blocks: HashMap::new(),
        }
    }

    /// Map one wire event to normalized events
    ///
    /// The boolean signals end of stream (`message_stop` or an `error`
    /// frame).
    fn map_event(&mut self, value: &Value) -> (Vec<Result<StreamEvent>>, bool) {
        match value["type"].as_str() {
            Some("content_block_start") => (self.on_block_start(value), false),
            Some("content_block_delta") => (self.on_block_delta(value), false),
            Some("message_stop") => (vec![Ok(StreamEvent::Finish)], true),
            Some("error") => {
                let message = value["error"]["message"]
                    .as_str()
                    .unwrap_or("unknown provider error")
                    .to_string();
                (
                    vec![Err(AerinError::Provider(message).into())],
                    true,
                )
            }
            // message_start, message_delta, content_block_stop, ping
            _ => (Vec::new(), false),
        }
    }

    fn on_block_start(&mut self, value: &Value) -> Vec<Result<StreamEvent>> {
        let Some(index) = value["index"].as_u64() else {
            return Vec::new();
        };
        let block = &value["content_block"];

        let kind = match block["type"].as_str() {
            Some("text") => BlockKind::Text,
            Some("thinking") => BlockKind::Thinking,
            Some("server_tool_use") => BlockKind::ServerToolUse,
            Some("web_search_tool_result") => BlockKind::WebSearchResult,
            _ => BlockKind::Other,
        };
        self.blocks.insert(index, kind);

        match kind {
            BlockKind::ServerToolUse => {
                let name = block["name"].as_str().unwrap_or("tool").to_string();
                vec![Ok(StreamEvent::ToolUse { name })]
            }
            BlockKind::WebSearchResult => block["content"]
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .filter(|item| item["type"].as_str() == Some("web_search_result"))
                        .filter_map(|item| {
                            Some(Ok(StreamEvent::SourceUrl {
                                url: item["url"].as_str()?.to_string(),
                                title: item["title"].as_str().map(String::from),
                            }))
                        })
                        .collect()
                })
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    fn on_block_delta(&mut self, value: &Value) -> Vec<Result<StreamEvent>> {
        let index = value["index"].as_u64().unwrap_or(0);
        let kind = self.blocks.get(&index).copied().unwrap_or(BlockKind::Other);
        let delta = &value["delta"];

        match delta["type"].as_str() {
            Some("text_delta") if kind == BlockKind::Text => delta["text"]
                .as_str()
                .map(|text| {
                    vec![Ok(StreamEvent::TextDelta {
                        text: text.to_string(),
                    })]
                })
                .unwrap_or_default(),
            Some("thinking_delta") if kind == BlockKind::Thinking => delta["thinking"]
                .as_str()
                .map(|text| {
                    vec![Ok(StreamEvent::ReasoningDelta {
                        text: text.to_string(),
                    })]
                })
                .unwrap_or_default(),
            Some("citations_delta") => {
                let citation = &delta["citation"];
                citation["url"]
                    .as_str()
                    .map(|url| {
                        vec![Ok(StreamEvent::Citation {
                            url: url.to_string(),
                            title: citation["title"].as_str().map(String::from),
                        })]
                    })
                    .unwrap_or_default()
            }
            // input_json_delta and signature_delta carry nothing the
            // client renders.
            _ => Vec::new(),
        }
    }
}
