//! Streaming AI provider implementations
//!
//! The server talks to providers through the `ChatProvider` trait; the
//! Anthropic Messages API is the only implementation. Tool schemas for
//! web search and web fetch live here too, since they are part of the
//! provider wire format.

pub mod anthropic;
pub mod base;
pub mod tools;

pub use anthropic::AnthropicProvider;
pub use base::{ChatProvider, ChatRequest, EventStream, ProviderMessage, StreamEvent};
pub use tools::{web_fetch_tool, web_search_tool};
