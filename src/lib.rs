//! Aerin: a conversational AI assistant web service
//!
//! Serves a streaming chat proxy to the Anthropic Messages API with
//! web-search augmentation, reasoning traces, and citations, plus
//! per-user conversation persistence over pluggable object storage.
//! The `client` module carries the UI-side logic (message rendering,
//! onboarding questionnaire, local profile) that the browser front end
//! mirrors.

pub mod cli;
pub mod client;
pub mod config;
pub mod conversations;
pub mod error;
pub mod prompts;
pub mod providers;
pub mod server;
pub mod storage;

pub use config::Config;
pub use error::{AerinError, Result};
