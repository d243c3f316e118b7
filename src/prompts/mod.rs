//! System prompt loading and caching
//!
//! The prompt loads once per process and is cached behind a `OnceLock`;
//! every chat turn attaches the same prompt. An embedded default covers
//! the common case, with a configurable file path override.

use crate::error::Result;
use anyhow::Context;
use std::path::Path;
use std::sync::OnceLock;

/// Embedded default system prompt
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are Aerin, a knowledgeable assistant for people running small nonprofit \
and community organizations. You help with fundraising, grant writing, \
volunteer coordination, budgeting, and day-to-day operations.

Be practical and concrete. When a question benefits from current information, \
use web search and cite your sources. Keep answers grounded in what small \
teams with limited budgets can actually do. When you are unsure, say so \
rather than guessing.";

static SYSTEM_PROMPT: OnceLock<String> = OnceLock::new();

/// Get the process-wide system prompt, loading it on first use
///
/// # Arguments
///
/// * `path` - Optional prompt file path; `None` uses the embedded default
pub fn system_prompt(path: Option<&str>) -> &'static str {
    SYSTEM_PROMPT.get_or_init(|| match load_prompt(path) {
        Ok(prompt) => prompt,
        Err(e) => {
            tracing::warn!("Failed to load system prompt, using default: {}", e);
            DEFAULT_SYSTEM_PROMPT.to_string()
        }
    })
}

/// Load the prompt from a file, or return the embedded default
pub fn load_prompt(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            let contents = std::fs::read_to_string(Path::new(path))
                .with_context(|| format!("Failed to read system prompt from {}", path))?;
            Ok(contents.trim().to_string())
        }
        None => Ok(DEFAULT_SYSTEM_PROMPT.to_string()),
    }
}
