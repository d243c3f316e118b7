//! Server-side tool schemas for the Anthropic Messages API

use crate::config::WebFetchConfig;
use serde_json::{json, Value};

/// Beta header value required when the web fetch tool is attached
pub const WEB_FETCH_BETA: &str = "web-fetch-2025-09-10";

/// Schema for the hosted web search tool
pub fn web_search_tool(max_uses: u32) -> Value {
    json!({
        "type": "web_search_20250305",
        "name": "web_search",
        "max_uses": max_uses,
    })
}

/// Schema for the hosted web fetch tool
///
/// Fetched pages carry citations so answer text can point back into the
/// page content. The domain allowlist comes from configuration.
pub fn web_fetch_tool(config: &WebFetchConfig) -> Value {
    json!({
        "type": "web_fetch_20250910",
        "name": "web_fetch",
        "max_uses": config.max_uses,
        "allowed_domains": config.allowed_domains,
        "citations": {"enabled": true},
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_web_search_tool_shape() {
        let tool = web_search_tool(5);
        assert_eq!(tool["type"], "web_search_20250305");
        assert_eq!(tool["name"], "web_search");
        assert_eq!(tool["max_uses"], 5);
    }

    #[test]
    fn test_web_fetch_tool_shape() {
        let config = WebFetchConfig {
            enabled: true,
            allowed_domains: vec!["docs.example.org".to_string()],
            max_uses: 10,
        };
        let tool = web_fetch_tool(&config);
        assert_eq!(tool["type"], "web_fetch_20250910");
        assert_eq!(tool["allowed_domains"][0], "docs.example.org");
        assert_eq!(tool["citations"]["enabled"], true);
    }
}
