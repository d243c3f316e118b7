//! Error types for Aerin
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Aerin operations
///
/// This enum encompasses all possible errors that can occur while serving
/// chat requests, talking to the AI provider, and reading or writing
/// conversation storage.
#[derive(Error, Debug)]
pub enum AerinError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider-related errors (API calls, authentication, stream failures)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Conversation storage errors (object store reads and writes)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Storage quota exhausted on the backing store
    #[error("Storage quota exceeded: {0}")]
    StorageQuota(String),

    /// Conversation does not exist or belongs to another user
    ///
    /// The two cases are deliberately indistinguishable so that the
    /// existence of another user's conversation is never leaked.
    #[error("Conversation not found or unauthorized")]
    ConversationNotFound,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Aerin operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
