//! Error types for the agent kernel.
//!
//! Two layers:
//!
//! - [`TransportError`] is the low-level error a provider transport or a tool
//!   invocation can raise (HTTP failure, malformed JSON, bad config, …).
//! - [`AgentError`] is the outward-facing taxonomy the kernel, hook pipeline,
//!   dialect layer, hub, and session store actually return. Every
//!   `TransportError` maps onto exactly one `AgentError` variant via `#[from]`.

use thiserror::Error;

/// Result type alias used across the crate's public API.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Low-level transport/tool error.
#[derive(Error, Debug)]
pub enum TransportError {
    /// HTTP request error.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// API error payload from the model server.
    #[error("API error: {0}")]
    Api(String),

    /// Streaming protocol error.
    #[error("Streaming error: {0}")]
    Stream(String),

    /// Tool execution error.
    #[error("Tool execution error: {0}")]
    Tool(String),

    /// Request timeout.
    #[error("Request timeout")]
    Timeout,
}

impl TransportError {
    pub fn config(msg: impl Into<String>) -> Self {
        TransportError::Config(msg.into())
    }

    pub fn api(msg: impl Into<String>) -> Self {
        TransportError::Api(msg.into())
    }

    pub fn stream(msg: impl Into<String>) -> Self {
        TransportError::Stream(msg.into())
    }

    pub fn tool(msg: impl Into<String>) -> Self {
        TransportError::Tool(msg.into())
    }

    pub fn timeout() -> Self {
        TransportError::Timeout
    }

    /// Whether retrying this error is ever worthwhile (network blips, 5xx, timeouts).
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Http(_) => true,
            TransportError::Timeout => true,
            TransportError::Stream(_) => true,
            TransportError::Api(msg) => {
                msg.contains("500") || msg.contains("502") || msg.contains("503") || msg.contains("504")
                    || msg.contains("429")
            }
            TransportError::Config(_) => false,
            TransportError::Json(_) => false,
            TransportError::Tool(_) => false,
        }
    }
}

/// The error taxonomy surfaced by the kernel, hook pipeline, dialect layer,
/// hub, and session store (§7 of the design).
#[derive(Error, Debug)]
pub enum AgentError {
    /// Malformed caller arguments; surfaced immediately, never retried.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The model returned an error payload or the transport raised an HTTP
    /// error. Retryable per the execution policy only when the underlying
    /// HTTP status is transient (5xx or 429); a non-transient 4xx is
    /// surfaced immediately (§4.10, §7).
    #[error("provider error: {0}")]
    ProviderError(String),

    /// Deadline exceeded on a call or tool invocation. Retryable.
    #[error("timed out")]
    Timeout,

    /// The provider's response could not be parsed into a canonical `Msg`.
    /// Terminal for the call that produced it, but never for the agent.
    #[error("failed to parse response: {0}")]
    ParseError(String),

    /// A tool invoker raised. The kernel converts this into an error
    /// `ToolResultBlock` and feeds it back to the model; this variant exists
    /// for callers that bypass the kernel and invoke the registry directly.
    #[error("tool error: {0}")]
    ToolError(String),

    /// The call was interrupted by a caller-issued `interrupt()` or an
    /// expired deadline. Terminal for the current call, returns partial output.
    #[error("interrupted")]
    Interrupted,

    /// `SessionStore::load` was given a key with no saved session.
    #[error("session not found: {0}")]
    SessionNotFound(String),
}

impl From<TransportError> for AgentError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Http(e) => AgentError::ProviderError(e.to_string()),
            TransportError::Api(msg) => AgentError::ProviderError(msg),
            TransportError::Stream(msg) => AgentError::ProviderError(msg),
            TransportError::Json(e) => AgentError::ParseError(e.to_string()),
            TransportError::Config(msg) => AgentError::InvalidInput(msg),
            TransportError::Tool(msg) => AgentError::ToolError(msg),
            TransportError::Timeout => AgentError::Timeout,
        }
    }
}

impl AgentError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        AgentError::InvalidInput(msg.into())
    }

    pub fn provider(msg: impl Into<String>) -> Self {
        AgentError::ProviderError(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        AgentError::ParseError(msg.into())
    }

    pub fn tool(msg: impl Into<String>) -> Self {
        AgentError::ToolError(msg.into())
    }

    pub fn session_not_found(key: impl Into<String>) -> Self {
        AgentError::SessionNotFound(key.into())
    }

    /// Whether the execution policy should retry a call that failed with this error.
    ///
    /// A [`AgentError::ProviderError`] is only retryable when the HTTP status
    /// it carries is transient (5xx or 429); a non-transient 4xx (bad
    /// request, auth, forbidden, …) is surfaced immediately per §4.10.
    /// Provider errors with no leading status code (network failures,
    /// stream-level errors) default to retryable, same as before this
    /// distinction existed.
    pub fn is_retryable(&self) -> bool {
        match self {
            AgentError::ProviderError(msg) => provider_message_is_transient(msg),
            AgentError::Timeout => true,
            _ => false,
        }
    }
}

/// `send_request` formats HTTP failures as `"{status}: {body}"`, where
/// `status`'s `Display` leads with its numeric code (e.g. `"404 Not
/// Found"`). Parse that leading token and classify by status: 5xx/429 are
/// transient, any other 4xx is not. Messages with no leading numeric code
/// (transport/stream-level failures, which never go through that
/// formatting) are treated as transient, matching prior behavior.
fn provider_message_is_transient(msg: &str) -> bool {
    match msg.split_whitespace().next().and_then(|tok| tok.parse::<u16>().ok()) {
        Some(code) => code >= 500 || code == 429,
        None => true,
    }
}
