// Error types shared by the client, the config store and the command layer.
// Library functions return `FizzyResult`; the binary wraps these in
// `anyhow` only at the very top.

use thiserror::Error;

/// Result alias used across the library.
pub type FizzyResult<T> = Result<T, FizzyError>;

#[derive(Debug, Error)]
pub enum FizzyError {
    /// Missing token or account. Always raised before any network I/O.
    #[error("{0}")]
    Configuration(String),

    /// Non-2xx response. `body` is the raw text the server returned.
    #[error("API Error {status}: {body}")]
    Request { status: u16, body: String },

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid JSON in response: {0}")]
    InvalidResponse(#[source] serde_json::Error),

    #[error("Failed to encode request body: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("Config file error: {0}")]
    ConfigFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FizzyError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn request(status: u16, body: impl Into<String>) -> Self {
        Self::Request {
            status,
            body: body.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// HTTP status carried by a `Request` error.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => Some(*status),
            _ => None,
        }
    }
}
