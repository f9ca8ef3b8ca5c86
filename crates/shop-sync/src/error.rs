//! # Client Error Types
//!
//! Error types for session and cart operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Client Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Rejection (4xx/5xx) │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Transport      │  │  Rejected               │ │
//! │  │  InvalidUrl     │  │  Timeout        │  │  Unauthorized           │ │
//! │  │  ConfigLoad/Save│  │                 │  │  NotFound               │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Session        │  │  Precondition   │  │     Local               │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidToken   │  │ NotAuthenticated│  │  Validation             │ │
//! │  │  (→ teardown)   │  │ (→ caller)      │  │  Storage, Serialization │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Every failure a session or cart operation can report.
#[derive(Debug, Error)]
pub enum ClientError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid client configuration.
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),

    /// Invalid API URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// The request never produced an HTTP response.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The request exceeded the configured timeout.
    #[error("Request timed out")]
    Timeout,

    // =========================================================================
    // Rejections
    // =========================================================================
    /// The server answered with a non-success status.
    #[error("Request rejected ({status}): {}", .message.as_deref().unwrap_or("no message"))]
    Rejected { status: u16, message: Option<String> },

    /// 401/403: credentials were refused or the token is no longer accepted.
    #[error("Unauthorized: {}", .message.as_deref().unwrap_or("access denied"))]
    Unauthorized { message: Option<String> },

    /// 404 from the server.
    #[error("Not found: {}", .message.as_deref().unwrap_or("resource missing"))]
    NotFound { message: Option<String> },

    // =========================================================================
    // Session Errors
    // =========================================================================
    /// The token is malformed or expired.
    #[error("Invalid session token: {0}")]
    InvalidToken(String),

    /// An operation that requires a session was called without one.
    #[error("User must be authenticated to {0}")]
    NotAuthenticated(&'static str),

    // =========================================================================
    // Local Errors
    // =========================================================================
    /// Input rejected before any request was made.
    #[error("{0}")]
    Validation(String),

    /// Persisted session storage failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A payload could not be encoded or decoded.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Internal client error.
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<shop_db::DbError> for ClientError {
    fn from(err: shop_db::DbError) -> Self {
        ClientError::Storage(err.to_string())
    }
}

impl From<shop_core::CoreError> for ClientError {
    fn from(err: shop_core::CoreError) -> Self {
        match err {
            shop_core::CoreError::Validation(v) => ClientError::Validation(v.to_string()),
            shop_core::CoreError::LineNotFound(product_id) => ClientError::NotFound {
                message: Some(format!("No cart line for product {product_id}")),
            },
        }
    }
}

impl From<shop_core::ValidationError> for ClientError {
    fn from(err: shop_core::ValidationError) -> Self {
        ClientError::Validation(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::InvalidUrl(err.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_decode() {
            ClientError::Serialization(err.to_string())
        } else if let Some(status) = err.status() {
            ClientError::from_status(status.as_u16(), None)
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ClientError {
    fn from(err: toml::de::Error) -> Self {
        ClientError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ClientError {
    fn from(err: toml::ser::Error) -> Self {
        ClientError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl ClientError {
    /// Maps a non-success HTTP status to the matching variant.
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        match status {
            401 | 403 => ClientError::Unauthorized { message },
            404 => ClientError::NotFound { message },
            _ => ClientError::Rejected { status, message },
        }
    }

    /// Returns true if the same request may succeed later.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport(_) | ClientError::Timeout => true,
            ClientError::Rejected { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ClientError::InvalidConfig(_)
                | ClientError::InvalidUrl(_)
                | ClientError::ConfigLoadFailed(_)
                | ClientError::ConfigSaveFailed(_)
        )
    }

    /// Returns true for usage errors the caller must fix.
    pub fn is_precondition(&self) -> bool {
        matches!(self, ClientError::NotAuthenticated(_))
    }

    /// Returns true when the session can no longer be trusted.
    pub fn is_session_invalid(&self) -> bool {
        matches!(
            self,
            ClientError::Unauthorized { .. } | ClientError::InvalidToken(_)
        )
    }

    /// Text for the error stream: the server's message when it sent one,
    /// local validation text, otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ClientError::Rejected {
                message: Some(m), ..
            }
            | ClientError::Unauthorized { message: Some(m) }
            | ClientError::NotFound { message: Some(m) }
                if !m.is_empty() =>
            {
                m.clone()
            }
            ClientError::Validation(m) => m.clone(),
            _ => fallback.to_string(),
        }
    }
}
