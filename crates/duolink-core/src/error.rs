//! Shared error type across duolink crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed frame.
    BadRequest,
    /// Auth failed.
    AuthFailed,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in HTTP responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::AuthFailed => "AUTH_FAILED",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, DuolinkError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum DuolinkError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("auth failed")]
    AuthFailed,
    #[error("internal: {0}")]
    Internal(String),
}

impl DuolinkError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            DuolinkError::BadRequest(_) => ClientCode::BadRequest,
            DuolinkError::AuthFailed => ClientCode::AuthFailed,
            DuolinkError::Internal(_) => ClientCode::Internal,
        }
    }
}
