//! Shared error type across tabsync crates.

use thiserror::Error;

/// Client-facing error codes carried in relay `error` frames (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed frame.
    BadRequest,
    /// Frame exceeds the configured size.
    PayloadTooLarge,
    /// Unsupported config/protocol version.
    UnsupportedVersion,
    /// Destination endpoint is gone.
    Unreachable,
    /// Internal relay error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON frames.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::Unreachable => "UNREACHABLE",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, TabSyncError>;

/// Unified error type used by the bus, the relay adapter and the relay process.
#[derive(Debug, Error)]
pub enum TabSyncError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("payload too large")]
    PayloadTooLarge,
    #[error("unsupported version")]
    UnsupportedVersion,
    /// The transport or bus was closed (the owning context was torn down).
    #[error("closed: {0}")]
    Closed(String),
    /// A registered handler rejected a message.
    #[error("handler failed: {0}")]
    Handler(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl TabSyncError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            TabSyncError::BadRequest(_) | TabSyncError::Handler(_) => ClientCode::BadRequest,
            TabSyncError::PayloadTooLarge => ClientCode::PayloadTooLarge,
            TabSyncError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            TabSyncError::Closed(_) => ClientCode::Unreachable,
            TabSyncError::Internal(_) => ClientCode::Internal,
        }
    }

    /// Shorthand for handler failures raised from application callbacks.
    pub fn handler(msg: impl Into<String>) -> Self {
        TabSyncError::Handler(msg.into())
    }
}
