//! Relay frames (JSON text frames between a tab endpoint and the relay).
//!
//! Client -> relay: `register`, `unregister`, `broadcast`.
//! Relay -> client: `hello`, `deliver`, `error`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TabSyncError};
use crate::protocol::envelope::Envelope;

/// Physical endpoint handle assigned by the relay (one per tab connection).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointId(pub u64);

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ep-{}", self.0)
    }
}

/// Frames sent by an endpoint to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum ClientFrame {
    Register { channel: String },
    Unregister { channel: String },
    Broadcast { channel: String, envelope: Envelope },
}

impl ClientFrame {
    /// Op name, used for logging and metrics labels.
    pub fn op(&self) -> &'static str {
        match self {
            ClientFrame::Register { .. } => "register",
            ClientFrame::Unregister { .. } => "unregister",
            ClientFrame::Broadcast { .. } => "broadcast",
        }
    }

    pub fn channel(&self) -> &str {
        match self {
            ClientFrame::Register { channel }
            | ClientFrame::Unregister { channel }
            | ClientFrame::Broadcast { channel, .. } => channel,
        }
    }

    /// Decode and validate (channel names must be non-empty).
    pub fn decode(s: &str) -> Result<Self> {
        let frame: ClientFrame = serde_json::from_str(s)
            .map_err(|e| TabSyncError::BadRequest(format!("invalid relay frame: {e}")))?;
        if frame.channel().is_empty() {
            return Err(TabSyncError::BadRequest("channel must not be empty".into()));
        }
        Ok(frame)
    }
}

/// Frames sent by the relay to an endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ServerFrame {
    Hello { endpoint: EndpointId },
    Deliver { channel: String, envelope: Envelope },
    Error { code: String, msg: String },
}

impl ServerFrame {
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| TabSyncError::Internal(format!("relay frame encode failed: {e}")))
    }
}
