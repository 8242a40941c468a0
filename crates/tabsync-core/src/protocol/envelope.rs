//! Channel envelope (JSON).
//!
//! `{ "type": "<string>", "data": { ...optional "receiverId", ... } }`

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, TabSyncError};

/// Payload field that restricts delivery to a single logical receiver.
pub const RECEIVER_ID_FIELD: &str = "receiverId";

/// Unit of transmission on a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Flat message tag (field name is `type` in JSON).
    /// A missing or `null` tag decodes as empty and the envelope is dropped by receivers.
    #[serde(rename = "type", default, deserialize_with = "null_as_empty")]
    pub msg_type: String,
    /// Optional structured payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

fn null_as_empty<'de, D>(d: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

impl Envelope {
    pub fn new(msg_type: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            msg_type: msg_type.into(),
            data,
        }
    }

    /// Build an envelope addressed to one receiver.
    ///
    /// `data` must be an object or absent; the `receiverId` field is inserted
    /// (or overwritten) on the payload.
    pub fn addressed(
        msg_type: impl Into<String>,
        receiver_id: impl Into<String>,
        data: Option<Value>,
    ) -> Result<Self> {
        let mut obj = match data {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(m)) => m,
            Some(_) => {
                return Err(TabSyncError::BadRequest(
                    "addressed envelope data must be an object".into(),
                ))
            }
        };
        obj.insert(RECEIVER_ID_FIELD.into(), Value::String(receiver_id.into()));
        Ok(Self::new(msg_type, Some(Value::Object(obj))))
    }

    /// Envelopes with an empty tag are never dispatched.
    pub fn is_routable(&self) -> bool {
        !self.msg_type.trim().is_empty()
    }

    /// The addressed receiver, if the payload names one.
    /// `null`, non-string and empty values mean broadcast.
    pub fn receiver_id(&self) -> Option<&str> {
        self.data
            .as_ref()?
            .get(RECEIVER_ID_FIELD)?
            .as_str()
            .filter(|s| !s.is_empty())
    }

    /// Payload as seen by handlers (`null` when absent).
    pub fn payload(&self) -> &Value {
        self.data.as_ref().unwrap_or(&Value::Null)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| TabSyncError::Internal(format!("envelope encode failed: {e}")))
    }

    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s)
            .map_err(|e| TabSyncError::BadRequest(format!("invalid envelope json: {e}")))
    }
}
