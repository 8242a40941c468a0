//! Decode-once codec for the relay transport.
//!
//! - Text frames => `ClientFrame`
//! - Binary frames are rejected (the relay speaks JSON only)
//! - Ping/Pong/Close are surfaced for lifecycle management

use axum::extract::ws::Message;
use tabsync_core::error::{Result, TabSyncError};
use tabsync_core::protocol::relay::{ClientFrame, ServerFrame};

#[derive(Debug)]
pub enum Inbound {
    Frame { frame: ClientFrame, bytes_len: usize },
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close,
}

/// Cheap length check, applied before decoding.
pub fn frame_len(msg: &Message) -> usize {
    match msg {
        Message::Text(s) => s.len(),
        Message::Binary(b) => b.len(),
        Message::Ping(v) => v.len(),
        Message::Pong(v) => v.len(),
        Message::Close(_) => 0,
    }
}

pub fn decode(msg: Message) -> Result<Inbound> {
    match msg {
        Message::Text(s) => {
            let bytes_len = s.len();
            let frame = ClientFrame::decode(&s)?;
            Ok(Inbound::Frame { frame, bytes_len })
        }
        Message::Binary(_) => Err(TabSyncError::BadRequest("binary frames are not supported".into())),
        Message::Ping(v) => Ok(Inbound::Ping(v)),
        Message::Pong(v) => Ok(Inbound::Pong(v)),
        Message::Close(_) => Ok(Inbound::Close),
    }
}

pub fn encode(frame: &ServerFrame) -> Result<Message> {
    Ok(Message::Text(frame.encode()?))
}

/// Build an `error` frame for `e`.
pub fn error_frame(e: &TabSyncError) -> ServerFrame {
    ServerFrame::Error {
        code: e.client_code().as_str().to_string(),
        msg: e.to_string(),
    }
}
