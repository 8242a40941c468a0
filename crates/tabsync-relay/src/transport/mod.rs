//! Transport layer (WebSocket).
//!
//! Exposes the WS upgrade handler and the codec that decodes relay frames
//! once before they reach the relay.

pub mod codec;
pub mod ws;
