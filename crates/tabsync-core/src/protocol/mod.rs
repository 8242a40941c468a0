//! Protocol modules.
//!
//! - `envelope`: the `{type, data}` unit exchanged on a channel.
//! - `relay`: frames spoken between a tab endpoint and the relay process.
//! - `naming`: message-type normalization used by listener registration.
//!
//! Parsers never panic: malformed input is reported as `TabSyncError`.

pub mod envelope;
pub mod naming;
pub mod relay;
