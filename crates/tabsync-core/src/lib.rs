//! tabsync core: transport-agnostic wire contracts and the shared error type.
//!
//! This crate defines the envelope shape exchanged on a channel, the frames
//! spoken between a tab and the relay process, and the message-type naming
//! rules used by listener registration. It carries no runtime dependencies so
//! the same types can be used by in-process buses, the relay, and tooling.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here.
//! Malformed input surfaces as `TabSyncError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{Result, TabSyncError};
pub use protocol::envelope::Envelope;
pub use protocol::relay::EndpointId;
