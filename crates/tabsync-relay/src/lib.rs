//! tabsync relay process.
//!
//! Bridges browser tabs that cannot see each other: every WebSocket
//! connection is one endpoint of a shared `Relay`, and `broadcast` frames are
//! fanned out to the other endpoints registered for the same channel.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod app_state;
pub mod obs;
pub mod router;
pub mod transport;
