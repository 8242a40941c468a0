//! tabsync message bus.
//!
//! A `MessageBus` lets independent browser contexts exchange `{type, data}`
//! envelopes over a named channel. Delivery is fire-and-forget: broadcast to
//! every registered receiver, or addressed to one receiver via
//! `data.receiverId`.
//!
//! Two transports back a bus:
//! - `LocalHub`: a native broadcast primitive shared by contexts in one process.
//! - `Relay`: a routing table that bridges isolated endpoints (browser tabs)
//!   which cannot see each other, used both in-process and by the relay server.
//!
//! Nothing here throws into application code: transport, handler and forward
//! failures are absorbed at the boundary and surfaced through `tracing`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod bus;
pub mod config;
pub mod registry;
pub mod relay;
pub mod store;
pub mod transport;

pub use bus::MessageBus;
pub use registry::{DispatchReport, Handlers, Listener, ListenerRegistry};
pub use relay::{Connection, Delivery, FanoutReport, ForwardError, Forwarder, Relay, RoutingTable};
pub use transport::{Backend, ChannelTransport, EnvelopeSink, LocalHub, LocalTransport, RelayTransport};
