//! Routing table adapter.
//!
//! Used when contexts cannot share a native broadcast primitive (isolated
//! browser tabs). A single `Relay` owns the routing table and the endpoint
//! registry, and fans envelopes out on behalf of its endpoints.

mod adapter;
mod endpoints;
mod forward;
mod routing;

pub use adapter::{FanoutReport, Relay};
pub use endpoints::EndpointRegistry;
pub use forward::{Connection, Delivery, ForwardError, Forwarder};
pub use routing::RoutingTable;
