//! Top-level facade crate for tabsync.
//!
//! Re-exports the wire contracts, the message bus and the relay process
//! library so users can depend on a single crate.

pub mod core {
    pub use tabsync_core::*;
}

pub mod bus {
    pub use tabsync_bus::*;
}

pub mod relay {
    pub use tabsync_relay::*;
}
