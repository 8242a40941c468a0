//! Channel transports.
//!
//! A transport fans an envelope out to every other live subscriber of the
//! same channel name, never back to the poster. Delivery is asynchronous and
//! FIFO per sender -> receiver pair; there is no ordering across senders.

mod local;
mod relay;

use std::sync::Arc;

use tabsync_core::error::Result;
use tabsync_core::Envelope;

use crate::config::{BusSection, TransportKind};
use crate::relay::Relay;

pub use local::{LocalHub, LocalTransport};
pub use relay::RelayTransport;

/// Local delivery callback installed by `subscribe`.
pub type EnvelopeSink = Arc<dyn Fn(&Envelope) + Send + Sync>;

pub trait ChannelTransport: Send + Sync {
    /// Channel name this transport is bound to.
    fn channel(&self) -> &str;

    /// Fan `env` out to the other subscribers.
    /// Fails with `TabSyncError::Closed` once the transport is closed.
    fn post(&self, env: Envelope) -> Result<()>;

    /// Install the local delivery callback. Calling again replaces the sink.
    /// Requires a tokio runtime (deliveries are pumped by a task).
    fn subscribe(&self, sink: EnvelopeSink);

    /// Unsubscribe and release the channel. Idempotent.
    fn close(&self);

    fn is_closed(&self) -> bool;
}

/// Transport backend shared by all contexts that must interoperate.
/// Clones share the same hub/relay.
#[derive(Clone)]
pub enum Backend {
    Local(Arc<LocalHub>),
    Relay { relay: Arc<Relay>, queue: usize },
}

impl Backend {
    /// Build a fresh backend of the configured kind.
    pub fn from_config(cfg: &BusSection) -> Self {
        match cfg.transport {
            TransportKind::Local => Backend::Local(Arc::new(LocalHub::new())),
            TransportKind::Relay => Backend::Relay {
                relay: Arc::new(Relay::from_config(cfg)),
                queue: cfg.endpoint_queue,
            },
        }
    }

    pub fn open(&self, channel: &str) -> Result<Arc<dyn ChannelTransport>> {
        match self {
            Backend::Local(hub) => Ok(Arc::new(LocalTransport::new(Arc::clone(hub), channel))),
            Backend::Relay { relay, queue } => Ok(Arc::new(RelayTransport::open(
                Arc::clone(relay),
                channel,
                *queue,
            )?)),
        }
    }

    pub fn kind(&self) -> TransportKind {
        match self {
            Backend::Local(_) => TransportKind::Local,
            Backend::Relay { .. } => TransportKind::Relay,
        }
    }
}
