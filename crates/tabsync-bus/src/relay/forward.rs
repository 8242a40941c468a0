use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use tabsync_core::Envelope;

/// One envelope on its way to one endpoint.
/// Cheap to clone: the envelope is shared across the fan-out.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub channel: Arc<str>,
    pub envelope: Arc<Envelope>,
}

impl Delivery {
    pub fn new(channel: &str, envelope: Envelope) -> Self {
        Self {
            channel: Arc::from(channel),
            envelope: Arc::new(envelope),
        }
    }
}

#[derive(Debug, Error)]
pub enum ForwardError {
    /// Destination is gone (tab closed, queue dropped).
    #[error("endpoint unreachable")]
    Unreachable,
    #[error("forward timed out")]
    TimedOut,
    #[error("forward rejected: {0}")]
    Rejected(String),
}

impl ForwardError {
    /// Stale routes are expected; everything else is worth a warning.
    pub fn is_expected(&self) -> bool {
        matches!(self, ForwardError::Unreachable)
    }
}

/// Physical delivery to one endpoint.
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(&self, delivery: Delivery) -> Result<(), ForwardError>;
}

/// One endpoint's inbound queue sender.
#[derive(Clone)]
pub struct Connection {
    pub tx: mpsc::Sender<Delivery>,
}

impl Connection {
    pub fn new(tx: mpsc::Sender<Delivery>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl Forwarder for Connection {
    async fn forward(&self, delivery: Delivery) -> Result<(), ForwardError> {
        self.tx
            .send(delivery)
            .await
            .map_err(|_| ForwardError::Unreachable)
    }
}
