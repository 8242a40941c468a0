use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use tabsync_core::error::{Result, TabSyncError};
use tabsync_core::{EndpointId, Envelope};

use crate::relay::{Connection, Delivery, Relay};

use super::{ChannelTransport, EnvelopeSink};

/// Relay-forwarding transport: this context is one relay endpoint.
///
/// Posts go through an uplink task that awaits each fan-out in turn, which
/// keeps sends FIFO per sender while `post` itself stays non-blocking.
/// Closing queues behind pending posts: the endpoint leaves the relay only
/// after everything posted before `close` has been fanned out.
pub struct RelayTransport {
    relay: Arc<Relay>,
    channel: String,
    endpoint: EndpointId,
    queue: usize,
    uplink: mpsc::UnboundedSender<Uplink>,
    closed: AtomicBool,
}

enum Uplink {
    Post(Envelope),
    Close,
}

fn leave(relay: &Relay, channel: &str, endpoint: EndpointId) {
    relay.on_unregister(channel, endpoint);
    relay.detach(endpoint);
}

impl RelayTransport {
    /// Reserve an endpoint on `relay`. Must run inside a tokio runtime.
    pub fn open(relay: Arc<Relay>, channel: &str, queue: usize) -> Result<Self> {
        let rt = Handle::try_current()
            .map_err(|_| TabSyncError::Internal("relay transport requires a tokio runtime".into()))?;

        let endpoint = relay.allocate();
        let (uplink, mut rx) = mpsc::unbounded_channel::<Uplink>();

        let r = Arc::clone(&relay);
        let ch = channel.to_string();
        rt.spawn(async move {
            while let Some(Uplink::Post(env)) = rx.recv().await {
                let report = r.on_broadcast(&ch, endpoint, env).await;
                tracing::trace!(channel = %ch, %endpoint, ?report, "relayed");
            }
            leave(&r, &ch, endpoint);
        });

        Ok(Self {
            relay,
            channel: channel.to_string(),
            endpoint,
            queue: queue.max(1),
            uplink,
            closed: AtomicBool::new(false),
        })
    }

    pub fn endpoint(&self) -> EndpointId {
        self.endpoint
    }
}

impl ChannelTransport for RelayTransport {
    fn channel(&self) -> &str {
        &self.channel
    }

    fn post(&self, env: Envelope) -> Result<()> {
        if self.is_closed() {
            return Err(TabSyncError::Closed(self.channel.clone()));
        }
        self.uplink
            .send(Uplink::Post(env))
            .map_err(|_| TabSyncError::Closed(self.channel.clone()))
    }

    fn subscribe(&self, sink: EnvelopeSink) {
        if self.is_closed() {
            tracing::debug!(channel = %self.channel, "subscribe on closed transport ignored");
            return;
        }
        let Ok(rt) = Handle::try_current() else {
            tracing::warn!(channel = %self.channel, "subscribe requires a tokio runtime");
            return;
        };
        let (tx, mut rx) = mpsc::channel::<Delivery>(self.queue);
        // replacing the forwarder drops the old sender, which ends the old pump
        self.relay.attach_as(self.endpoint, Arc::new(Connection::new(tx)));
        self.relay.on_register(&self.channel, self.endpoint);
        rt.spawn(async move {
            while let Some(d) = rx.recv().await {
                sink(d.envelope.as_ref());
            }
        });
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if self.uplink.send(Uplink::Close).is_err() {
            // uplink task already gone (runtime shut down)
            leave(&self.relay, &self.channel, self.endpoint);
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Drop for RelayTransport {
    fn drop(&mut self) {
        self.close();
    }
}
