use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use tabsync_core::error::{Result, TabSyncError};
use tabsync_core::Envelope;

use super::{ChannelTransport, EnvelopeSink};

/// In-process broadcast primitive: `channel -> { subscriber -> queue }`.
///
/// Plays the role a shared `BroadcastChannel` plays between same-origin
/// contexts. Pass one hub (behind `Arc`) to every context that must see the
/// others.
#[derive(Default)]
pub struct LocalHub {
    channels: DashMap<String, DashMap<u64, mpsc::UnboundedSender<Envelope>>>,
    next_id: AtomicU64,
}

impl LocalHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    fn next_subscriber(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn join(&self, channel: &str, id: u64, tx: mpsc::UnboundedSender<Envelope>) {
        self.channels
            .entry(channel.to_string())
            .or_default()
            .insert(id, tx);
    }

    fn leave(&self, channel: &str, id: u64) {
        if let Some(subs) = self.channels.get(channel) {
            subs.remove(&id);
        }
        self.channels.remove_if(channel, |_, subs| subs.is_empty());
    }

    /// Deliver to every subscriber except `from`. Returns the delivery count.
    fn post(&self, channel: &str, from: u64, env: &Envelope) -> usize {
        let mut delivered = 0;
        let mut dead = Vec::new();
        if let Some(subs) = self.channels.get(channel) {
            for sub in subs.iter() {
                if *sub.key() == from {
                    continue;
                }
                if sub.value().send(env.clone()).is_ok() {
                    delivered += 1;
                } else {
                    dead.push(*sub.key());
                }
            }
        }
        for id in dead {
            tracing::debug!(channel, subscriber = id, "pruning dead subscriber");
            self.leave(channel, id);
        }
        delivered
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels.get(channel).map(|s| s.len()).unwrap_or(0)
    }

    pub fn channels(&self) -> Vec<String> {
        self.channels.iter().map(|e| e.key().clone()).collect()
    }

    pub fn open(self: &Arc<Self>, channel: &str) -> LocalTransport {
        LocalTransport::new(Arc::clone(self), channel)
    }
}

/// One context's handle on a `LocalHub` channel.
///
/// Posting does not require a subscription; a transport that never
/// subscribes is a pure sender.
pub struct LocalTransport {
    hub: Arc<LocalHub>,
    channel: String,
    id: u64,
    closed: AtomicBool,
}

impl LocalTransport {
    pub fn new(hub: Arc<LocalHub>, channel: impl Into<String>) -> Self {
        let id = hub.next_subscriber();
        Self {
            hub,
            channel: channel.into(),
            id,
            closed: AtomicBool::new(false),
        }
    }
}

impl ChannelTransport for LocalTransport {
    fn channel(&self) -> &str {
        &self.channel
    }

    fn post(&self, env: Envelope) -> Result<()> {
        if self.is_closed() {
            return Err(TabSyncError::Closed(self.channel.clone()));
        }
        let n = self.hub.post(&self.channel, self.id, &env);
        tracing::trace!(channel = %self.channel, msg_type = %env.msg_type, delivered = n, "posted");
        Ok(())
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
        let (tx, mut rx) = mpsc::unbounded_channel::<Envelope>();
        // replacing an earlier queue drops its sender, which ends the old pump
        self.hub.join(&self.channel, self.id, tx);
        rt.spawn(async move {
            while let Some(env) = rx.recv().await {
                sink(&env);
            }
        });
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.hub.leave(&self.channel, self.id);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Drop for LocalTransport {
    fn drop(&mut self) {
        self.close();
    }
}
