//! Message bus client.
//!
//! One bus per browser context, bound to one channel name. Construction is
//! synchronous and the bus is immediately usable; `close` (or drop) releases
//! the transport and clears the registry. After close every operation is a
//! silent no-op.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;

use tabsync_core::error::{Result, TabSyncError};
use tabsync_core::Envelope;

use crate::registry::{Handlers, Listener, ListenerRegistry};
use crate::transport::{Backend, ChannelTransport};

pub struct MessageBus {
    transport: Arc<dyn ChannelTransport>,
    registry: Arc<ListenerRegistry>,
    closed: Arc<AtomicBool>,
}

impl MessageBus {
    /// Wrap `transport` and subscribe the registry to it.
    pub fn new(transport: Arc<dyn ChannelTransport>) -> Self {
        let registry = Arc::new(ListenerRegistry::new());
        let closed = Arc::new(AtomicBool::new(false));

        let reg = Arc::clone(&registry);
        let flag = Arc::clone(&closed);
        transport.subscribe(Arc::new(move |env: &Envelope| {
            if flag.load(Ordering::Acquire) {
                return;
            }
            reg.dispatch(env);
        }));

        Self {
            transport,
            registry,
            closed,
        }
    }

    /// Open `channel` on `backend` and wrap it.
    pub fn connect(backend: &Backend, channel: &str) -> Result<Self> {
        Ok(Self::new(backend.open(channel)?))
    }

    pub fn channel(&self) -> &str {
        self.transport.channel()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Fire-and-forget broadcast. `Value::Null` means "no payload".
    pub fn send(&self, msg_type: &str, data: Value) {
        let data = (!data.is_null()).then_some(data);
        self.post(Envelope::new(msg_type, data));
    }

    /// Fire-and-forget send restricted to one receiver.
    pub fn send_to(&self, receiver_id: &str, msg_type: &str, data: Value) {
        match Envelope::addressed(msg_type, receiver_id, Some(data)) {
            Ok(env) => self.post(env),
            Err(e) => tracing::warn!(msg_type, receiver_id, error = %e, "send_to dropped"),
        }
    }

    fn post(&self, env: Envelope) {
        if self.is_closed() {
            return;
        }
        if !env.is_routable() {
            tracing::debug!(channel = %self.channel(), "send without type dropped");
            return;
        }
        match self.transport.post(env) {
            Ok(()) => {}
            Err(TabSyncError::Closed(ch)) => {
                tracing::debug!(channel = %ch, "send on closed transport dropped")
            }
            Err(e) => tracing::warn!(channel = %self.channel(), error = %e, "send failed"),
        }
    }

    pub fn register(&self, receiver_id: &str, handlers: Handlers) {
        if self.is_closed() {
            return;
        }
        self.registry.register(receiver_id, handlers);
    }

    pub fn register_listener<L: Listener>(&self, receiver_id: &str, listener: Arc<L>) {
        self.register(receiver_id, listener.handlers());
    }

    pub fn unregister(&self, receiver_id: &str) {
        if self.is_closed() {
            return;
        }
        self.registry.unregister(receiver_id);
    }

    pub fn receiver_count(&self) -> usize {
        self.registry.len()
    }

    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.transport.close();
        self.registry.clear();
        tracing::debug!(channel = %self.channel(), "bus closed");
    }
}

impl Drop for MessageBus {
    fn drop(&mut self) {
        self.close();
    }
}
