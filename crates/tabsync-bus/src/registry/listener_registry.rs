use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use dashmap::DashMap;

use tabsync_core::protocol::naming;
use tabsync_core::Envelope;

use super::handlers::{HandlerFn, Handlers};

/// Outcome of dispatching one envelope.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handlers invoked (including failed ones).
    pub invoked: usize,
    /// Handlers that returned an error or panicked.
    pub failed: usize,
}

/// Receiver registry:
/// - `receiver_id -> { normalized type -> handler }`
///
/// Owned by one `MessageBus`; never shared across instances.
#[derive(Default)]
pub struct ListenerRegistry {
    receivers: DashMap<String, HashMap<String, HandlerFn>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self {
            receivers: DashMap::new(),
        }
    }

    /// Register (or extend) a receiver. Returns false on misuse.
    ///
    /// An existing receiver keeps its other handlers; a type registered again
    /// is replaced, so the same listener registered twice still fires once.
    pub fn register(&self, receiver_id: &str, handlers: Handlers) -> bool {
        if receiver_id.is_empty() {
            tracing::warn!("register without receiver id ignored");
            return false;
        }
        if handlers.is_empty() {
            tracing::warn!(receiver_id, "register without handlers ignored");
            return false;
        }
        self.receivers
            .entry(receiver_id.to_string())
            .or_default()
            .extend(handlers.map);
        true
    }

    /// Drop a receiver entirely. Unknown ids are fine.
    pub fn unregister(&self, receiver_id: &str) -> bool {
        self.receivers.remove(receiver_id).is_some()
    }

    pub fn clear(&self) {
        self.receivers.clear();
    }

    pub fn len(&self) -> usize {
        self.receivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receivers.is_empty()
    }

    pub fn contains(&self, receiver_id: &str) -> bool {
        self.receivers.contains_key(receiver_id)
    }

    /// Invoke the handlers matching `env`.
    ///
    /// Addressed envelopes reach only their receiver; the rest reach every
    /// receiver with a handler for the type. Handlers are snapshotted first so
    /// they may register/unregister while running.
    pub fn dispatch(&self, env: &Envelope) -> DispatchReport {
        let mut report = DispatchReport::default();
        if !env.is_routable() {
            tracing::trace!("envelope without type dropped");
            return report;
        }

        let key = naming::normalize_type(&env.msg_type);
        let targets: Vec<(String, HandlerFn)> = match env.receiver_id() {
            Some(rid) => self
                .receivers
                .get(rid)
                .and_then(|m| m.get(&key).cloned())
                .map(|h| vec![(rid.to_string(), h)])
                .unwrap_or_default(),
            None => self
                .receivers
                .iter()
                .filter_map(|e| e.value().get(&key).map(|h| (e.key().clone(), h.clone())))
                .collect(),
        };

        let data = env.payload();
        for (receiver_id, handler) in targets {
            report.invoked += 1;
            match panic::catch_unwind(AssertUnwindSafe(|| handler(data))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    report.failed += 1;
                    tracing::warn!(msg_type = %env.msg_type, %receiver_id, error = %e, "handler failed");
                }
                Err(_) => {
                    report.failed += 1;
                    tracing::warn!(msg_type = %env.msg_type, %receiver_id, "handler panicked");
                }
            }
        }
        report
    }
}
