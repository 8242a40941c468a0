use std::sync::Arc;

use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

use tabsync_core::{EndpointId, Envelope};

use crate::config::BusSection;

use super::endpoints::EndpointRegistry;
use super::forward::{Delivery, ForwardError, Forwarder};
use super::routing::RoutingTable;

/// Result of one broadcast fan-out.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FanoutReport {
    pub delivered: usize,
    /// Stale routes (endpoint gone); pruned after the fan-out.
    pub unreachable: usize,
    /// Unexpected failures (timeouts, rejections).
    pub failed: usize,
}

/// Relay: routing table + endpoint registry, constructed once at relay startup
/// and passed to whatever feeds it endpoint lifecycle events.
pub struct Relay {
    routes: RoutingTable,
    endpoints: EndpointRegistry,
    forward_timeout: Duration,
}

impl Relay {
    /// `forward_timeout` of zero disables the per-forward timeout.
    pub fn new(forward_timeout: Duration) -> Self {
        Self {
            routes: RoutingTable::new(),
            endpoints: EndpointRegistry::new(),
            forward_timeout,
        }
    }

    pub fn from_config(cfg: &BusSection) -> Self {
        Self::new(Duration::from_millis(cfg.forward_timeout_ms))
    }

    pub fn routes(&self) -> &RoutingTable {
        &self.routes
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    /// Attach a new endpoint and return its id.
    pub fn attach(&self, fwd: Arc<dyn Forwarder>) -> EndpointId {
        let id = self.endpoints.allocate();
        self.endpoints.insert(id, fwd);
        tracing::debug!(endpoint = %id, "endpoint attached");
        id
    }

    /// Reserve an id without a forwarder (attach later with `attach_as`).
    pub fn allocate(&self) -> EndpointId {
        self.endpoints.allocate()
    }

    /// Install or replace the forwarder of an existing id.
    pub fn attach_as(&self, id: EndpointId, fwd: Arc<dyn Forwarder>) {
        self.endpoints.insert(id, fwd);
    }

    /// Drop the forwarder but keep routes (they are pruned on next delivery).
    pub fn detach(&self, id: EndpointId) {
        self.endpoints.remove(id);
    }

    pub fn on_register(&self, channel: &str, endpoint: EndpointId) {
        self.routes.insert(channel, endpoint);
        tracing::debug!(channel, %endpoint, "endpoint registered");
    }

    pub fn on_unregister(&self, channel: &str, endpoint: EndpointId) {
        self.routes.remove(channel, endpoint);
        tracing::debug!(channel, %endpoint, "endpoint unregistered");
    }

    /// Eager cleanup after a platform "tab closed" notification.
    pub fn on_endpoint_closed(&self, endpoint: EndpointId) {
        let left = self.routes.remove_endpoint(endpoint);
        self.endpoints.remove(endpoint);
        tracing::debug!(%endpoint, channels = left.len(), "endpoint closed");
    }

    /// Forward `envelope` to every endpoint of `channel` except `origin`.
    ///
    /// Forwards run concurrently; one broken destination never aborts the
    /// others. Unreachable endpoints are pruned from the table afterwards.
    pub async fn on_broadcast(
        &self,
        channel: &str,
        origin: EndpointId,
        envelope: Envelope,
    ) -> FanoutReport {
        let mut report = FanoutReport::default();
        let mut stale = Vec::new();
        let delivery = Delivery::new(channel, envelope);
        let limit = self.forward_timeout;

        let mut futs = FuturesUnordered::new();
        for ep in self.routes.endpoints(channel) {
            if ep == origin {
                continue;
            }
            let Some(fwd) = self.endpoints.get(ep) else {
                report.unreachable += 1;
                stale.push(ep);
                continue;
            };
            let d = delivery.clone();
            futs.push(async move {
                let res = if limit.is_zero() {
                    fwd.forward(d).await
                } else {
                    match timeout(limit, fwd.forward(d)).await {
                        Ok(r) => r,
                        Err(_) => Err(ForwardError::TimedOut),
                    }
                };
                (ep, res)
            });
        }

        while let Some((ep, res)) = futs.next().await {
            match res {
                Ok(()) => report.delivered += 1,
                Err(e) if e.is_expected() => {
                    report.unreachable += 1;
                    stale.push(ep);
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(channel, endpoint = %ep, error = %e, "forward failed");
                }
            }
        }

        for ep in stale {
            tracing::debug!(channel, endpoint = %ep, "pruning unreachable endpoint");
            self.on_endpoint_closed(ep);
        }
        report
    }

    /// Consume a closed-endpoint feed until its sender side is dropped.
    pub async fn watch_closures(self: Arc<Self>, mut closed: mpsc::Receiver<EndpointId>) {
        while let Some(ep) = closed.recv().await {
            self.on_endpoint_closed(ep);
        }
        tracing::debug!("endpoint lifecycle feed ended");
    }
}
