//! Shared application state for the relay process.

use std::sync::Arc;

use tabsync_bus::config::TabSyncConfig;
use tabsync_bus::Relay;

use crate::obs::metrics::RelayMetrics;

#[derive(Clone)]
pub struct AppState {
    cfg: Arc<TabSyncConfig>,
    relay: Arc<Relay>,
    metrics: Arc<RelayMetrics>,
}

impl AppState {
    /// The relay (and its routing table) is built once here and shared by
    /// every session.
    pub fn new(cfg: TabSyncConfig) -> Self {
        let relay = Arc::new(Relay::from_config(&cfg.bus));
        Self {
            cfg: Arc::new(cfg),
            relay,
            metrics: Arc::new(RelayMetrics::default()),
        }
    }

    pub fn cfg(&self) -> &TabSyncConfig {
        &self.cfg
    }

    pub fn relay(&self) -> Arc<Relay> {
        Arc::clone(&self.relay)
    }

    pub fn metrics(&self) -> Arc<RelayMetrics> {
        Arc::clone(&self.metrics)
    }
}
