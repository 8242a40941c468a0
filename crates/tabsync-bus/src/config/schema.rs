use serde::Deserialize;
use tabsync_core::error::{Result, TabSyncError};

use crate::store::KvStore;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TabSyncConfig {
    pub version: u32,

    #[serde(default)]
    pub bus: BusSection,

    #[serde(default)]
    pub relay: RelaySection,
}

impl TabSyncConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(TabSyncError::UnsupportedVersion);
        }
        self.bus.validate()?;
        self.relay.validate()?;
        Ok(())
    }
}

/// Which transport backs a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Contexts share a native broadcast primitive.
    #[default]
    Local,
    /// Contexts are isolated and talk through a relay.
    Relay,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BusSection {
    /// Channel name shared by every context that must interoperate.
    #[serde(default = "default_channel")]
    pub channel: String,

    #[serde(default)]
    pub transport: TransportKind,

    /// Per-endpoint inbound queue capacity (relay transport).
    #[serde(default = "default_endpoint_queue")]
    pub endpoint_queue: usize,

    /// Per-forward timeout in the relay fan-out; 0 disables it.
    #[serde(default = "default_forward_timeout_ms")]
    pub forward_timeout_ms: u64,
}

impl Default for BusSection {
    fn default() -> Self {
        Self {
            channel: default_channel(),
            transport: TransportKind::default(),
            endpoint_queue: default_endpoint_queue(),
            forward_timeout_ms: default_forward_timeout_ms(),
        }
    }
}

impl BusSection {
    pub fn validate(&self) -> Result<()> {
        if self.channel.trim().is_empty() {
            return Err(TabSyncError::BadRequest("bus.channel must not be empty".into()));
        }
        if !(1..=65536).contains(&self.endpoint_queue) {
            return Err(TabSyncError::BadRequest(
                "bus.endpoint_queue must be between 1 and 65536".into(),
            ));
        }
        if self.forward_timeout_ms > 60000 {
            return Err(TabSyncError::BadRequest(
                "bus.forward_timeout_ms must be at most 60000".into(),
            ));
        }
        Ok(())
    }

    /// Channel name, overridden by the store's `channel_name` key when set.
    pub fn resolve_channel(&self, store: &dyn KvStore) -> String {
        crate::store::channel_name(store, &self.channel)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            ping_interval_ms: default_ping_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

impl RelaySection {
    pub fn validate(&self) -> Result<()> {
        if !(5000..=120000).contains(&self.ping_interval_ms) {
            return Err(TabSyncError::BadRequest(
                "relay.ping_interval_ms must be between 5000 and 120000".into(),
            ));
        }
        if !(10000..=600000).contains(&self.idle_timeout_ms) {
            return Err(TabSyncError::BadRequest(
                "relay.idle_timeout_ms must be between 10000 and 600000".into(),
            ));
        }
        if self.idle_timeout_ms <= self.ping_interval_ms {
            return Err(TabSyncError::BadRequest(
                "relay.idle_timeout_ms must be greater than ping_interval_ms".into(),
            ));
        }
        if !(256..=16 * 1024 * 1024).contains(&self.max_frame_bytes) {
            return Err(TabSyncError::BadRequest(
                "relay.max_frame_bytes must be between 256 and 16777216".into(),
            ));
        }
        Ok(())
    }
}

fn default_channel() -> String {
    "tabsync".into()
}
fn default_endpoint_queue() -> usize {
    256
}
fn default_forward_timeout_ms() -> u64 {
    1500
}
fn default_listen() -> String {
    "127.0.0.1:8787".into()
}
fn default_ping_interval_ms() -> u64 {
    20000
}
fn default_idle_timeout_ms() -> u64 {
    60000
}
fn default_max_frame_bytes() -> usize {
    64 * 1024
}
