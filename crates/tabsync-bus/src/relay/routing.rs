use dashmap::{DashMap, DashSet};

use tabsync_core::EndpointId;

/// Routing table: channel -> endpoints, endpoint -> channels.
///
/// Empty sets are removed, never kept. Mutation is reserved to the owning
/// `Relay`.
#[derive(Default)]
pub struct RoutingTable {
    channel_to_endpoints: DashMap<String, DashSet<EndpointId>>,
    endpoint_to_channels: DashMap<EndpointId, DashSet<String>>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self {
            channel_to_endpoints: DashMap::new(),
            endpoint_to_channels: DashMap::new(),
        }
    }

    pub(crate) fn insert(&self, channel: &str, endpoint: EndpointId) {
        self.channel_to_endpoints
            .entry(channel.to_string())
            .or_default()
            .insert(endpoint);

        self.endpoint_to_channels
            .entry(endpoint)
            .or_default()
            .insert(channel.to_string());
    }

    pub(crate) fn remove(&self, channel: &str, endpoint: EndpointId) {
        if let Some(set) = self.channel_to_endpoints.get(channel) {
            set.remove(&endpoint);
        }
        self.channel_to_endpoints
            .remove_if(channel, |_, set| set.is_empty());

        if let Some(set) = self.endpoint_to_channels.get(&endpoint) {
            set.remove(channel);
        }
        self.endpoint_to_channels
            .remove_if(&endpoint, |_, set| set.is_empty());
    }

    /// Remove `endpoint` from every channel. Returns the channels it left.
    pub(crate) fn remove_endpoint(&self, endpoint: EndpointId) -> Vec<String> {
        let Some((_, channels)) = self.endpoint_to_channels.remove(&endpoint) else {
            return Vec::new();
        };
        let mut left = Vec::with_capacity(channels.len());
        for c in channels.into_iter() {
            if let Some(set) = self.channel_to_endpoints.get(&c) {
                set.remove(&endpoint);
            }
            self.channel_to_endpoints
                .remove_if(&c, |_, set| set.is_empty());
            left.push(c);
        }
        left
    }

    pub fn endpoints(&self, channel: &str) -> Vec<EndpointId> {
        let mut v: Vec<EndpointId> = self
            .channel_to_endpoints
            .get(channel)
            .map(|set| set.iter().map(|e| *e.key()).collect())
            .unwrap_or_default();
        v.sort();
        v
    }

    pub fn channels(&self) -> Vec<String> {
        let mut v: Vec<String> = self
            .channel_to_endpoints
            .iter()
            .map(|e| e.key().clone())
            .collect();
        v.sort();
        v
    }

    pub fn contains(&self, channel: &str, endpoint: EndpointId) -> bool {
        self.channel_to_endpoints
            .get(channel)
            .map(|set| set.contains(&endpoint))
            .unwrap_or(false)
    }

    pub fn has_channel(&self, channel: &str) -> bool {
        self.channel_to_endpoints.contains_key(channel)
    }
}
