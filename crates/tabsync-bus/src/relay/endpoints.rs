use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use tabsync_core::EndpointId;

use super::forward::Forwarder;

/// Endpoint registry: `endpoint -> forwarder`.
pub struct EndpointRegistry {
    endpoints: DashMap<EndpointId, Arc<dyn Forwarder>>,
    seq: AtomicU64,
}

impl Default for EndpointRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self {
            endpoints: DashMap::new(),
            seq: AtomicU64::new(1),
        }
    }

    pub fn allocate(&self) -> EndpointId {
        EndpointId(self.seq.fetch_add(1, Ordering::Relaxed))
    }

    /// Install (or replace) the forwarder for `id`.
    pub fn insert(&self, id: EndpointId, fwd: Arc<dyn Forwarder>) {
        self.endpoints.insert(id, fwd);
    }

    pub fn remove(&self, id: EndpointId) -> Option<Arc<dyn Forwarder>> {
        self.endpoints.remove(&id).map(|(_, f)| f)
    }

    pub fn get(&self, id: EndpointId) -> Option<Arc<dyn Forwarder>> {
        self.endpoints.get(&id).map(|r| Arc::clone(r.value()))
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
