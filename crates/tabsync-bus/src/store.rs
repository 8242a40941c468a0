//! Key-value store collaborator (preferences, channel name).

use dashmap::DashMap;
use serde_json::Value;

/// Key under which the shared channel name is persisted.
pub const CHANNEL_NAME_KEY: &str = "channel_name";

/// Opaque preference storage supplied by the embedding context.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str, default: Value) -> Value;
    fn set(&self, key: &str, value: Value);
}

/// In-memory store, for tests and contexts without persistent storage.
#[derive(Default)]
pub struct MemoryStore {
    values: DashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str, default: Value) -> Value {
        self.values
            .get(key)
            .map(|v| v.value().clone())
            .unwrap_or(default)
    }

    fn set(&self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }
}

/// Stored channel name, or `fallback` when unset/blank/not a string.
pub fn channel_name(store: &dyn KvStore, fallback: &str) -> String {
    match store.get(CHANNEL_NAME_KEY, Value::Null) {
        Value::String(s) if !s.trim().is_empty() => s,
        _ => fallback.to_string(),
    }
}
