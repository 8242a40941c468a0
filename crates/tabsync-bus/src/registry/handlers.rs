use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use tabsync_core::error::{Result, TabSyncError};
use tabsync_core::protocol::naming;

/// A message handler. Receives the envelope payload (`null` when absent).
pub type HandlerFn = Arc<dyn Fn(&Value) -> Result<()> + Send + Sync>;

/// Explicit handler table for one receiver.
///
/// Keys accept either a plain message type (`"param_changed"`) or a handler
/// name (`"onMsgParamChanged"`); both are normalized to the same routing key.
/// Adding the same key twice keeps the last handler.
#[derive(Clone, Default)]
pub struct Handlers {
    pub(crate) map: HashMap<String, HandlerFn>,
}

impl Handlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&Value) -> Result<()> + Send + Sync + 'static,
    {
        match naming::handler_type(name) {
            Some(key) => {
                self.map.insert(key, Arc::new(f));
            }
            None => tracing::warn!(name, "handler name has no message type; ignored"),
        }
        self
    }

    /// Typed handler: the payload is decoded into `T` before `f` runs.
    /// A payload that does not decode counts as a handler failure.
    pub fn on_json<T, F>(self, name: &str, f: F) -> Self
    where
        T: DeserializeOwned,
        F: Fn(T) -> Result<()> + Send + Sync + 'static,
    {
        let owned = name.to_string();
        self.on(name, move |data| {
            let v: T = serde_json::from_value(data.clone()).map_err(|e| {
                TabSyncError::Handler(format!("{owned}: invalid payload: {e}"))
            })?;
            f(v)
        })
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Normalized message types covered by this table.
    pub fn types(&self) -> Vec<String> {
        let mut v: Vec<String> = self.map.keys().cloned().collect();
        v.sort();
        v
    }
}

/// An object that declares its own handlers.
///
/// ```ignore
/// impl Listener for ChatArea {
///     fn handlers(self: Arc<Self>) -> Handlers {
///         let me = Arc::clone(&self);
///         Handlers::new().on("onMsgAnswer", move |d| me.on_answer(d))
///     }
/// }
/// ```
pub trait Listener: Send + Sync + 'static {
    fn handlers(self: Arc<Self>) -> Handlers;
}
