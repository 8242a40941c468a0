//! Shared helpers: handlers that record calls into a channel.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

use tabsync_bus::Handlers;

/// (receiver tag, message type, payload)
pub type Call = (String, String, Value);

pub struct Recorder {
    tx: mpsc::UnboundedSender<Call>,
    rx: mpsc::UnboundedReceiver<Call>,
}

impl Recorder {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    /// Handlers that record each listed type under `tag`.
    pub fn handlers(&self, tag: &str, types: &[&str]) -> Handlers {
        let mut h = Handlers::new();
        for ty in types {
            let tx = self.tx.clone();
            let tag = tag.to_string();
            let ty_name = ty.to_string();
            h = h.on(ty, move |data| {
                let _ = tx.send((tag.clone(), ty_name.clone(), data.clone()));
                Ok(())
            });
        }
        h
    }

    pub async fn next(&mut self) -> Call {
        timeout(Duration::from_secs(2), self.rx.recv())
            .await
            .expect("timed out waiting for a handler call")
            .expect("recorder closed")
    }

    /// Collect exactly `n` calls, sorted by tag.
    pub async fn take(&mut self, n: usize) -> Vec<Call> {
        let mut v = Vec::with_capacity(n);
        for _ in 0..n {
            v.push(self.next().await);
        }
        v.sort_by(|a, b| a.0.cmp(&b.0));
        v
    }

    /// Assert nothing else arrives within a short window.
    pub async fn assert_quiet(&mut self) {
        if let Ok(Some(call)) = timeout(Duration::from_millis(150), self.rx.recv()).await {
            panic!("unexpected handler call: {call:?}");
        }
    }
}
