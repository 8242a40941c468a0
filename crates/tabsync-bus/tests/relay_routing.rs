#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Duration};

use tabsync_bus::config::{BusSection, TransportKind};
use tabsync_bus::{
    Backend, Connection, Delivery, FanoutReport, ForwardError, Forwarder, MessageBus, Relay,
};
use tabsync_core::{EndpointId, Envelope};

use common::Recorder;

fn relay() -> Relay {
    Relay::new(Duration::from_millis(200))
}

fn tab(relay: &Relay, queue: usize) -> (EndpointId, mpsc::Receiver<Delivery>) {
    let (tx, rx) = mpsc::channel(queue);
    (relay.attach(Arc::new(Connection::new(tx))), rx)
}

async fn recv(rx: &mut mpsc::Receiver<Delivery>) -> Delivery {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for delivery")
        .expect("endpoint queue closed")
}

#[tokio::test]
async fn broadcast_skips_origin_and_close_prunes() {
    let relay = relay();
    let (t1, mut rx1) = tab(&relay, 8);
    let (t2, mut rx2) = tab(&relay, 8);
    let (t3, mut rx3) = tab(&relay, 8);
    for t in [t1, t2, t3] {
        relay.on_register("c", t);
    }

    let report = relay
        .on_broadcast("c", t2, Envelope::new("answer", Some(json!({ "content": "hi" }))))
        .await;
    assert_eq!(report, FanoutReport { delivered: 2, unreachable: 0, failed: 0 });

    for rx in [&mut rx1, &mut rx3] {
        let d = recv(rx).await;
        assert_eq!(&*d.channel, "c");
        assert_eq!(d.envelope.msg_type, "answer");
    }
    assert!(rx2.try_recv().is_err());

    relay.on_endpoint_closed(t3);
    assert_eq!(relay.routes().endpoints("c"), vec![t1, t2]);
    relay.on_endpoint_closed(t2);
    assert_eq!(relay.routes().endpoints("c"), vec![t1]);
}

#[tokio::test]
async fn channel_entry_disappears_with_last_endpoint() {
    let relay = relay();
    let (t1, _rx1) = tab(&relay, 8);
    let (t2, _rx2) = tab(&relay, 8);
    relay.on_register("c", t1);
    relay.on_register("c", t2);
    relay.on_register("other", t2);

    relay.on_unregister("c", t1);
    assert!(relay.routes().has_channel("c"));
    relay.on_endpoint_closed(t2);
    assert!(!relay.routes().has_channel("c"));
    assert!(!relay.routes().has_channel("other"));
    assert!(relay.routes().channels().is_empty());
}

#[tokio::test]
async fn dead_endpoint_is_pruned_lazily() {
    let relay = relay();
    let (t1, mut rx1) = tab(&relay, 8);
    let (t2, rx2) = tab(&relay, 8);
    let (t3, _rx3) = tab(&relay, 8);
    for t in [t1, t2, t3] {
        relay.on_register("c", t);
    }
    // tab 2 went away without telling anyone
    drop(rx2);

    let report = relay.on_broadcast("c", t3, Envelope::new("x", None)).await;
    assert_eq!(report, FanoutReport { delivered: 1, unreachable: 1, failed: 0 });
    recv(&mut rx1).await;
    assert_eq!(relay.routes().endpoints("c"), vec![t1, t3]);
    assert_eq!(relay.endpoint_count(), 2);
}

struct Broken {
    calls: AtomicUsize,
}

#[async_trait]
impl Forwarder for Broken {
    async fn forward(&self, _delivery: Delivery) -> Result<(), ForwardError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ForwardError::Rejected("port disconnected unexpectedly".into()))
    }
}

#[tokio::test]
async fn unexpected_failure_does_not_abort_fan_out() {
    let relay = relay();
    let broken = Arc::new(Broken { calls: AtomicUsize::new(0) });
    let bad = relay.attach(Arc::clone(&broken) as Arc<dyn Forwarder>);
    let (t1, mut rx1) = tab(&relay, 8);
    let (t2, mut rx2) = tab(&relay, 8);
    let (origin, _rx) = tab(&relay, 8);
    for t in [bad, t1, t2, origin] {
        relay.on_register("c", t);
    }

    let report = relay.on_broadcast("c", origin, Envelope::new("x", None)).await;
    assert_eq!(report, FanoutReport { delivered: 2, unreachable: 0, failed: 1 });
    assert_eq!(broken.calls.load(Ordering::SeqCst), 1);
    recv(&mut rx1).await;
    recv(&mut rx2).await;
    // unexpected failures are not treated as stale routes
    assert!(relay.routes().contains("c", bad));
}

#[tokio::test]
async fn full_queue_times_out_without_blocking_others() {
    let relay = relay();
    let (slow, _slow_rx) = tab(&relay, 1);
    let (t1, mut rx1) = tab(&relay, 8);
    let (origin, _rx) = tab(&relay, 8);
    for t in [slow, t1, origin] {
        relay.on_register("c", t);
    }

    let first = relay.on_broadcast("c", origin, Envelope::new("x", None)).await;
    assert_eq!(first.delivered, 2);
    let second = relay.on_broadcast("c", origin, Envelope::new("x", None)).await;
    assert_eq!(second, FanoutReport { delivered: 1, unreachable: 0, failed: 1 });
    recv(&mut rx1).await;
    recv(&mut rx1).await;
}

#[tokio::test]
async fn lifecycle_feed_removes_closed_tabs() {
    let relay = Arc::new(relay());
    let (t1, _rx1) = tab(&relay, 8);
    let (t2, _rx2) = tab(&relay, 8);
    relay.on_register("c", t1);
    relay.on_register("c", t2);

    let (closed_tx, closed_rx) = mpsc::channel(4);
    let watcher = tokio::spawn(Arc::clone(&relay).watch_closures(closed_rx));

    closed_tx.send(t2).await.unwrap();
    drop(closed_tx);
    watcher.await.unwrap();

    assert_eq!(relay.routes().endpoints("c"), vec![t1]);
    assert_eq!(relay.endpoint_count(), 1);
}

#[tokio::test]
async fn buses_over_relay_transport_behave_like_local_ones() {
    let cfg = BusSection {
        transport: TransportKind::Relay,
        ..BusSection::default()
    };
    let backend = Backend::from_config(&cfg);
    assert_eq!(backend.kind(), TransportKind::Relay);

    let m1 = MessageBus::connect(&backend, "c").unwrap();
    let m2 = MessageBus::connect(&backend, "c").unwrap();
    let m3 = MessageBus::connect(&backend, "c").unwrap();
    let mut rec = Recorder::new();
    m1.register("self", rec.handlers("self", &["data"]));
    m2.register("A", rec.handlers("A", &["onMsgData"]));
    m3.register("B", rec.handlers("B", &["onMsgData"]));

    m1.send("data", json!({ "payload": "hi" }));
    let calls = rec.take(2).await;
    assert_eq!(calls[0].0, "A");
    assert_eq!(calls[1].0, "B");
    assert_eq!(calls[0].2, json!({ "payload": "hi" }));

    m1.send_to("B", "data", json!({ "n": 2 }));
    let (tag, _, data) = rec.next().await;
    assert_eq!(tag, "B");
    assert_eq!(data["n"], 2);
    rec.assert_quiet().await;

    let Backend::Relay { relay, .. } = &backend else {
        panic!("expected relay backend");
    };
    assert_eq!(relay.routes().endpoints("c").len(), 3);
    drop(m3);
    m2.close();
    eventually(|| relay.routes().endpoints("c").len() == 1).await;
    drop(m1);
    eventually(|| !relay.routes().has_channel("c") && relay.endpoint_count() == 0).await;
}

fn relay_backend() -> Backend {
    Backend::from_config(&BusSection {
        transport: TransportKind::Relay,
        ..BusSection::default()
    })
}

#[tokio::test]
async fn send_then_close_still_delivers() {
    let backend = relay_backend();
    let m1 = MessageBus::connect(&backend, "c").unwrap();
    let m2 = MessageBus::connect(&backend, "c").unwrap();
    let mut rec = Recorder::new();
    m2.register("A", rec.handlers("A", &["x"]));

    m1.send("x", json!({ "n": 1 }));
    m1.send("x", json!({ "n": 2 }));
    m1.close();

    assert_eq!(rec.next().await.2["n"], 1);
    assert_eq!(rec.next().await.2["n"], 2);
    rec.assert_quiet().await;
}

#[tokio::test]
async fn send_then_drop_still_delivers() {
    let backend = relay_backend();
    let m2 = MessageBus::connect(&backend, "c").unwrap();
    let mut rec = Recorder::new();
    m2.register("A", rec.handlers("A", &["x"]));
    {
        let m1 = MessageBus::connect(&backend, "c").unwrap();
        m1.send("x", json!({ "n": 1 }));
    }
    assert_eq!(rec.next().await.2["n"], 1);

    let Backend::Relay { relay, .. } = &backend else {
        panic!("expected relay backend");
    };
    eventually(|| relay.routes().endpoints("c").len() == 1).await;
}

/// Poll `cond` until it holds (endpoint teardown runs on the uplink task).
async fn eventually(cond: impl Fn() -> bool) {
    timeout(Duration::from_secs(2), async {
        while !cond() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition never held");
}
