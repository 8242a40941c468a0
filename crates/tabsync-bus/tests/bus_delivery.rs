#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};

use tabsync_bus::{Backend, ChannelTransport, Handlers, Listener, LocalHub, MessageBus};
use tabsync_core::TabSyncError;

use common::Recorder;

fn bus(hub: &Arc<LocalHub>, channel: &str) -> MessageBus {
    MessageBus::connect(&Backend::Local(Arc::clone(hub)), channel).unwrap()
}

#[tokio::test]
async fn single_receiver_gets_payload() {
    let hub = Arc::new(LocalHub::new());
    let m1 = bus(&hub, "c");
    let m2 = bus(&hub, "c");
    let mut rec = Recorder::new();
    m2.register("r1", rec.handlers("r1", &["onMsgTest"]));

    m1.send("test", json!({ "count": 1 }));

    let (tag, _, data) = rec.next().await;
    assert_eq!(tag, "r1");
    assert_eq!(data, json!({ "count": 1 }));
    rec.assert_quiet().await;
}

#[tokio::test]
async fn fan_out_reaches_every_subscriber_but_not_the_sender() {
    let hub = Arc::new(LocalHub::new());
    let mut rec = Recorder::new();

    let sender = bus(&hub, "c");
    sender.register("self", rec.handlers("self", &["data"]));

    let receivers: Vec<MessageBus> = (0..4).map(|_| bus(&hub, "c")).collect();
    for (i, b) in receivers.iter().enumerate() {
        let tag = format!("r{i}");
        b.register(&tag, rec.handlers(&tag, &["onMsgData"]));
    }

    sender.send("data", json!({ "payload": "hi" }));

    let calls = rec.take(4).await;
    let tags: Vec<&str> = calls.iter().map(|c| c.0.as_str()).collect();
    assert_eq!(tags, vec!["r0", "r1", "r2", "r3"]);
    assert!(calls.iter().all(|c| c.2 == json!({ "payload": "hi" })));
    rec.assert_quiet().await;
}

#[tokio::test]
async fn pure_sender_transport_is_not_a_subscriber() {
    let hub = Arc::new(LocalHub::new());
    let poster = hub.open("c");
    let m2 = bus(&hub, "c");
    let m3 = bus(&hub, "c");
    let mut rec = Recorder::new();
    m2.register("a", rec.handlers("a", &["x"]));
    m3.register("b", rec.handlers("b", &["x"]));
    assert_eq!(hub.subscriber_count("c"), 2);

    poster.post(tabsync_core::Envelope::new("x", None)).unwrap();

    let calls = rec.take(2).await;
    assert_eq!(calls[0].0, "a");
    assert_eq!(calls[1].0, "b");
    assert_eq!(calls[0].2, Value::Null);
}

#[tokio::test]
async fn addressed_delivery_skips_other_receivers() {
    let hub = Arc::new(LocalHub::new());
    let m1 = bus(&hub, "c");
    let m2 = bus(&hub, "c");
    let mut rec = Recorder::new();
    m2.register("A", rec.handlers("A", &["x"]));
    m2.register("B", rec.handlers("B", &["x"]));

    m1.send_to("A", "x", json!({ "n": 1 }));

    let (tag, _, data) = rec.next().await;
    assert_eq!(tag, "A");
    assert_eq!(data["receiverId"], "A");
    assert_eq!(data["n"], 1);
    rec.assert_quiet().await;
}

#[tokio::test]
async fn broadcast_reaches_all_receivers_of_one_bus() {
    let hub = Arc::new(LocalHub::new());
    let m1 = bus(&hub, "c");
    let m2 = bus(&hub, "c");
    let mut rec = Recorder::new();
    m2.register("A", rec.handlers("A", &["x"]));
    m2.register("B", rec.handlers("B", &["x", "y"]));

    m1.send("x", json!({}));

    let calls = rec.take(2).await;
    assert_eq!(calls[0].0, "A");
    assert_eq!(calls[1].0, "B");
    rec.assert_quiet().await;
}

#[tokio::test]
async fn types_route_to_their_own_handlers() {
    let hub = Arc::new(LocalHub::new());
    let m1 = bus(&hub, "c");
    let m2 = bus(&hub, "c");
    let mut rec = Recorder::new();
    m2.register("r1", rec.handlers("r1", &["onMsgInfo", "onMsgWarning"]));

    m1.send("info", json!({ "a": 1 }));
    m1.send("warning", json!({ "b": 2 }));

    // FIFO per sender -> receiver
    let first = rec.next().await;
    let second = rec.next().await;
    assert_eq!((first.1.as_str(), first.2), ("onMsgInfo", json!({ "a": 1 })));
    assert_eq!((second.1.as_str(), second.2), ("onMsgWarning", json!({ "b": 2 })));
    rec.assert_quiet().await;
}

#[tokio::test]
async fn unregister_stops_delivery() {
    let hub = Arc::new(LocalHub::new());
    let m1 = bus(&hub, "c");
    let m2 = bus(&hub, "c");
    let mut rec = Recorder::new();
    m2.register("r1", rec.handlers("r1", &["onMsgTest"]));
    m2.register("probe", rec.handlers("probe", &["probe"]));

    m1.send("test", json!({}));
    assert_eq!(rec.next().await.0, "r1");

    m2.unregister("r1");
    m1.send("test", json!({}));
    m1.send_to("r1", "test", json!({}));
    m1.send("probe", json!({}));

    // the probe was sent last, so the earlier envelopes were already handled
    assert_eq!(rec.next().await.0, "probe");
    rec.assert_quiet().await;
}

#[tokio::test]
async fn throwing_handler_does_not_block_others() {
    let hub = Arc::new(LocalHub::new());
    let m1 = bus(&hub, "c");
    let m2 = bus(&hub, "c");
    let mut rec = Recorder::new();
    m2.register(
        "bad",
        Handlers::new().on("x", |_| Err(TabSyncError::handler("boom"))),
    );
    m2.register("good", rec.handlers("good", &["x"]));

    m1.send("x", json!({}));
    m1.send("x", json!({}));

    assert_eq!(rec.next().await.0, "good");
    assert_eq!(rec.next().await.0, "good");
    rec.assert_quiet().await;
}

#[tokio::test]
async fn type_names_match_across_case_styles() {
    let hub = Arc::new(LocalHub::new());
    let m1 = bus(&hub, "c");
    let m2 = bus(&hub, "c");
    let mut rec = Recorder::new();
    m2.register("r1", rec.handlers("r1", &["onMsgParamChanged"]));

    for t in ["param_changed", "paramChanged", "PARAM_CHANGED"] {
        m1.send(t, json!({ "via": t }));
    }

    for t in ["param_changed", "paramChanged", "PARAM_CHANGED"] {
        assert_eq!(rec.next().await.2["via"], t);
    }
    rec.assert_quiet().await;
}

#[tokio::test]
async fn channels_are_isolated() {
    let hub = Arc::new(LocalHub::new());
    let m1 = bus(&hub, "c");
    let other = bus(&hub, "d");
    let mut rec = Recorder::new();
    other.register("r1", rec.handlers("r1", &["x"]));

    m1.send("x", json!({}));
    rec.assert_quiet().await;
}

#[tokio::test]
async fn closed_bus_is_inert() {
    let hub = Arc::new(LocalHub::new());
    let m1 = bus(&hub, "c");
    let m2 = bus(&hub, "c");
    let mut rec = Recorder::new();
    m2.register("r1", rec.handlers("r1", &["x"]));
    m1.register("r0", rec.handlers("r0", &["x"]));

    m2.close();
    assert!(m2.is_closed());
    assert_eq!(m2.receiver_count(), 0);
    assert_eq!(hub.subscriber_count("c"), 1);

    // none of these may panic
    m2.send("x", json!({}));
    m2.register("r2", rec.handlers("r2", &["x"]));
    m2.unregister("r1");
    m2.close();

    m1.send("x", json!({}));
    rec.assert_quiet().await;
}

#[tokio::test]
async fn dropping_a_bus_releases_its_subscription() {
    let hub = Arc::new(LocalHub::new());
    let m1 = bus(&hub, "c");
    {
        let _m2 = bus(&hub, "c");
        assert_eq!(hub.subscriber_count("c"), 2);
    }
    assert_eq!(hub.subscriber_count("c"), 1);
    drop(m1);
    assert!(hub.channels().is_empty());
}

struct ChatArea {
    answers: AtomicUsize,
}

impl Listener for ChatArea {
    fn handlers(self: Arc<Self>) -> Handlers {
        let me = Arc::clone(&self);
        Handlers::new().on("onMsgAnswer", move |_| {
            me.answers.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

#[tokio::test]
async fn listener_registered_twice_fires_once() {
    let hub = Arc::new(LocalHub::new());
    let m1 = bus(&hub, "c");
    let m2 = bus(&hub, "c");
    let mut rec = Recorder::new();
    let area = Arc::new(ChatArea { answers: AtomicUsize::new(0) });
    m2.register_listener("area-1", Arc::clone(&area));
    m2.register_listener("area-1", Arc::clone(&area));
    m2.register("probe", rec.handlers("probe", &["probe"]));

    m1.send("answer", json!({ "content": "hello" }));
    m1.send("probe", json!({}));
    rec.next().await;

    assert_eq!(area.answers.load(Ordering::SeqCst), 1);
}
