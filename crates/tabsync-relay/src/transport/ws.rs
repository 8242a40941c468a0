//! WebSocket handler.
//!
//! Responsibilities:
//! - Upgrade HTTP -> WS; each connection becomes one relay endpoint
//! - Lifecycle: ping/pong + idle timeout
//! - Cheap length check, then decode once, then hand the frame to the uplink
//! - Uplink task applies frames in arrival order, so a slow fan-out never
//!   stalls delivery to this endpoint
//! - On disconnect, eagerly remove the endpoint from every channel

use std::sync::Arc;

use axum::{
    extract::{ws::Message, ws::WebSocket, ws::WebSocketUpgrade, State},
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};

use tabsync_bus::{Connection, Delivery, FanoutReport};
use tabsync_core::error::{Result, TabSyncError};
use tabsync_core::protocol::relay::{ClientFrame, ServerFrame};
use tabsync_core::EndpointId;

use crate::app_state::AppState;
use crate::transport::codec::{decode, encode, error_frame, frame_len, Inbound};

// --------------------
// Entry
// --------------------
pub async fn ws_upgrade(State(app): State<AppState>, ws: WebSocketUpgrade) -> Response {
    app.metrics().ws_upgrades.inc(&[]);
    ws.on_upgrade(move |socket| async move {
        let relay = app.relay();
        let metrics = app.metrics();

        let (deliver_tx, deliver_rx) = mpsc::channel::<Delivery>(app.cfg().bus.endpoint_queue);
        let endpoint = relay.attach(Arc::new(Connection::new(deliver_tx)));
        metrics.sessions_active.inc();
        tracing::info!(%endpoint, "relay session opened");

        let (uplink_tx, uplink) = spawn_uplink(app.clone(), endpoint);
        if let Err(e) = run_session(&app, endpoint, deliver_rx, uplink_tx, socket).await {
            tracing::debug!(%endpoint, error = %e, "relay session ended with error");
        }
        // frames already accepted are still applied before the endpoint goes away
        if let Err(e) = uplink.await {
            tracing::warn!(%endpoint, error = %e, "relay uplink task failed");
        }

        relay.on_endpoint_closed(endpoint);
        metrics.sessions_active.dec();
        tracing::info!(%endpoint, "relay session closed");
    })
}

/// Apply one decoded frame to the relay. Broadcasts are awaited here, which
/// keeps them FIFO per endpoint; their fan-out report is returned.
pub async fn handle_frame(app: &AppState, endpoint: EndpointId, frame: ClientFrame) -> Option<FanoutReport> {
    let relay = app.relay();
    app.metrics().frames_in.inc(&[("op", frame.op())]);
    match frame {
        ClientFrame::Register { channel } => {
            relay.on_register(&channel, endpoint);
            None
        }
        ClientFrame::Unregister { channel } => {
            relay.on_unregister(&channel, endpoint);
            None
        }
        ClientFrame::Broadcast { channel, envelope } => {
            let report = relay.on_broadcast(&channel, endpoint, envelope).await;
            app.metrics().record_fanout(&report);
            Some(report)
        }
    }
}

fn spawn_uplink(app: AppState, endpoint: EndpointId) -> (mpsc::UnboundedSender<ClientFrame>, JoinHandle<()>) {
    // Unbounded: the socket loop must never wait on the relay.
    let (tx, mut rx) = mpsc::unbounded_channel::<ClientFrame>();
    let task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            handle_frame(&app, endpoint, frame).await;
        }
    });
    (tx, task)
}

// --------------------
// Core session loop
// --------------------
async fn run_session(
    app: &AppState,
    endpoint: EndpointId,
    mut deliver_rx: mpsc::Receiver<Delivery>,
    uplink: mpsc::UnboundedSender<ClientFrame>,
    socket: WebSocket,
) -> Result<()> {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let hello = encode(&ServerFrame::Hello { endpoint })?;
    ws_tx
        .send(hello)
        .await
        .map_err(|e| TabSyncError::Closed(format!("hello failed: {e}")))?;

    let relay_cfg = &app.cfg().relay;
    let ping_every = Duration::from_millis(relay_cfg.ping_interval_ms);
    let idle_timeout = Duration::from_millis(relay_cfg.idle_timeout_ms);
    let max_frame = relay_cfg.max_frame_bytes;

    let mut ping_tick = tokio::time::interval(ping_every);
    ping_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut last_activity = Instant::now();

    loop {
        let outgoing: Option<Message> = tokio::select! {
            // relay -> endpoint
            maybe_delivery = deliver_rx.recv() => {
                let Some(d) = maybe_delivery else { break; };
                let frame = ServerFrame::Deliver {
                    channel: d.channel.to_string(),
                    envelope: (*d.envelope).clone(),
                };
                Some(encode(&frame)?)
            }

            // endpoint -> relay
            incoming = ws_rx.next() => {
                let Some(Ok(msg)) = incoming else { break; };
                last_activity = Instant::now();

                if frame_len(&msg) > max_frame {
                    app.metrics().decode_errors.inc(&[("reason", "too_large")]);
                    Some(encode(&error_frame(&TabSyncError::PayloadTooLarge))?)
                } else {
                    match decode(msg) {
                        Ok(Inbound::Frame { frame, .. }) => {
                            if uplink.send(frame).is_err() {
                                break;
                            }
                            None
                        }
                        Ok(Inbound::Ping(payload)) => Some(Message::Pong(payload)),
                        Ok(Inbound::Pong(_)) => None,
                        Ok(Inbound::Close) => break,
                        Err(e) => {
                            app.metrics().decode_errors.inc(&[("reason", "invalid")]);
                            tracing::debug!(%endpoint, error = %e, "frame rejected");
                            Some(encode(&error_frame(&e))?)
                        }
                    }
                }
            }

            _ = ping_tick.tick() => Some(Message::Ping(Vec::new())),

            _ = tokio::time::sleep(Duration::from_millis(250)) => {
                if last_activity.elapsed() >= idle_timeout {
                    tracing::debug!(%endpoint, "idle timeout");
                    break;
                }
                None
            }
        };

        if let Some(m) = outgoing {
            if ws_tx.send(m).await.is_err() {
                break;
            }
        }
    }

    Ok(())
}
