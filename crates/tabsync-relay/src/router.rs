//! Axum router wiring (HTTP -> WS upgrade, metrics).

use axum::{extract::State, routing::get, Router};

use crate::{app_state::AppState, transport};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/relay", get(transport::ws::ws_upgrade))
        .route("/metrics", get(metrics))
        .with_state(state)
}

async fn metrics(State(app): State<AppState>) -> String {
    let relay = app.relay();
    app.metrics().render(&[
        ("tabsync_relay_channels", relay.routes().channels().len() as u64),
        ("tabsync_relay_endpoints", relay.endpoint_count() as u64),
    ])
}
