//! tabsync relay
//!
//! - WebSocket endpoint: /v1/relay (one connection per tab)
//! - Prometheus text metrics: /metrics
//! - Config path from `TABSYNC_CONFIG` (default `tabsync.yaml`)

use std::net::SocketAddr;
use tracing_subscriber::{fmt, EnvFilter};

use tabsync_bus::config;
use tabsync_relay::{app_state, router};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::var("TABSYNC_CONFIG").unwrap_or_else(|_| "tabsync.yaml".to_string());
    let cfg = config::load_from_file(&path).expect("config load failed");
    let listen: SocketAddr = cfg
        .relay
        .listen
        .parse()
        .expect("relay.listen must be a valid SocketAddr");

    let state = app_state::AppState::new(cfg);
    let app = router::build_router(state);

    tracing::info!(%listen, "tabsync-relay starting");
    let listener = tokio::net::TcpListener::bind(listen).await.expect("failed to bind");

    axum::serve(listener, app).await.expect("server failed");
}
