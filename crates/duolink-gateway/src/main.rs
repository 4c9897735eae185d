//! duolink gateway binary.
//!
//! Presence and message-delivery hub for one-to-one chat:
//! - WebSocket endpoint: /v1/ws?token=...
//! - Presence queries: /v1/presence, /v1/presence/:user_id
//! - Tracing via RUST_LOG / EnvFilter

use std::net::SocketAddr;
use tracing_subscriber::{fmt, EnvFilter};

use duolink_gateway::{app_state, config, router};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cfg = config::load_from_file("duolink.yaml").expect("config load failed");
    let listen: SocketAddr = cfg
        .gateway
        .listen
        .parse()
        .expect("gateway.listen must be a valid SocketAddr");

    let state = app_state::AppState::new(cfg);
    let app = router::build_router(state);

    tracing::info!(%listen, "duolink-gateway starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .expect("failed to bind");

    axum::serve(listener, app).await.expect("server failed");
}
