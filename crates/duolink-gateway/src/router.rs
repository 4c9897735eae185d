//! Axum router wiring.
//!
//! One WebSocket route, the presence queries, and the operational endpoints.

use axum::{routing::get, Router};

use crate::{api, app_state::AppState, ops, transport};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/ws", get(transport::ws::ws_upgrade))
        .route("/v1/presence", get(api::online_users))
        .route("/v1/presence/:user_id", get(api::check_online))
        .route("/healthz", get(ops::healthz))
        .route("/metrics", get(ops::metrics))
        .with_state(state)
}
