//! Presence query endpoints.
//!
//! - `GET /v1/presence`          : snapshot of online identities
//! - `GET /v1/presence/:user_id` : O(1) membership test

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use duolink_core::UserId;

use crate::app_state::AppState;

pub async fn online_users(State(app): State<AppState>) -> impl IntoResponse {
    let online_users = app.hub().list_online();
    Json(json!({
        "online_users": online_users,
        "total": online_users.len(),
    }))
}

pub async fn check_online(
    State(app): State<AppState>,
    Path(user_id): Path<UserId>,
) -> impl IntoResponse {
    Json(json!({
        "user_id": user_id,
        "is_online": app.hub().is_online(user_id),
    }))
}
