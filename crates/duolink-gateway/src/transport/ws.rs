//! WebSocket handler.
//!
//! Responsibilities:
//! - Upgrade HTTP -> WS (token verified before upgrade)
//! - Register the connection with the hub
//! - Run the two pumps: inbound (socket -> hub) and outbound (queue -> socket)
//! - Unregister exactly once when the inbound pump exits

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use serde::Deserialize;
use tokio::sync::mpsc;

use duolink_core::{Event, EventKind, UserId};

use crate::app_state::AppState;
use crate::auth::Identity;
use crate::hub::Hub;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: String,
}

pub async fn ws_upgrade(
    State(app): State<AppState>,
    ws: WebSocketUpgrade,
    Query(q): Query<WsQuery>,
) -> Response {
    let identity = match app.authenticator().verify(&q.token).await {
        Ok(id) => id,
        Err(e) => {
            app.metrics().handshake_rejections.inc(&[]);
            tracing::debug!(error = %e, "ws upgrade rejected");
            return (StatusCode::UNAUTHORIZED, e.client_code().as_str()).into_response();
        }
    };
    ws.on_upgrade(move |socket| run_session(app, identity, socket))
}

/// One connection's lifetime: register, pump both directions, unregister.
async fn run_session(app: AppState, identity: Identity, socket: WebSocket) {
    let hub = app.hub();
    let (handle, out_rx) = hub.connect(identity.user_id, identity.username);
    let user_id = handle.user_id;
    let conn_seq = handle.conn_seq;

    let (ws_tx, ws_rx) = socket.split();

    // Register before the pumps start; anything routed to this user in the
    // meantime buffers in the outbound queue.
    hub.register(handle).await;

    let writer = tokio::spawn(outbound_pump(ws_tx, out_rx));
    inbound_pump(&hub, user_id, ws_rx).await;

    hub.unregister(user_id, conn_seq).await;
    let _ = writer.await;
}

/// Read frames, decode, stamp the authenticated sender, hand off to the hub.
/// Any read failure ends the connection; a malformed frame does not.
async fn inbound_pump(hub: &Hub, user_id: UserId, mut ws_rx: SplitStream<WebSocket>) {
    while let Some(incoming) = ws_rx.next().await {
        let msg = match incoming {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(user_id, error = %e, "websocket read failed");
                break;
            }
        };
        match msg {
            Message::Text(text) => {
                let mut event = match Event::decode(&text) {
                    Ok(ev) => ev,
                    Err(e) => {
                        tracing::debug!(user_id, error = %e, "malformed frame discarded");
                        continue;
                    }
                };
                // Never trust a client-supplied sender.
                event.sender_id = user_id;
                if event.timestamp.is_none() {
                    event.timestamp = Some(Utc::now());
                }
                match event.kind {
                    EventKind::Message => hub.route(event).await,
                    EventKind::Typing | EventKind::Read => {
                        if let Some(receiver_id) = event.receiver_id {
                            hub.notify_user(receiver_id, &event);
                        }
                    }
                    // Clients cannot originate presence or friend events.
                    _ => {}
                }
            }
            Message::Close(_) => break,
            Message::Binary(_) => {
                tracing::debug!(user_id, "binary frame ignored");
            }
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }
}

/// Drain the outbound queue onto the socket. Write failure exits without
/// retry; queue closure sends a protocol close frame first.
async fn outbound_pump(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut out_rx: mpsc::Receiver<Message>,
) {
    while let Some(msg) = out_rx.recv().await {
        if let Err(e) = ws_tx.send(msg).await {
            tracing::debug!(error = %e, "websocket write failed");
            return;
        }
    }
    // Queue closed by the hub: polite close, then drop the socket half.
    let _ = ws_tx.send(Message::Close(None)).await;
    let _ = ws_tx.close().await;
}
