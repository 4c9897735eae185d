use std::sync::Arc;

use axum::extract::ws::Message;
use tokio::sync::mpsc;

use duolink_core::{Event, EventKind, UserId};

use crate::hub::registry::{ConnectionHandle, Registry, OUTBOUND_QUEUE_CAPACITY};
use crate::obs::HubMetrics;

/// Capacity of the hub's control channel.
pub const CONTROL_QUEUE_CAPACITY: usize = 1024;

/// Control messages consumed by the dispatch loop.
pub enum HubCommand {
    Register(ConnectionHandle),
    Unregister { user_id: UserId, conn_seq: u64 },
    Route(Event),
}

/// The connection hub.
///
/// Register/unregister/route go through the control channel and are applied
/// by one dispatch task, which serializes all registry mutation and gives
/// each connection hub-dispatch delivery order. `notify_user` and the
/// presence queries read the registry directly from any task.
pub struct Hub {
    registry: Registry,
    cmd_tx: mpsc::Sender<HubCommand>,
    metrics: Arc<HubMetrics>,
}

impl Hub {
    /// Create the hub and start its dispatch task. Must be called from within
    /// a tokio runtime.
    pub fn spawn(metrics: Arc<HubMetrics>) -> Arc<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel(CONTROL_QUEUE_CAPACITY);
        let hub = Arc::new(Self {
            registry: Registry::new(),
            cmd_tx,
            metrics,
        });
        tokio::spawn(Arc::clone(&hub).run(cmd_rx));
        hub
    }

    /// Dispatch loop: single consumer of the control channel.
    async fn run(self: Arc<Self>, mut cmd_rx: mpsc::Receiver<HubCommand>) {
        while let Some(cmd) = cmd_rx.recv().await {
            self.apply(cmd);
        }
        tracing::debug!("hub dispatch loop stopped");
    }

    fn apply(&self, cmd: HubCommand) {
        match cmd {
            HubCommand::Register(handle) => {
                let user_id = handle.user_id;
                tracing::info!(user_id, username = %handle.username, "connection registered");
                if let Some(old) = self.registry.insert(handle) {
                    // Superseded connection: dropping `old` closes its queue,
                    // so its own pumps observe the failure and tear down.
                    tracing::debug!(user_id, old_conn_seq = old.conn_seq, "connection superseded");
                } else {
                    self.metrics.connections_active.inc();
                }
                self.broadcast_presence(user_id, true);
            }
            HubCommand::Unregister { user_id, conn_seq } => {
                if self.registry.remove_current(user_id, conn_seq) {
                    tracing::info!(user_id, "connection unregistered");
                    self.metrics.connections_active.dec();
                    self.broadcast_presence(user_id, false);
                }
            }
            HubCommand::Route(event) => self.route_to_receiver(event),
        }
    }

    /// Hub-mediated point-to-point delivery. A saturated receiver queue is
    /// treated as a dead peer: the event is dropped and the receiver is
    /// forcibly unregistered.
    fn route_to_receiver(&self, event: Event) {
        let Some(receiver_id) = event.receiver_id else {
            tracing::debug!(kind = %event.kind.as_str(), "routed event without receiver dropped");
            return;
        };
        let Some(conn) = self.registry.get(receiver_id) else {
            // Receiver offline: best-effort delivery, nothing to signal back.
            self.metrics.events_dropped.inc(&[("reason", "offline")]);
            return;
        };
        let text = match event.encode() {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(error = %e, "dropping unencodable event");
                return;
            }
        };
        match conn.try_send(Message::Text(text)) {
            Ok(()) => {
                self.metrics.events_routed.inc(&[("kind", event.kind.as_str())]);
            }
            Err(_) => {
                tracing::warn!(user_id = receiver_id, "outbound queue saturated, dropping connection");
                self.metrics.events_dropped.inc(&[("reason", "backpressure")]);
                if self.registry.remove_current(receiver_id, conn.conn_seq) {
                    self.metrics.connections_active.dec();
                    self.broadcast_presence(receiver_id, false);
                }
            }
        }
    }

    /// Fan out one presence transition to every connection except the
    /// subject's own. Serialize once; drop per recipient on a full queue.
    fn broadcast_presence(&self, user_id: UserId, is_online: bool) {
        let event = Event::presence(user_id, is_online);
        let text = match event.encode() {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(error = %e, "presence event encode failed");
                return;
            }
        };
        for conn in self.registry.peers(user_id) {
            if conn.try_send(Message::Text(text.clone())).is_err() {
                self.metrics
                    .events_dropped
                    .inc(&[("reason", "presence_backpressure")]);
            }
        }
        self.metrics
            .presence_broadcasts
            .inc(&[("state", if is_online { "online" } else { "offline" })]);
    }

    /// Allocate the outbound queue and handle for a fresh connection. The
    /// caller keeps the receiver for its outbound pump and passes the handle
    /// to [`Hub::register`].
    pub fn connect(
        &self,
        user_id: UserId,
        username: String,
    ) -> (ConnectionHandle, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        (self.registry.new_handle(user_id, username, tx), rx)
    }

    /// Admit a connection. Always succeeds; an existing connection for the
    /// same identity is silently evicted.
    pub async fn register(&self, handle: ConnectionHandle) {
        self.send(HubCommand::Register(handle)).await;
    }

    /// Retire a connection. A no-op unless the registry still holds this
    /// exact connection.
    pub async fn unregister(&self, user_id: UserId, conn_seq: u64) {
        self.send(HubCommand::Unregister { user_id, conn_seq }).await;
    }

    /// Queue an event for hub-mediated routing to its receiver.
    pub async fn route(&self, event: Event) {
        self.send(HubCommand::Route(event)).await;
    }

    async fn send(&self, cmd: HubCommand) {
        if self.cmd_tx.send(cmd).await.is_err() {
            tracing::error!("hub control channel closed");
        }
    }

    /// Fire-and-forget delivery from a side channel (friend-request flow and
    /// the like). Same non-blocking enqueue as routing, but a full queue here
    /// only means a busy peer: log and keep the connection.
    pub fn notify_user(&self, user_id: UserId, event: &Event) {
        let Some(conn) = self.registry.get(user_id) else {
            return;
        };
        let text = match event.encode() {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(error = %e, "dropping unencodable notification");
                return;
            }
        };
        match conn.try_send(Message::Text(text)) {
            Ok(()) => {
                self.metrics.events_routed.inc(&[("kind", event.kind.as_str())]);
            }
            Err(_) => {
                tracing::warn!(user_id, kind = %event.kind.as_str(), "outbound queue full, notification dropped");
                self.metrics.events_dropped.inc(&[("reason", "notify_full")]);
            }
        }
    }

    /// Build and deliver a server-originated notification in one call.
    pub fn notify(
        &self,
        user_id: UserId,
        kind: EventKind,
        sender_id: UserId,
        payload: &serde_json::Value,
    ) {
        match Event::notification(kind, sender_id, user_id, payload) {
            Ok(event) => self.notify_user(user_id, &event),
            Err(e) => tracing::error!(error = %e, "notification build failed"),
        }
    }

    pub fn is_online(&self, user_id: UserId) -> bool {
        self.registry.contains(user_id)
    }

    pub fn list_online(&self) -> Vec<UserId> {
        self.registry.snapshot()
    }
}
