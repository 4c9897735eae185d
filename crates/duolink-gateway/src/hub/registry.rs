use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use std::sync::atomic::{AtomicU64, Ordering};

use duolink_core::UserId;

/// Capacity of each connection's private outbound queue.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// One live connection bound to an authenticated user.
///
/// The registry holds the only long-lived clone; dropping it closes the
/// outbound queue, which is how the outbound pump learns the connection is
/// done.
#[derive(Clone)]
pub struct ConnectionHandle {
    pub user_id: UserId,
    pub username: String,
    /// Monotonic per-process sequence. Distinguishes this connection from a
    /// newer one registered under the same identity.
    pub conn_seq: u64,
    tx: mpsc::Sender<Message>,
}

impl ConnectionHandle {
    /// Non-blocking enqueue onto the connection's outbound queue.
    pub fn try_send(&self, msg: Message) -> Result<(), TrySendError<Message>> {
        self.tx.try_send(msg)
    }
}

/// Identity -> connection map. At most one entry per identity; a later
/// registration replaces the earlier one.
///
/// Mutation (`insert` / `remove_current`) happens only on dispatch-loop call
/// paths. Everything else is a read.
pub(crate) struct Registry {
    entries: DashMap<UserId, ConnectionHandle>,
    seq: AtomicU64,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            seq: AtomicU64::new(1),
        }
    }

    /// Build a handle for a fresh connection, pairing it with `tx`.
    pub fn new_handle(
        &self,
        user_id: UserId,
        username: String,
        tx: mpsc::Sender<Message>,
    ) -> ConnectionHandle {
        ConnectionHandle {
            user_id,
            username,
            conn_seq: self.seq.fetch_add(1, Ordering::Relaxed),
            tx,
        }
    }

    /// Returns the superseded handle, if the identity was already connected.
    pub fn insert(&self, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        self.entries.insert(handle.user_id, handle)
    }

    /// Remove the entry for `user_id` only if it is still the connection
    /// identified by `conn_seq`. Idempotent.
    pub fn remove_current(&self, user_id: UserId, conn_seq: u64) -> bool {
        self.entries
            .remove_if(&user_id, |_, h| h.conn_seq == conn_seq)
            .is_some()
    }

    pub fn get(&self, user_id: UserId) -> Option<ConnectionHandle> {
        self.entries.get(&user_id).map(|r| r.value().clone())
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.entries.contains_key(&user_id)
    }

    /// Point-in-time copy of all registered identities.
    pub fn snapshot(&self) -> Vec<UserId> {
        self.entries.iter().map(|r| *r.key()).collect()
    }

    /// All connections except `user_id`'s own, for presence fan-out.
    pub fn peers(&self, user_id: UserId) -> Vec<ConnectionHandle> {
        self.entries
            .iter()
            .filter(|r| *r.key() != user_id)
            .map(|r| r.value().clone())
            .collect()
    }
}
