//! JSON event envelope shared by the hub, the pumps, and external notifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::error::{DuolinkError, Result};

/// User identity as assigned by the account store.
pub type UserId = u64;

/// Routable event kinds.
///
/// Wire names match what clients already send (`type` field). Kinds the
/// server does not recognize decode to [`EventKind::Unknown`] instead of
/// failing the whole frame; the inbound pump ignores them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// One-to-one chat message.
    Message,
    /// Typing indicator.
    Typing,
    /// Read receipt.
    Read,
    /// Friend request notification (server-originated).
    FriendRequest,
    /// Friend request accepted (server-originated).
    FriendAccepted,
    /// Friend request rejected (server-originated).
    FriendRejected,
    /// Presence: user came online (hub-originated).
    Online,
    /// Presence: user went offline (hub-originated).
    Offline,
    #[serde(other)]
    Unknown,
}

impl EventKind {
    /// Wire name, also used as a metrics label.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Message => "message",
            EventKind::Typing => "typing",
            EventKind::Read => "read",
            EventKind::FriendRequest => "friend_request",
            EventKind::FriendAccepted => "friend_accepted",
            EventKind::FriendRejected => "friend_rejected",
            EventKind::Online => "online",
            EventKind::Offline => "offline",
            EventKind::Unknown => "unknown",
        }
    }
}

/// Payload of hub-originated presence events.
#[derive(Debug, Serialize, Deserialize)]
pub struct PresencePayload {
    pub user_id: UserId,
    pub is_online: bool,
}

/// One routed item.
///
/// Stable wire shape: `{type, sender_id, receiver_id?, payload?, timestamp?}`.
/// `sender_id` on inbound frames is advisory only; the inbound pump overwrites
/// it with the connection's authenticated identity before routing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default)]
    pub sender_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<UserId>,
    /// Kind-specific data, kept raw (never parsed by the routing path).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Box<RawValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Event {
    /// Decode one inbound text frame.
    pub fn decode(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| DuolinkError::BadRequest(format!("event decode failed: {e}")))
    }

    /// Serialize for the wire. Done once per delivery target set.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| DuolinkError::Internal(format!("event encode failed: {e}")))
    }

    /// Hub-originated presence transition for `user_id`.
    pub fn presence(user_id: UserId, is_online: bool) -> Self {
        let payload = serde_json::value::to_raw_value(&PresencePayload { user_id, is_online }).ok();
        Self {
            kind: if is_online { EventKind::Online } else { EventKind::Offline },
            sender_id: user_id,
            receiver_id: None,
            payload,
            timestamp: Some(Utc::now()),
        }
    }

    /// Server-originated notification addressed to one user, for side-channel
    /// flows (friend requests and the like) that bypass the inbound pump.
    pub fn notification(
        kind: EventKind,
        sender_id: UserId,
        receiver_id: UserId,
        payload: &serde_json::Value,
    ) -> Result<Self> {
        let payload = serde_json::value::to_raw_value(payload)
            .map_err(|e| DuolinkError::Internal(format!("payload encode failed: {e}")))?;
        Ok(Self {
            kind,
            sender_id,
            receiver_id: Some(receiver_id),
            payload: Some(payload),
            timestamp: Some(Utc::now()),
        })
    }
}
