//! Wire-level event contract.
//!
//! Every routed item, whether it originated from a client frame or from a
//! server-side notifier, is one [`Event`]. The `payload` field stays as
//! `RawValue` so routing code never parses kind-specific data.

mod event;

pub use event::{Event, EventKind, PresencePayload, UserId};
