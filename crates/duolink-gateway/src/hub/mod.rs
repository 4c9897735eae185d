//! Connection hub: the registry of live connections and the dispatch loop
//! that serializes registry mutation and event routing.
//!
//! Concurrency contract:
//! - `Register` / `Unregister` / `Route` funnel through one control channel
//!   with a single consumer task; that task is the only writer of the
//!   registry.
//! - `notify_user`, `is_online`, and `list_online` are called concurrently
//!   from arbitrary tasks and only read the registry.

mod dispatch;
mod registry;

pub use dispatch::{Hub, HubCommand, CONTROL_QUEUE_CAPACITY};
pub use registry::{ConnectionHandle, OUTBOUND_QUEUE_CAPACITY};
