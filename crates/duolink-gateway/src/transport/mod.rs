//! Transport layer (WebSocket).
//!
//! Exposes the upgrade handler and the per-connection inbound/outbound pumps
//! that bridge one socket to the hub.

pub mod ws;
