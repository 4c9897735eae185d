//! duolink gateway library entry.
//!
//! This crate wires the connection hub, the per-connection pumps, transport,
//! config, and presence queries into a cohesive realtime stack. It is
//! consumed by the binary (`main.rs`) and by integration tests.

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod hub;
pub mod obs;
pub mod ops;
pub mod router;
pub mod transport;
