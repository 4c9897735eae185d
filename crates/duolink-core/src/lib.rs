//! duolink core: transport-agnostic event model and error types.
//!
//! This crate defines the wire-level event contract and error surface shared
//! by the gateway and by external collaborators that push notifications into
//! the hub. It intentionally carries no transport or runtime dependencies.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `DuolinkError`/`Result` so production
//! processes do not crash on malformed frames or bad traffic.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{DuolinkError, Result};
pub use protocol::{Event, EventKind, UserId};
