//! Top-level facade crate for duolink.
//!
//! Re-exports the core types and the gateway library so users can depend on a
//! single crate.

pub mod core {
    pub use duolink_core::*;
}

pub mod gateway {
    pub use duolink_gateway::*;
}
