//! Top-level facade crate for meterpush.
//!
//! Re-exports the instrument primitives and the gateway library so users can depend on a single crate.

pub mod core {
    pub use meterpush_core::*;
}

pub mod gateway {
    pub use meterpush_gateway::*;
}
