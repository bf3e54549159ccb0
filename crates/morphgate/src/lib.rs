//! Top-level facade crate for morphgate.
//!
//! Re-exports core types and the host library so users can depend on a single crate.

pub mod core {
    pub use morphgate_core::*;
}

pub mod host {
    pub use morphgate_host::*;
}
