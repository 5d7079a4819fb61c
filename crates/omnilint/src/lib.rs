//! Top-level facade crate for omnilint.
//!
//! Re-exports the linter core and the gateway library so users can depend on a single crate.

pub mod core {
    pub use omnilint_core::*;
}

pub mod gateway {
    pub use omnilint_gateway::*;
}
