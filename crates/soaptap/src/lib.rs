//! Top-level facade crate for soaptap.
//!
//! Re-exports the core primitives and the inspector library so users can depend on a single crate.

pub mod core {
    pub use soaptap_core::*;
}

pub mod inspector {
    pub use soaptap_inspector::*;
}
