//! Unified media library core.
//!
//! Re-exports the service façade so host applications can depend on one
//! crate and pick integrations through features.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;
