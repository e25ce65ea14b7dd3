//! # Local Index Provider
//!
//! Exposes the host's on-device media index as a [`ProviderSource`].
//!
//! ## Overview
//!
//! This module provides:
//! - `content://media/external/audio/...` identity URIs
//! - Mapping of loosely typed index rows to the domain model
//! - Live queries that re-read on index change notifications
//! - Best-effort album and artist thumbnails decoded into bitmaps
//!
//! [`ProviderSource`]: core_library::provider::ProviderSource

mod mapping;
pub mod source;
pub mod thumbnails;
pub mod uri;

pub use source::LocalIndexSource;
