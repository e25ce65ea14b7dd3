//! # Core Runtime Module
//!
//! Runtime infrastructure shared by the media crates:
//! - Logging and tracing setup
//! - Configuration (`CoreConfig` builder)
//! - Event bus for provider and playlist notifications
//! - `ChangeSignal`, the invalidation primitive behind live playlist reads

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod signal;

pub use error::{Error, Result};
