//! # Subsonic Provider
//!
//! Implements `ProviderSource` for servers speaking the Subsonic REST API
//! (Subsonic, Navidrome, Airsonic, Gonic, ...).
//!
//! ## Overview
//!
//! This module provides:
//! - A method-call client with token (salted MD5) or legacy password auth
//! - Typed JSON envelope models with timestamp, URI and error-code codecs
//! - Mapping of albums, artists, songs, genres and playlists to the domain model
//! - Playlist mutations with change notifications for live playlist reads

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
mod mapping;
pub mod source;
pub mod types;
pub mod uri;

pub use client::{AuthMode, MethodResult, SubsonicClient};
pub use config::{argument_schema, SubsonicConfig};
pub use error::{Result, SubsonicError};
pub use source::SubsonicProvider;
