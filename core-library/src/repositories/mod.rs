//! # Repositories
//!
//! SQLite-backed persistence behind async traits.
//!
//! - `ProviderConfigRepository` - configured remote provider instances
//! - `PlaylistStore` - playlists kept on the device

pub mod playlist;
pub mod provider_config;

pub use playlist::{LocalPlaylist, PlaylistItem, PlaylistStore, SqlitePlaylistStore};
pub use provider_config::{
    ProviderConfig, ProviderConfigRepository, SqliteProviderConfigRepository,
};
