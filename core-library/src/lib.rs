//! # Media Library Core
//!
//! The provider-agnostic half of the media core.
//!
//! ## Overview
//!
//! This crate defines:
//! - The media domain model and its identity/content diff contract
//! - `RequestStatus` streams and the uniform `ErrorKind` taxonomy
//! - The `ProviderSource` trait every local or remote source implements
//! - Provider argument schemas and their validation
//! - SQLite persistence for provider configs and device playlists

pub mod arguments;
pub mod db;
pub mod diff;
pub mod error;
pub mod models;
pub mod provider;
pub mod repositories;
pub mod status;

pub use arguments::{
    validate_arguments, ArgumentKind, ArgumentValue, ProviderArgument, ProviderArguments,
};
pub use diff::{diff_lists, Diffable, ListChange};
pub use error::{LibraryError, Result};
pub use models::{
    Album, AlbumDetail, Artist, ArtistDetail, ArtistWorks, Audio, AudioType, Bitmap, Genre,
    GenreDetail, MediaItem, PictureType, Playlist, PlaylistDetail, PlaylistMembership, Reference,
    Thumbnail,
};
pub use provider::{ProviderKey, ProviderSource, ProviderType};
pub use status::{ErrorKind, MediaStream, RequestStatus};
