//! # Media Domain Model
//!
//! Provider-agnostic entities produced by every source. They are immutable
//! values built fresh for each response; identity is always the entity URI.
//!
//! Remote entities use `{server}/{kind}/{id}` URIs, local entities use the
//! device index `content://` scheme. Playable URIs may differ from identity
//! URIs (a remote audio plays from a signed stream URL).

use crate::error::{LibraryError, Result};
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Picture role, following the ID3v2 APIC categories that sources report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PictureType {
    Other,
    FrontCover,
    BackCover,
    Artist,
    Media,
}

/// Decoded RGBA8 pixels.
#[derive(Clone)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pixels: Arc<[u8]>,
}

impl Bitmap {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(LibraryError::invalid_input(
                "bitmap",
                format!(
                    "expected {} bytes for {}x{} RGBA, got {}",
                    expected,
                    width,
                    height,
                    pixels.len()
                ),
            ));
        }
        Ok(Self {
            width,
            height,
            pixels: pixels.into(),
        })
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

impl PartialEq for Bitmap {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.pixels, &other.pixels) {
            return true;
        }
        self.width == other.width && self.height == other.height && self.pixels == other.pixels
    }
}

impl Eq for Bitmap {}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ThumbnailSource {
    Uri(Url),
    Bitmap(Bitmap),
}

/// Artwork reference: a remote URI or an in-memory bitmap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    source: ThumbnailSource,
    pub picture_type: PictureType,
}

impl Thumbnail {
    /// Build from optional parts. The URI wins when both are present;
    /// supplying neither is rejected.
    pub fn new(uri: Option<Url>, bitmap: Option<Bitmap>, picture_type: PictureType) -> Result<Self> {
        let source = match (uri, bitmap) {
            (Some(uri), _) => ThumbnailSource::Uri(uri),
            (None, Some(bitmap)) => ThumbnailSource::Bitmap(bitmap),
            (None, None) => {
                return Err(LibraryError::invalid_input(
                    "thumbnail",
                    "either a uri or a bitmap is required",
                ))
            }
        };
        Ok(Self {
            source,
            picture_type,
        })
    }

    pub fn from_uri(uri: Url, picture_type: PictureType) -> Self {
        Self {
            source: ThumbnailSource::Uri(uri),
            picture_type,
        }
    }

    pub fn from_bitmap(bitmap: Bitmap, picture_type: PictureType) -> Self {
        Self {
            source: ThumbnailSource::Bitmap(bitmap),
            picture_type,
        }
    }

    pub fn uri(&self) -> Option<&Url> {
        match &self.source {
            ThumbnailSource::Uri(uri) => Some(uri),
            ThumbnailSource::Bitmap(_) => None,
        }
    }

    pub fn bitmap(&self) -> Option<&Bitmap> {
        match &self.source {
            ThumbnailSource::Bitmap(bitmap) => Some(bitmap),
            ThumbnailSource::Uri(_) => None,
        }
    }
}

/// A reference to a related entity with its display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub uri: Url,
    pub name: Option<String>,
}

impl Reference {
    pub fn new(uri: Url, name: Option<String>) -> Self {
        Self { uri, name }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Album {
    pub uri: Url,
    pub title: String,
    pub artist_uri: Option<Url>,
    pub artist_name: Option<String>,
    pub year: Option<i32>,
    pub thumbnail: Option<Thumbnail>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artist {
    pub uri: Url,
    pub name: String,
    pub thumbnail: Option<Thumbnail>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioType {
    Music,
    Podcast,
    Audiobook,
    Recording,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Audio {
    pub uri: Url,
    pub playable_uri: Url,
    pub mime_type: String,
    pub title: String,
    pub audio_type: AudioType,
    pub duration_ms: u64,
    pub artist: Option<Reference>,
    pub album: Option<Reference>,
    pub genre: Option<Reference>,
    pub track_number: Option<u32>,
    pub year: Option<i32>,
}

/// A genre. Unnamed genres are valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Genre {
    pub uri: Url,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    pub uri: Url,
    pub name: String,
}

/// Everything an artist appears in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtistWorks {
    pub albums: Vec<Album>,
    pub appears_on: Vec<Album>,
    pub playlists: Vec<Playlist>,
}

/// Album with its tracks in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumDetail {
    pub album: Album,
    pub audios: Vec<Audio>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistDetail {
    pub artist: Artist,
    pub works: ArtistWorks,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenreDetail {
    pub genre: Genre,
    pub audios: Vec<Audio>,
}

/// Playlist with its entries in order. An audio may appear more than once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistDetail {
    pub playlist: Playlist,
    pub audios: Vec<Audio>,
}

/// Whether a given audio is part of `playlist`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistMembership {
    pub playlist: Playlist,
    pub contains: bool,
}

/// Heterogeneous search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaItem {
    Album(Album),
    Artist(Artist),
    Audio(Audio),
    Genre(Genre),
    Playlist(Playlist),
}

impl MediaItem {
    pub fn uri(&self) -> &Url {
        match self {
            MediaItem::Album(album) => &album.uri,
            MediaItem::Artist(artist) => &artist.uri,
            MediaItem::Audio(audio) => &audio.uri,
            MediaItem::Genre(genre) => &genre.uri,
            MediaItem::Playlist(playlist) => &playlist.uri,
        }
    }
}
