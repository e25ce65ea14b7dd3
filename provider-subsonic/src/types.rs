//! Subsonic API response types
//!
//! Data structures for the JSON flavour (`f=json`) of the Subsonic REST API.
//! Lists are always arrays in this format.
//!
//! See: http://www.subsonic.org/pages/api.jsp

use crate::codec::{self, ErrorCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Top-level wrapper around every response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "subsonic-response")]
    pub response: SubsonicResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Failed,
}

/// The response body. At most one result field is populated per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubsonicResponse {
    pub status: ResponseStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SubsonicApiError>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_list2: Option<AlbumList2>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<AlbumWithSongs>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artists: Option<ArtistsIndex>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<ArtistWithAlbums>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genres: Option<Genres>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub songs_by_genre: Option<Songs>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlists: Option<Playlists>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist: Option<PlaylistWithSongs>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_result3: Option<SearchResult3>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub song: Option<Child>,
}

/// Error payload of a `failed` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsonicApiError {
    pub code: ErrorCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `type` attribute of a song entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Music,
    Podcast,
    Audiobook,
    Video,
}

/// A song (or other media file) entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Child {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub is_dir: bool,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_art: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    /// Seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bit_rate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist_id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,
    #[serde(default, with = "codec::instant::option", skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

/// ID3-based album entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumId3 {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_art: Option<String>,
    pub song_count: u32,
    /// Seconds
    pub duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub play_count: Option<u64>,
    #[serde(with = "codec::instant")]
    pub created: DateTime<Utc>,
    #[serde(default, with = "codec::instant::option", skip_serializing_if = "Option::is_none")]
    pub starred: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
}

/// `getAlbum` result: the album plus its songs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlbumWithSongs {
    #[serde(flatten)]
    pub album: AlbumId3,
    #[serde(default)]
    pub song: Vec<Child>,
}

impl AlbumWithSongs {
    pub fn into_parent(self) -> AlbumId3 {
        self.album
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistId3 {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_art: Option<String>,
    #[serde(default, with = "codec::uri::option", skip_serializing_if = "Option::is_none")]
    pub artist_image_url: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_count: Option<u32>,
    #[serde(default, with = "codec::instant::option", skip_serializing_if = "Option::is_none")]
    pub starred: Option<DateTime<Utc>>,
}

/// `getArtist` result: the artist plus their albums.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistWithAlbums {
    #[serde(flatten)]
    pub artist: ArtistId3,
    #[serde(default)]
    pub album: Vec<AlbumId3>,
}

impl ArtistWithAlbums {
    pub fn into_parent(self) -> ArtistId3 {
        self.artist
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumList2 {
    #[serde(default)]
    pub album: Vec<AlbumId3>,
}

/// `getArtists` result, grouped by initial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistsIndex {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignored_articles: Option<String>,
    #[serde(default)]
    pub index: Vec<IndexGroup>,
}

impl ArtistsIndex {
    pub fn into_artists(self) -> impl Iterator<Item = ArtistId3> {
        self.index.into_iter().flat_map(|group| group.artist)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexGroup {
    pub name: String,
    #[serde(default)]
    pub artist: Vec<ArtistId3>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genres {
    #[serde(default)]
    pub genre: Vec<GenreEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenreEntry {
    /// The genre name, which doubles as its id.
    pub value: String,
    #[serde(default)]
    pub song_count: u32,
    #[serde(default)]
    pub album_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Songs {
    #[serde(default)]
    pub song: Vec<Child>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlists {
    #[serde(default)]
    pub playlist: Vec<PlaylistEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistEntry {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public: Option<bool>,
    #[serde(default)]
    pub song_count: u32,
    /// Seconds. Some servers omit it for empty playlists.
    #[serde(default)]
    pub duration: u32,
    #[serde(with = "codec::instant")]
    pub created: DateTime<Utc>,
    #[serde(with = "codec::instant")]
    pub changed: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_art: Option<String>,
}

/// `getPlaylist` result: the playlist plus its entries in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistWithSongs {
    #[serde(flatten)]
    pub playlist: PlaylistEntry,
    #[serde(default)]
    pub entry: Vec<Child>,
}

impl PlaylistWithSongs {
    pub fn into_parent(self) -> PlaylistEntry {
        self.playlist
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult3 {
    #[serde(default)]
    pub artist: Vec<ArtistId3>,
    #[serde(default)]
    pub album: Vec<AlbumId3>,
    #[serde(default)]
    pub song: Vec<Child>,
}
