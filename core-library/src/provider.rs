//! # Provider Sources
//!
//! The query and mutation surface shared by the local index source and every
//! remote source. Queries are live [`MediaStream`]s; mutations are plain
//! async calls that default to `NotImplemented`.

use crate::error::{LibraryError, Result};
use crate::models::{
    Album, AlbumDetail, Artist, ArtistDetail, Genre, GenreDetail, MediaItem, Playlist,
    PlaylistDetail, PlaylistMembership,
};
use crate::status::MediaStream;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Built-in provider kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    Local,
    Subsonic,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::Local => "local",
            ProviderType::Subsonic => "subsonic",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "local" => Ok(ProviderType::Local),
            "subsonic" => Ok(ProviderType::Subsonic),
            other => Err(LibraryError::invalid_input(
                "provider_type",
                format!("unknown provider type '{}'", other),
            )),
        }
    }
}

/// Identity of a configured provider instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProviderKey {
    pub provider_type: ProviderType,
    pub id: i64,
}

impl ProviderKey {
    pub fn new(provider_type: ProviderType, id: i64) -> Self {
        Self { provider_type, id }
    }
}

impl fmt::Display for ProviderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider_type, self.id)
    }
}

fn not_implemented(operation: &str) -> LibraryError {
    LibraryError::NotImplemented(operation.to_string())
}

/// A source of media entities.
///
/// Every query stream starts fetching when first polled, yields statuses as
/// the underlying data changes and releases its resources when dropped.
/// Detail queries for an unknown identity end with `Error(NotFound)`.
#[async_trait]
pub trait ProviderSource: Send + Sync {
    fn provider_type(&self) -> ProviderType;

    /// True when `uri` identifies an entity this source can answer for.
    fn owns(&self, uri: &Url) -> bool;

    fn albums(&self) -> MediaStream<Vec<Album>>;

    fn artists(&self) -> MediaStream<Vec<Artist>>;

    fn genres(&self) -> MediaStream<Vec<Genre>>;

    fn playlists(&self) -> MediaStream<Vec<Playlist>>;

    fn search(&self, query: &str) -> MediaStream<Vec<MediaItem>>;

    fn album(&self, uri: &Url) -> MediaStream<AlbumDetail>;

    fn artist(&self, uri: &Url) -> MediaStream<ArtistDetail>;

    fn genre(&self, uri: &Url) -> MediaStream<GenreDetail>;

    fn playlist(&self, uri: &Url) -> MediaStream<PlaylistDetail>;

    /// For every playlist, whether it contains `audio_uri`.
    fn audio_playlists_status(&self, audio_uri: &Url) -> MediaStream<Vec<PlaylistMembership>>;

    async fn create_playlist(&self, _name: &str) -> Result<()> {
        Err(not_implemented("create_playlist"))
    }

    async fn rename_playlist(&self, _playlist_uri: &Url, _name: &str) -> Result<()> {
        Err(not_implemented("rename_playlist"))
    }

    async fn delete_playlist(&self, _playlist_uri: &Url) -> Result<()> {
        Err(not_implemented("delete_playlist"))
    }

    async fn add_audio_to_playlist(&self, _audio_uri: &Url, _playlist_uri: &Url) -> Result<()> {
        Err(not_implemented("add_audio_to_playlist"))
    }

    async fn remove_audio_from_playlist(
        &self,
        _audio_uri: &Url,
        _playlist_uri: &Url,
    ) -> Result<()> {
        Err(not_implemented("remove_audio_from_playlist"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{ErrorKind, RequestStatus};
    use futures::stream::{self, StreamExt};

    struct ReadOnlySource;

    fn empty<T: Send + 'static>() -> MediaStream<T> {
        stream::empty().boxed()
    }

    #[async_trait]
    impl ProviderSource for ReadOnlySource {
        fn provider_type(&self) -> ProviderType {
            ProviderType::Local
        }

        fn owns(&self, uri: &Url) -> bool {
            uri.scheme() == "content"
        }

        fn albums(&self) -> MediaStream<Vec<Album>> {
            stream::iter([RequestStatus::Success(Vec::new())]).boxed()
        }

        fn artists(&self) -> MediaStream<Vec<Artist>> {
            empty()
        }

        fn genres(&self) -> MediaStream<Vec<Genre>> {
            empty()
        }

        fn playlists(&self) -> MediaStream<Vec<Playlist>> {
            empty()
        }

        fn search(&self, _query: &str) -> MediaStream<Vec<MediaItem>> {
            empty()
        }

        fn album(&self, _uri: &Url) -> MediaStream<AlbumDetail> {
            stream::iter([RequestStatus::Error(ErrorKind::NotFound)]).boxed()
        }

        fn artist(&self, _uri: &Url) -> MediaStream<ArtistDetail> {
            empty()
        }

        fn genre(&self, _uri: &Url) -> MediaStream<GenreDetail> {
            empty()
        }

        fn playlist(&self, _uri: &Url) -> MediaStream<PlaylistDetail> {
            empty()
        }

        fn audio_playlists_status(&self, _audio_uri: &Url) -> MediaStream<Vec<PlaylistMembership>> {
            empty()
        }
    }

    #[tokio::test]
    async fn test_mutations_default_to_not_implemented() {
        let source = ReadOnlySource;
        let playlist = Url::parse("content://media/external/audio/playlists/1").unwrap();

        let err = source.create_playlist("Mix").await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::NotImplemented));
        let err = source
            .remove_audio_from_playlist(&playlist, &playlist)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::NotImplemented));
    }

    #[tokio::test]
    async fn test_streams_are_consumable() {
        let source = ReadOnlySource;
        let statuses: Vec<_> = source.albums().collect().await;
        assert_eq!(statuses, vec![RequestStatus::Success(Vec::new())]);

        let uri = Url::parse("content://media/external/audio/albums/9").unwrap();
        assert!(source.owns(&uri));
        let detail: Vec<_> = source.album(&uri).collect().await;
        assert_eq!(detail, vec![RequestStatus::Error(ErrorKind::NotFound)]);
    }

    #[test]
    fn test_provider_type_parsing() {
        assert_eq!("subsonic".parse::<ProviderType>().unwrap(), ProviderType::Subsonic);
        assert!("ampache".parse::<ProviderType>().is_err());
        assert_eq!(
            ProviderKey::new(ProviderType::Subsonic, 3).to_string(),
            "subsonic:3"
        );
    }
}
