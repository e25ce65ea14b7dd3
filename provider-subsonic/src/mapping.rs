//! Wire entries to domain entities.

use core_library::models::{
    Album, Artist, Audio, AudioType, Genre, PictureType, Playlist, Reference, Thumbnail,
};
use url::Url;

use crate::client::SubsonicClient;
use crate::error::{Result, SubsonicError};
use crate::types::{AlbumId3, ArtistId3, Child, MediaType, PlaylistEntry};
use crate::uri::{EntityKind, UriScheme};

const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

pub(crate) struct Mapper<'a> {
    client: &'a SubsonicClient,
    uris: &'a UriScheme,
}

impl<'a> Mapper<'a> {
    pub fn new(client: &'a SubsonicClient, uris: &'a UriScheme) -> Self {
        Self { client, uris }
    }

    fn cover_art(&self, id: Option<&str>, picture_type: PictureType) -> Result<Option<Thumbnail>> {
        id.map(|id| {
            self.client
                .method_url("getCoverArt", &[("id", Some(id.to_string()))])
                .map(|uri| Thumbnail::from_uri(uri, picture_type))
        })
        .transpose()
    }

    fn reference(&self, kind: EntityKind, id: Option<&str>, name: Option<&str>) -> Result<Option<Reference>> {
        id.map(|id| {
            self.uris
                .entity_uri(kind, id)
                .map(|uri| Reference::new(uri, name.map(str::to_string)))
        })
        .transpose()
    }

    pub fn album(&self, album: &AlbumId3) -> Result<Album> {
        Ok(Album {
            uri: self.uris.entity_uri(EntityKind::Album, &album.id)?,
            title: album.name.clone(),
            artist_uri: album
                .artist_id
                .as_deref()
                .map(|id| self.uris.entity_uri(EntityKind::Artist, id))
                .transpose()?,
            artist_name: album.artist.clone(),
            year: album.year,
            thumbnail: self.cover_art(album.cover_art.as_deref(), PictureType::FrontCover)?,
        })
    }

    /// Artist images prefer the server-provided external URL.
    pub fn artist(&self, artist: &ArtistId3) -> Result<Artist> {
        let thumbnail = match &artist.artist_image_url {
            Some(url) => Some(Thumbnail::from_uri(url.clone(), PictureType::Artist)),
            None => self.cover_art(artist.cover_art.as_deref(), PictureType::Artist)?,
        };
        Ok(Artist {
            uri: self.uris.entity_uri(EntityKind::Artist, &artist.id)?,
            name: artist.name.clone(),
            thumbnail,
        })
    }

    /// # Errors
    /// `UnsupportedMediaType` for video entries.
    pub fn audio(&self, song: &Child) -> Result<Audio> {
        let audio_type = match song.media_type {
            None | Some(MediaType::Music) => AudioType::Music,
            Some(MediaType::Podcast) => AudioType::Podcast,
            Some(MediaType::Audiobook) => AudioType::Audiobook,
            Some(MediaType::Video) => {
                return Err(SubsonicError::UnsupportedMediaType(format!(
                    "video entry {}",
                    song.id
                )))
            }
        };

        Ok(Audio {
            uri: self.uris.entity_uri(EntityKind::Audio, &song.id)?,
            playable_uri: self.stream_url(&song.id)?,
            mime_type: song
                .content_type
                .clone()
                .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string()),
            title: song.title.clone(),
            audio_type,
            duration_ms: u64::from(song.duration.unwrap_or(0)) * 1000,
            artist: self.reference(
                EntityKind::Artist,
                song.artist_id.as_deref(),
                song.artist.as_deref(),
            )?,
            album: self.reference(
                EntityKind::Album,
                song.album_id.as_deref(),
                song.album.as_deref(),
            )?,
            genre: self.reference(
                EntityKind::Genre,
                song.genre.as_deref(),
                song.genre.as_deref(),
            )?,
            track_number: song.track,
            year: song.year,
        })
    }

    pub fn audios(&self, songs: &[Child]) -> Result<Vec<Audio>> {
        songs.iter().map(|song| self.audio(song)).collect()
    }

    pub fn genre(&self, name: &str) -> Result<Genre> {
        Ok(Genre {
            uri: self.uris.entity_uri(EntityKind::Genre, name)?,
            name: Some(name.to_string()).filter(|n| !n.is_empty()),
        })
    }

    pub fn playlist(&self, playlist: &PlaylistEntry) -> Result<Playlist> {
        Ok(Playlist {
            uri: self.uris.entity_uri(EntityKind::Playlist, &playlist.id)?,
            name: playlist.name.clone(),
        })
    }

    fn stream_url(&self, id: &str) -> Result<Url> {
        self.client.method_url("stream", &[("id", Some(id.to_string()))])
    }
}
