//! Subsonic-backed [`ProviderSource`].
//!
//! Reads are one-shot requests wrapped as streams, except the playlist reads
//! which re-fetch on every notification of this provider's
//! [`ChangeSignal`]. Every playlist mutation fires that signal once it has
//! finished, whether it succeeded or not.

use async_trait::async_trait;
use core_library::models::{
    Album, AlbumDetail, Artist, ArtistDetail, ArtistWorks, Genre, GenreDetail, MediaItem,
    Playlist, PlaylistDetail, PlaylistMembership,
};
use core_library::provider::{ProviderSource, ProviderType};
use core_library::status::{ErrorKind, MediaStream, RequestStatus};
use core_library::{LibraryError, Result};
use core_runtime::signal::ChangeSignal;
use futures::future::{self, try_join_all};
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use bridge_traits::http::HttpClient;

use crate::client::{MethodResult, Param, SubsonicClient};
use crate::codec::ErrorCode;
use crate::config::SubsonicConfig;
use crate::mapping::Mapper;
use crate::types::{SubsonicApiError, SubsonicResponse};
use crate::uri::{EntityKind, UriScheme};

/// Page size for album and genre listings
pub const LIST_SIZE: u32 = 500;

/// Per-category result cap for `search3`
pub const SEARCH_COUNT: u32 = 50;

/// Map a `failed` response onto the uniform error taxonomy.
fn protocol_error(method: &str, error: Option<SubsonicApiError>) -> LibraryError {
    let code = error.as_ref().map(|e| e.code);
    let message = error
        .and_then(|e| e.message)
        .unwrap_or_else(|| format!("{} failed", method));

    match code {
        Some(ErrorCode::WrongCredentials)
        | Some(ErrorCode::TokenAuthNotSupported)
        | Some(ErrorCode::NotAuthorized) => LibraryError::InvalidCredentials(message),
        Some(ErrorCode::NotFound) => LibraryError::from_kind(ErrorKind::NotFound, message),
        _ => LibraryError::Io(message),
    }
}

fn expect<T>(method: &str, result: MethodResult<T>) -> Result<T> {
    match result {
        MethodResult::Success(value) => Ok(value),
        MethodResult::HttpError(status) => Err(LibraryError::Io(format!(
            "{} returned HTTP {}",
            method, status
        ))),
        MethodResult::ProtocolError(error) => Err(protocol_error(method, error)),
    }
}

/// Faults end the stream without a status.
fn settle<T>(operation: &'static str, result: Result<T>) -> Option<RequestStatus<T>> {
    match result {
        Ok(value) => Some(RequestStatus::Success(value)),
        Err(e) => match e.kind() {
            Some(kind) => {
                warn!(operation, error = %e, "Subsonic read failed");
                Some(RequestStatus::Error(kind))
            }
            None => {
                error!(operation, error = %e, "Subsonic contract violation, ending subscription");
                None
            }
        },
    }
}

fn one_shot<T, Fut>(operation: &'static str, fetch: Fut) -> MediaStream<T>
where
    T: Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    stream::once(fetch)
        .filter_map(move |result| future::ready(settle(operation, result)))
        .boxed()
}

fn not_found<T: Send + 'static>() -> MediaStream<T> {
    stream::iter([RequestStatus::Error(ErrorKind::NotFound)]).boxed()
}

struct Inner {
    client: SubsonicClient,
    uris: UriScheme,
    playlists_changed: ChangeSignal,
}

impl Inner {
    fn mapper(&self) -> Mapper<'_> {
        Mapper::new(&self.client, &self.uris)
    }

    async fn invoke<T, F>(&self, method: &str, projection: F, params: Vec<Param>) -> Result<T>
    where
        F: FnOnce(SubsonicResponse) -> Option<T>,
    {
        let result = self.client.call(method, projection, &params).await?;
        expect(method, result)
    }

    fn require_id(&self, uri: &Url, kind: EntityKind) -> Result<String> {
        self.uris
            .id_of(uri, kind)
            .ok_or_else(|| LibraryError::not_found(kind.as_str(), uri))
    }

    async fn notify_after<T>(&self, operation: impl Future<Output = Result<T>>) -> Result<T> {
        let result = operation.await;
        self.playlists_changed.notify();
        result
    }

    async fn albums(&self) -> Result<Vec<Album>> {
        let list = self
            .invoke(
                "getAlbumList2",
                |r| r.album_list2,
                vec![
                    ("type", Some("alphabeticalByName".to_string())),
                    ("size", Some(LIST_SIZE.to_string())),
                ],
            )
            .await?;
        let mapper = self.mapper();
        Ok(list
            .album
            .iter()
            .map(|album| mapper.album(album))
            .collect::<crate::Result<_>>()?)
    }

    async fn artists(&self) -> Result<Vec<Artist>> {
        let index = self.invoke("getArtists", |r| r.artists, vec![]).await?;
        let mapper = self.mapper();
        Ok(index
            .into_artists()
            .map(|artist| mapper.artist(&artist))
            .collect::<crate::Result<_>>()?)
    }

    async fn genres(&self) -> Result<Vec<Genre>> {
        let genres = self.invoke("getGenres", |r| r.genres, vec![]).await?;
        let mapper = self.mapper();
        Ok(genres
            .genre
            .iter()
            .map(|genre| mapper.genre(&genre.value))
            .collect::<crate::Result<_>>()?)
    }

    async fn playlists(&self) -> Result<Vec<Playlist>> {
        let playlists = self.invoke("getPlaylists", |r| r.playlists, vec![]).await?;
        let mapper = self.mapper();
        Ok(playlists
            .playlist
            .iter()
            .map(|playlist| mapper.playlist(playlist))
            .collect::<crate::Result<_>>()?)
    }

    async fn search(&self, query: String) -> Result<Vec<MediaItem>> {
        let count = Some(SEARCH_COUNT.to_string());
        let found = self
            .invoke(
                "search3",
                |r| r.search_result3,
                vec![
                    ("query", Some(query)),
                    ("albumCount", count.clone()),
                    ("artistCount", count.clone()),
                    ("songCount", count),
                ],
            )
            .await?;

        let mapper = self.mapper();
        let mut items = Vec::with_capacity(found.album.len() + found.artist.len() + found.song.len());
        for album in &found.album {
            items.push(MediaItem::Album(mapper.album(album)?));
        }
        for artist in &found.artist {
            items.push(MediaItem::Artist(mapper.artist(artist)?));
        }
        for song in &found.song {
            items.push(MediaItem::Audio(mapper.audio(song)?));
        }
        Ok(items)
    }

    async fn album(&self, id: &str) -> Result<AlbumDetail> {
        let album = self
            .invoke("getAlbum", |r| r.album, vec![("id", Some(id.to_string()))])
            .await?;
        let mapper = self.mapper();
        let audios = mapper.audios(&album.song)?;
        Ok(AlbumDetail {
            album: mapper.album(&album.into_parent())?,
            audios,
        })
    }

    async fn artist(&self, id: &str) -> Result<ArtistDetail> {
        let artist = self
            .invoke("getArtist", |r| r.artist, vec![("id", Some(id.to_string()))])
            .await?;
        let mapper = self.mapper();
        let albums = artist
            .album
            .iter()
            .map(|album| mapper.album(album))
            .collect::<crate::Result<_>>()?;
        Ok(ArtistDetail {
            artist: mapper.artist(&artist.into_parent())?,
            works: ArtistWorks {
                albums,
                ..ArtistWorks::default()
            },
        })
    }

    async fn genre(&self, name: &str) -> Result<GenreDetail> {
        let songs = self
            .invoke(
                "getSongsByGenre",
                |r| r.songs_by_genre,
                vec![
                    ("genre", Some(name.to_string())),
                    ("count", Some(LIST_SIZE.to_string())),
                ],
            )
            .await?;
        let mapper = self.mapper();
        Ok(GenreDetail {
            genre: mapper.genre(name)?,
            audios: mapper.audios(&songs.song)?,
        })
    }

    async fn playlist(&self, id: &str) -> Result<PlaylistDetail> {
        let playlist = self
            .invoke("getPlaylist", |r| r.playlist, vec![("id", Some(id.to_string()))])
            .await?;
        let mapper = self.mapper();
        let audios = mapper.audios(&playlist.entry)?;
        Ok(PlaylistDetail {
            playlist: mapper.playlist(&playlist.into_parent())?,
            audios,
        })
    }

    /// One `getPlaylist` per playlist; only used interactively.
    async fn memberships(&self, audio_id: &str) -> Result<Vec<PlaylistMembership>> {
        let playlists = self.invoke("getPlaylists", |r| r.playlists, vec![]).await?;
        let details = try_join_all(playlists.playlist.iter().map(|playlist| {
            self.invoke(
                "getPlaylist",
                |r| r.playlist,
                vec![("id", Some(playlist.id.clone()))],
            )
        }))
        .await?;

        let mapper = self.mapper();
        details
            .into_iter()
            .map(|detail| -> Result<PlaylistMembership> {
                let contains = detail.entry.iter().any(|entry| entry.id == audio_id);
                Ok(PlaylistMembership {
                    playlist: mapper.playlist(&detail.into_parent())?,
                    contains,
                })
            })
            .collect()
    }

    /// Drop every entry whose id is `audio_id` with a single `updatePlaylist`.
    async fn remove_entries(&self, playlist_id: &str, audio_id: &str) -> Result<()> {
        let playlist = self
            .invoke(
                "getPlaylist",
                |r| r.playlist,
                vec![("id", Some(playlist_id.to_string()))],
            )
            .await?;

        let indexes: Vec<Param> = playlist
            .entry
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.id == audio_id)
            .map(|(index, _)| ("songIndexToRemove", Some(index.to_string())))
            .collect();

        if indexes.is_empty() {
            debug!(playlist_id, audio_id, "Audio not in playlist, nothing to remove");
            return Ok(());
        }

        let mut params = vec![("playlistId", Some(playlist_id.to_string()))];
        params.extend(indexes);
        self.invoke("updatePlaylist", |_| Some(()), params).await
    }
}

/// A configured Subsonic server.
#[derive(Clone)]
pub struct SubsonicProvider {
    inner: Arc<Inner>,
}

impl SubsonicProvider {
    pub fn new(client: SubsonicClient) -> Self {
        let uris = UriScheme::new(client.server());
        Self {
            inner: Arc::new(Inner {
                client,
                uris,
                playlists_changed: ChangeSignal::new(),
            }),
        }
    }

    pub fn from_config(
        http_client: Arc<dyn HttpClient>,
        config: &SubsonicConfig,
        client_name: &str,
    ) -> Self {
        Self::new(SubsonicClient::new(
            http_client,
            config.server.clone(),
            config.username.clone(),
            config.password.clone(),
            config.auth_mode,
            client_name,
        ))
    }

    pub fn client(&self) -> &SubsonicClient {
        &self.inner.client
    }

    /// Fired after every playlist mutation on this provider.
    pub fn playlists_changed(&self) -> &ChangeSignal {
        &self.inner.playlists_changed
    }

    /// Check that the server is reachable and accepts the credentials.
    pub async fn verify(&self) -> Result<()> {
        let result = self.inner.client.ping().await?;
        expect("ping", result)
    }

    /// Re-run `fetch` now and after each playlist change until dropped.
    fn live<T, F, Fut>(&self, operation: &'static str, fetch: F) -> MediaStream<T>
    where
        T: Send + 'static,
        F: Fn(Arc<Inner>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let inner = self.inner.clone();
        let changes = self
            .inner
            .playlists_changed
            .subscribe()
            .into_stream()
            .map(|_| ());

        stream::once(future::ready(()))
            .chain(changes)
            .then(move |()| fetch(inner.clone()))
            .map(move |result| settle(operation, result))
            .take_while(|status| future::ready(status.is_some()))
            .filter_map(future::ready)
            .boxed()
    }
}

#[async_trait]
impl ProviderSource for SubsonicProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Subsonic
    }

    fn owns(&self, uri: &Url) -> bool {
        self.inner.uris.owns(uri)
    }

    fn albums(&self) -> MediaStream<Vec<Album>> {
        let inner = self.inner.clone();
        one_shot("albums", async move { inner.albums().await })
    }

    fn artists(&self) -> MediaStream<Vec<Artist>> {
        let inner = self.inner.clone();
        one_shot("artists", async move { inner.artists().await })
    }

    fn genres(&self) -> MediaStream<Vec<Genre>> {
        let inner = self.inner.clone();
        one_shot("genres", async move { inner.genres().await })
    }

    fn playlists(&self) -> MediaStream<Vec<Playlist>> {
        self.live("playlists", |inner| async move { inner.playlists().await })
    }

    fn search(&self, query: &str) -> MediaStream<Vec<MediaItem>> {
        let inner = self.inner.clone();
        let query = query.to_string();
        one_shot("search", async move { inner.search(query).await })
    }

    fn album(&self, uri: &Url) -> MediaStream<AlbumDetail> {
        let Some(id) = self.inner.uris.id_of(uri, EntityKind::Album) else {
            return not_found();
        };
        let inner = self.inner.clone();
        one_shot("album", async move { inner.album(&id).await })
    }

    fn artist(&self, uri: &Url) -> MediaStream<ArtistDetail> {
        let Some(id) = self.inner.uris.id_of(uri, EntityKind::Artist) else {
            return not_found();
        };
        let inner = self.inner.clone();
        one_shot("artist", async move { inner.artist(&id).await })
    }

    fn genre(&self, uri: &Url) -> MediaStream<GenreDetail> {
        let Some(name) = self.inner.uris.id_of(uri, EntityKind::Genre) else {
            return not_found();
        };
        let inner = self.inner.clone();
        one_shot("genre", async move { inner.genre(&name).await })
    }

    fn playlist(&self, uri: &Url) -> MediaStream<PlaylistDetail> {
        let Some(id) = self.inner.uris.id_of(uri, EntityKind::Playlist) else {
            return not_found();
        };
        self.live("playlist", move |inner| {
            let id = id.clone();
            async move { inner.playlist(&id).await }
        })
    }

    fn audio_playlists_status(&self, audio_uri: &Url) -> MediaStream<Vec<PlaylistMembership>> {
        let Some(audio_id) = self.inner.uris.id_of(audio_uri, EntityKind::Audio) else {
            return not_found();
        };
        self.live("audio_playlists_status", move |inner| {
            let audio_id = audio_id.clone();
            async move { inner.memberships(&audio_id).await }
        })
    }

    #[instrument(skip(self))]
    async fn create_playlist(&self, name: &str) -> Result<()> {
        info!("Creating playlist");
        let inner = &self.inner;
        inner
            .notify_after(inner.invoke(
                "createPlaylist",
                |_| Some(()),
                vec![("name", Some(name.to_string()))],
            ))
            .await
    }

    #[instrument(skip(self), fields(playlist = %playlist_uri))]
    async fn rename_playlist(&self, playlist_uri: &Url, name: &str) -> Result<()> {
        info!("Renaming playlist");
        let inner = &self.inner;
        inner
            .notify_after(async {
                let id = inner.require_id(playlist_uri, EntityKind::Playlist)?;
                inner
                    .invoke(
                        "updatePlaylist",
                        |_| Some(()),
                        vec![("playlistId", Some(id)), ("name", Some(name.to_string()))],
                    )
                    .await
            })
            .await
    }

    #[instrument(skip(self), fields(playlist = %playlist_uri))]
    async fn delete_playlist(&self, playlist_uri: &Url) -> Result<()> {
        info!("Deleting playlist");
        let inner = &self.inner;
        inner
            .notify_after(async {
                let id = inner.require_id(playlist_uri, EntityKind::Playlist)?;
                inner
                    .invoke("deletePlaylist", |_| Some(()), vec![("id", Some(id))])
                    .await
            })
            .await
    }

    #[instrument(skip(self), fields(audio = %audio_uri, playlist = %playlist_uri))]
    async fn add_audio_to_playlist(&self, audio_uri: &Url, playlist_uri: &Url) -> Result<()> {
        info!("Adding audio to playlist");
        let inner = &self.inner;
        inner
            .notify_after(async {
                let playlist_id = inner.require_id(playlist_uri, EntityKind::Playlist)?;
                let audio_id = inner.require_id(audio_uri, EntityKind::Audio)?;
                inner
                    .invoke(
                        "updatePlaylist",
                        |_| Some(()),
                        vec![
                            ("playlistId", Some(playlist_id)),
                            ("songIdToAdd", Some(audio_id)),
                        ],
                    )
                    .await
            })
            .await
    }

    #[instrument(skip(self), fields(audio = %audio_uri, playlist = %playlist_uri))]
    async fn remove_audio_from_playlist(&self, audio_uri: &Url, playlist_uri: &Url) -> Result<()> {
        info!("Removing audio from playlist");
        let inner = &self.inner;
        inner
            .notify_after(async {
                let playlist_id = inner.require_id(playlist_uri, EntityKind::Playlist)?;
                let audio_id = inner.require_id(audio_uri, EntityKind::Audio)?;
                inner.remove_entries(&playlist_id, &audio_id).await
            })
            .await
    }
}
