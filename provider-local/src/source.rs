//! [`ProviderSource`] over the device media index.
//!
//! Every query subscribes to index change notifications before its first
//! read, emits a snapshot, and re-reads whenever one of the collections it
//! depends on changes. Notifications that pile up while a read is in flight
//! are conflated into a single re-read. A detail query whose entity is gone
//! emits `Error(NotFound)` and ends.
//!
//! The index has no playlists: playlist reads answer with empty results and
//! playlist mutations keep the `NotImplemented` defaults.

use async_trait::async_trait;
use bridge_traits::media_index::{
    columns, IndexCollection, IndexQuery, IndexRow, IndexValue, MediaIndex, Selection,
};
use core_library::models::{
    Album, AlbumDetail, Artist, ArtistDetail, ArtistWorks, Audio, Genre, GenreDetail, MediaItem,
    PictureType, Playlist, PlaylistDetail, PlaylistMembership,
};
use core_library::provider::{ProviderSource, ProviderType};
use core_library::status::{ErrorKind, MediaStream, RequestStatus};
use core_library::{LibraryError, Result};
use futures::future::join_all;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, warn};
use url::Url;

use crate::mapping::{self, ALBUM_PROJECTION, ARTIST_PROJECTION, AUDIO_PROJECTION, GENRE_PROJECTION};
use crate::thumbnails::{ThumbnailLoader, DEFAULT_CACHE_CAPACITY};
use crate::uri;

const ALBUM_LISTING: &[IndexCollection] = &[IndexCollection::Albums];
const ARTIST_LISTING: &[IndexCollection] = &[IndexCollection::Artists];
const GENRE_LISTING: &[IndexCollection] = &[IndexCollection::Genres];
const ALBUM_DETAIL: &[IndexCollection] = &[IndexCollection::Albums, IndexCollection::Audio];
const GENRE_DETAIL: &[IndexCollection] = &[IndexCollection::Genres, IndexCollection::Audio];
const EVERYTHING: &[IndexCollection] = &[
    IndexCollection::Albums,
    IndexCollection::Artists,
    IndexCollection::Genres,
    IndexCollection::Audio,
];

/// Albums the index knows about but holds no tracks for are hidden.
fn has_tracks() -> Selection {
    Selection::GreaterThan(columns::NUMBER_OF_TRACKS.to_string(), IndexValue::Integer(0))
}

fn status_of<T>(operation: &'static str, result: Result<T>) -> RequestStatus<T> {
    match result {
        Ok(value) => RequestStatus::Success(value),
        Err(e) => {
            let kind = e.kind().unwrap_or(ErrorKind::Io);
            if kind == ErrorKind::NotFound {
                debug!(operation, error = %e, "Local entity not found");
            } else {
                warn!(operation, error = %e, "Local index read failed");
            }
            RequestStatus::Error(kind)
        }
    }
}

/// One item per burst of relevant change notifications. Ends when the host
/// closes its notification channel.
fn index_changes(
    receiver: broadcast::Receiver<IndexCollection>,
    relevant: &'static [IndexCollection],
) -> BoxStream<'static, ()> {
    stream::unfold(receiver, move |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(collection) if relevant.contains(&collection) => {}
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Index change notifications lagged");
                }
                Err(RecvError::Closed) => return None,
            }
            while let Ok(_) | Err(TryRecvError::Lagged(_)) = receiver.try_recv() {}
            return Some(((), receiver));
        }
    })
    .boxed()
}

fn empty_success<T: Default + Send + 'static>() -> MediaStream<T> {
    stream::iter([RequestStatus::Success(T::default())]).boxed()
}

struct Inner {
    index: Arc<dyn MediaIndex>,
    thumbnails: ThumbnailLoader,
}

impl Inner {
    async fn query(&self, query: IndexQuery) -> Result<Vec<IndexRow>> {
        Ok(self.index.query(query).await?)
    }

    async fn with_artwork(&self, albums: Vec<Album>) -> Vec<Album> {
        join_all(albums.into_iter().map(|mut album| async move {
            album.thumbnail = self.thumbnails.load(&album.uri, PictureType::FrontCover).await;
            album
        }))
        .await
    }

    async fn albums_where(&self, selection: Option<Selection>) -> Result<Vec<Album>> {
        let selection = match selection {
            Some(selection) => selection.and(has_tracks()),
            None => has_tracks(),
        };
        let rows = self
            .query(
                IndexQuery::new(IndexCollection::Albums, ALBUM_PROJECTION)
                    .select(selection)
                    .sort_by(columns::ALBUM),
            )
            .await?;
        let albums = mapping::all(&rows, mapping::album)?;
        Ok(self.with_artwork(albums).await)
    }

    async fn artists_where(&self, selection: Option<Selection>) -> Result<Vec<Artist>> {
        let mut query =
            IndexQuery::new(IndexCollection::Artists, ARTIST_PROJECTION).sort_by(columns::ARTIST);
        query.selection = selection;
        let rows = self.query(query).await?;
        let artists = mapping::all(&rows, mapping::artist)?;
        Ok(join_all(artists.into_iter().map(|mut artist| async move {
            artist.thumbnail = self.thumbnails.load(&artist.uri, PictureType::Artist).await;
            artist
        }))
        .await)
    }

    async fn genres_where(&self, selection: Option<Selection>) -> Result<Vec<Genre>> {
        let mut query =
            IndexQuery::new(IndexCollection::Genres, GENRE_PROJECTION).sort_by(columns::NAME);
        query.selection = selection;
        let rows = self.query(query).await?;
        mapping::all(&rows, mapping::genre)
    }

    async fn audios_where(&self, selection: Selection, sort: &str) -> Result<Vec<Audio>> {
        let rows = self
            .query(
                IndexQuery::new(IndexCollection::Audio, AUDIO_PROJECTION)
                    .select(selection)
                    .sort_by(sort),
            )
            .await?;
        mapping::all(&rows, mapping::audio)
    }

    async fn search(&self, text: String) -> Result<Vec<MediaItem>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let (albums, artists, audios, genres) = futures::join!(
            self.albums_where(Some(Selection::contains(columns::ALBUM, text))),
            self.artists_where(Some(Selection::contains(columns::ARTIST, text))),
            self.audios_where(Selection::contains(columns::TITLE, text), columns::TITLE),
            self.genres_where(Some(Selection::contains(columns::NAME, text))),
        );

        let mut items: Vec<MediaItem> = albums?.into_iter().map(MediaItem::Album).collect();
        items.extend(artists?.into_iter().map(MediaItem::Artist));
        items.extend(audios?.into_iter().map(MediaItem::Audio));
        items.extend(genres?.into_iter().map(MediaItem::Genre));
        Ok(items)
    }

    async fn album(&self, id: i64) -> Result<AlbumDetail> {
        let (albums, audios) = futures::try_join!(
            self.albums_where(Some(Selection::eq(columns::ID, id))),
            self.audios_where(Selection::eq(columns::ALBUM_ID, id), columns::TRACK),
        )?;
        let album = albums
            .into_iter()
            .next()
            .ok_or_else(|| LibraryError::not_found("Album", id))?;
        Ok(AlbumDetail { album, audios })
    }

    /// Own albums plus albums the artist only contributes tracks to.
    ///
    /// The second set is found in two passes: collect the album ids of the
    /// artist's tracks that are not among their own albums, then load those
    /// albums excluding any credited to the artist.
    async fn artist(&self, id: i64) -> Result<ArtistDetail> {
        let (artists, albums, track_rows) = futures::try_join!(
            self.artists_where(Some(Selection::eq(columns::ID, id))),
            self.albums_where(Some(Selection::eq(columns::ARTIST_ID, id))),
            self.query(
                IndexQuery::new(IndexCollection::Audio, &[columns::ID, columns::ALBUM_ID])
                    .select(Selection::eq(columns::ARTIST_ID, id)),
            ),
        )?;
        let artist = artists
            .into_iter()
            .next()
            .ok_or_else(|| LibraryError::not_found("Artist", id))?;

        let own: BTreeSet<i64> = albums
            .iter()
            .filter_map(|album| uri::id_of(&album.uri, IndexCollection::Albums))
            .collect();
        let others: BTreeSet<i64> = track_rows
            .iter()
            .filter_map(|row| mapping::int(row, columns::ALBUM_ID))
            .filter(|album_id| !own.contains(album_id))
            .collect();

        let appears_on = if others.is_empty() {
            Vec::new()
        } else {
            let ids = others.into_iter().map(IndexValue::Integer).collect();
            self.albums_where(Some(
                Selection::In(columns::ID.to_string(), ids)
                    .and(Selection::not_eq(columns::ARTIST_ID, id)),
            ))
            .await?
        };

        Ok(ArtistDetail {
            artist,
            works: ArtistWorks {
                albums,
                appears_on,
                playlists: Vec::new(),
            },
        })
    }

    async fn genre(&self, id: i64) -> Result<GenreDetail> {
        let (genres, audios) = futures::try_join!(
            self.genres_where(Some(Selection::eq(columns::ID, id))),
            self.audios_where(Selection::eq(columns::GENRE_ID, id), columns::TITLE),
        )?;
        let genre = genres
            .into_iter()
            .next()
            .ok_or_else(|| LibraryError::not_found("Genre", id))?;
        Ok(GenreDetail { genre, audios })
    }
}

/// Read-only source backed by the host's media index.
#[derive(Clone)]
pub struct LocalIndexSource {
    inner: Arc<Inner>,
}

impl LocalIndexSource {
    pub fn new(index: Arc<dyn MediaIndex>) -> Self {
        Self::with_cache_capacity(index, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_cache_capacity(index: Arc<dyn MediaIndex>, thumbnail_cache_capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                thumbnails: ThumbnailLoader::new(index.clone(), thumbnail_cache_capacity),
                index,
            }),
        }
    }

    /// Snapshot now, then again after each burst of relevant changes.
    fn live<T, F, Fut>(
        &self,
        operation: &'static str,
        relevant: &'static [IndexCollection],
        fetch: F,
    ) -> MediaStream<T>
    where
        T: Send + 'static,
        F: Fn(Arc<Inner>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let inner = self.inner.clone();
        let changes = index_changes(self.inner.index.subscribe_changes(), relevant);

        stream::unfold(Some((changes, true)), move |state| {
            let read = fetch(inner.clone());
            async move {
                let (mut changes, first) = state?;
                if !first {
                    changes.next().await?;
                }
                let status = status_of(operation, read.await);
                let next = match status {
                    RequestStatus::Error(ErrorKind::NotFound) => None,
                    _ => Some((changes, false)),
                };
                Some((status, next))
            }
        })
        .boxed()
    }

    /// Detail query for the entity of `collection` named by `uri`.
    fn detail<T, F, Fut>(
        &self,
        operation: &'static str,
        uri: &Url,
        collection: IndexCollection,
        relevant: &'static [IndexCollection],
        fetch: F,
    ) -> MediaStream<T>
    where
        T: Send + 'static,
        F: Fn(Arc<Inner>, i64) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        match uri::id_of(uri, collection) {
            Some(id) => self.live(operation, relevant, move |inner| fetch(inner, id)),
            None => {
                debug!(operation, uri = %uri, "Not a local entity URI");
                stream::iter([RequestStatus::Error(ErrorKind::NotFound)]).boxed()
            }
        }
    }
}

#[async_trait]
impl ProviderSource for LocalIndexSource {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Local
    }

    fn owns(&self, uri: &Url) -> bool {
        uri::owns(uri)
    }

    fn albums(&self) -> MediaStream<Vec<Album>> {
        self.live("albums", ALBUM_LISTING, |inner| async move {
            inner.albums_where(None).await
        })
    }

    fn artists(&self) -> MediaStream<Vec<Artist>> {
        self.live("artists", ARTIST_LISTING, |inner| async move {
            inner.artists_where(None).await
        })
    }

    fn genres(&self) -> MediaStream<Vec<Genre>> {
        self.live("genres", GENRE_LISTING, |inner| async move {
            inner.genres_where(None).await
        })
    }

    fn playlists(&self) -> MediaStream<Vec<Playlist>> {
        empty_success()
    }

    fn search(&self, query: &str) -> MediaStream<Vec<MediaItem>> {
        let query = query.to_string();
        self.live("search", EVERYTHING, move |inner| {
            let query = query.clone();
            async move { inner.search(query).await }
        })
    }

    fn album(&self, uri: &Url) -> MediaStream<AlbumDetail> {
        self.detail("album", uri, IndexCollection::Albums, ALBUM_DETAIL, |inner, id| async move {
            inner.album(id).await
        })
    }

    fn artist(&self, uri: &Url) -> MediaStream<ArtistDetail> {
        self.detail("artist", uri, IndexCollection::Artists, EVERYTHING, |inner, id| async move {
            inner.artist(id).await
        })
    }

    fn genre(&self, uri: &Url) -> MediaStream<GenreDetail> {
        self.detail("genre", uri, IndexCollection::Genres, GENRE_DETAIL, |inner, id| async move {
            inner.genre(id).await
        })
    }

    fn playlist(&self, _uri: &Url) -> MediaStream<PlaylistDetail> {
        stream::iter([RequestStatus::Error(ErrorKind::NotFound)]).boxed()
    }

    fn audio_playlists_status(&self, _audio_uri: &Url) -> MediaStream<Vec<PlaylistMembership>> {
        empty_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_changes_are_filtered_and_conflated() {
        let (sender, receiver) = broadcast::channel(16);
        let mut changes = index_changes(receiver, ALBUM_LISTING);

        sender.send(IndexCollection::Genres).unwrap();
        sender.send(IndexCollection::Albums).unwrap();
        sender.send(IndexCollection::Albums).unwrap();
        sender.send(IndexCollection::Audio).unwrap();
        assert_eq!(changes.next().await, Some(()));

        drop(sender);
        assert_eq!(changes.next().await, None);
    }

    #[tokio::test]
    async fn test_lagged_receiver_still_refreshes() {
        let (sender, receiver) = broadcast::channel(2);
        let mut changes = index_changes(receiver, ALBUM_LISTING);
        for _ in 0..5 {
            sender.send(IndexCollection::Artists).unwrap();
        }
        assert_eq!(changes.next().await, Some(()));
    }

    #[test]
    fn test_error_statuses() {
        let missing: RequestStatus<()> =
            status_of("album", Err(LibraryError::not_found("Album", 3)));
        assert_eq!(missing, RequestStatus::Error(ErrorKind::NotFound));

        let broken: RequestStatus<()> = status_of(
            "albums",
            Err(LibraryError::Bridge(bridge_traits::BridgeError::Index(
                "cursor closed".into(),
            ))),
        );
        assert_eq!(broken, RequestStatus::Error(ErrorKind::Io));
    }
}
