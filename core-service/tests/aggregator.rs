use async_trait::async_trait;
use bridge_traits::time::SystemClock;
use core_library::arguments::{ProviderArgument, ProviderArguments};
use core_library::db::create_test_pool;
use core_library::models::{
    Album, AlbumDetail, Artist, ArtistDetail, Genre, GenreDetail, MediaItem, Playlist,
    PlaylistDetail, PlaylistMembership,
};
use core_library::provider::{ProviderKey, ProviderSource, ProviderType};
use core_library::repositories::{ProviderConfigRepository, SqliteProviderConfigRepository};
use core_library::status::{ErrorKind, MediaStream, RequestStatus};
use core_library::{LibraryError, Result};
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent, ProviderEvent};
use core_service::{MediaAggregator, ProviderFactory};
use futures::stream::{self, StreamExt};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::Receiver;
use url::Url;

fn album(uri: &str, title: &str) -> Album {
    Album {
        uri: Url::parse(uri).unwrap(),
        title: title.to_string(),
        artist_uri: None,
        artist_name: None,
        year: None,
        thumbnail: None,
    }
}

fn once<T: Send + 'static>(status: RequestStatus<T>) -> MediaStream<T> {
    stream::iter([status]).boxed()
}

/// Answers for URIs under one scheme and host.
struct StubSource {
    provider_type: ProviderType,
    base: Url,
    albums: Vec<Album>,
    renames: Mutex<Vec<String>>,
}

impl StubSource {
    fn new(provider_type: ProviderType, base: &str, albums: Vec<Album>) -> Self {
        Self {
            provider_type,
            base: Url::parse(base).unwrap(),
            albums,
            renames: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ProviderSource for StubSource {
    fn provider_type(&self) -> ProviderType {
        self.provider_type
    }

    fn owns(&self, uri: &Url) -> bool {
        uri.scheme() == self.base.scheme() && uri.host_str() == self.base.host_str()
    }

    fn albums(&self) -> MediaStream<Vec<Album>> {
        once(RequestStatus::Success(self.albums.clone()))
    }

    fn artists(&self) -> MediaStream<Vec<Artist>> {
        once(RequestStatus::Success(Vec::new()))
    }

    fn genres(&self) -> MediaStream<Vec<Genre>> {
        once(RequestStatus::Success(Vec::new()))
    }

    fn playlists(&self) -> MediaStream<Vec<Playlist>> {
        once(RequestStatus::Error(ErrorKind::Io))
    }

    fn search(&self, _query: &str) -> MediaStream<Vec<MediaItem>> {
        once(RequestStatus::Success(Vec::new()))
    }

    fn album(&self, uri: &Url) -> MediaStream<AlbumDetail> {
        match self.albums.iter().find(|album| &album.uri == uri) {
            Some(album) => once(RequestStatus::Success(AlbumDetail {
                album: album.clone(),
                audios: Vec::new(),
            })),
            None => once(RequestStatus::Error(ErrorKind::NotFound)),
        }
    }

    fn artist(&self, _uri: &Url) -> MediaStream<ArtistDetail> {
        once(RequestStatus::Error(ErrorKind::NotFound))
    }

    fn genre(&self, _uri: &Url) -> MediaStream<GenreDetail> {
        once(RequestStatus::Error(ErrorKind::NotFound))
    }

    fn playlist(&self, _uri: &Url) -> MediaStream<PlaylistDetail> {
        once(RequestStatus::Error(ErrorKind::NotFound))
    }

    fn audio_playlists_status(&self, _audio_uri: &Url) -> MediaStream<Vec<PlaylistMembership>> {
        once(RequestStatus::Success(Vec::new()))
    }

    async fn rename_playlist(&self, playlist_uri: &Url, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(LibraryError::Io(format!("rename of {} refused", playlist_uri)));
        }
        self.renames.lock().unwrap().push(name.to_string());
        Ok(())
    }
}

/// Builds a remote stub per `host` argument; host `offline` fails to verify.
#[derive(Default)]
struct StubFactory {
    built: Mutex<Vec<Arc<StubSource>>>,
}

#[async_trait]
impl ProviderFactory for StubFactory {
    fn schema(&self, provider_type: ProviderType) -> Result<Vec<ProviderArgument>> {
        match provider_type {
            ProviderType::Subsonic => Ok(vec![ProviderArgument::text("host", "Host").required()]),
            ProviderType::Local => Err(LibraryError::invalid_input("provider_type", "local")),
        }
    }

    async fn connect(
        &self,
        provider_type: ProviderType,
        arguments: &ProviderArguments,
        verify: bool,
    ) -> Result<Arc<dyn ProviderSource>> {
        let host = arguments.require_text("host")?;
        if verify && host == "offline" {
            return Err(LibraryError::Io("connection refused".to_string()));
        }
        let source = Arc::new(StubSource::new(
            provider_type,
            &format!("https://{}/", host),
            vec![album(&format!("https://{}/album/1", host), host)],
        ));
        self.built.lock().unwrap().push(source.clone());
        Ok(source)
    }
}

struct Harness {
    aggregator: MediaAggregator,
    repository: Arc<SqliteProviderConfigRepository>,
    factory: Arc<StubFactory>,
    events: Receiver<CoreEvent>,
}

async fn harness() -> Harness {
    let pool = create_test_pool().await.unwrap();
    let repository = Arc::new(SqliteProviderConfigRepository::new(
        pool,
        Arc::new(SystemClock),
    ));
    harness_with(repository).await
}

async fn harness_with(repository: Arc<SqliteProviderConfigRepository>) -> Harness {
    let local = StubSource::new(
        ProviderType::Local,
        "content://media/",
        vec![album("content://media/external/audio/albums/7", "Local")],
    );
    let factory = Arc::new(StubFactory::default());
    let bus = EventBus::new(32);
    let events = bus.subscribe();
    let aggregator = MediaAggregator::new(
        Arc::new(local),
        repository.clone(),
        factory.clone(),
        bus,
        true,
    );
    Harness {
        aggregator,
        repository,
        factory,
        events,
    }
}

fn host(name: &str) -> ProviderArguments {
    ProviderArguments::new().with("host", name)
}

fn drain(events: &mut Receiver<CoreEvent>) -> Vec<CoreEvent> {
    std::iter::from_fn(|| events.try_recv().ok()).collect()
}

#[tokio::test]
async fn test_listings_merge_local_then_remotes() {
    let mut h = harness().await;
    h.aggregator
        .add_provider(ProviderType::Subsonic, "Home", &host("music.example.com"))
        .await
        .unwrap();
    drain(&mut h.events);

    let statuses: Vec<_> = h.aggregator.albums().collect().await;
    assert_eq!(statuses.first(), Some(&RequestStatus::Loading(None)));
    let titles: Vec<_> = statuses
        .last()
        .and_then(|status| status.success())
        .unwrap()
        .iter()
        .map(|album| album.title.clone())
        .collect();
    assert_eq!(titles, vec!["Local", "music.example.com"]);
}

#[tokio::test]
async fn test_listing_survives_failing_source() {
    let h = harness().await;
    h.aggregator
        .add_provider(ProviderType::Subsonic, "Home", &host("music.example.com"))
        .await
        .unwrap();

    // Both stubs fail playlists, so the merge reports the error.
    let statuses: Vec<_> = h.aggregator.playlists().collect().await;
    assert_eq!(statuses.last(), Some(&RequestStatus::Error(ErrorKind::Io)));

    let genres: Vec<_> = h.aggregator.genres().collect().await;
    assert_eq!(genres.last(), Some(&RequestStatus::Success(Vec::new())));
}

#[tokio::test]
async fn test_details_route_by_owner() {
    let h = harness().await;
    h.aggregator
        .add_provider(ProviderType::Subsonic, "Home", &host("music.example.com"))
        .await
        .unwrap();

    let local = Url::parse("content://media/external/audio/albums/7").unwrap();
    let statuses: Vec<_> = h.aggregator.album(&local).collect().await;
    assert_eq!(statuses[0], RequestStatus::Loading(None));
    assert_eq!(statuses[1].success().unwrap().album.title, "Local");

    let remote = Url::parse("https://music.example.com/album/1").unwrap();
    let statuses: Vec<_> = h.aggregator.album(&remote).collect().await;
    assert_eq!(
        statuses[1].success().unwrap().album.title,
        "music.example.com"
    );

    let stranger = Url::parse("https://elsewhere.example.com/album/1").unwrap();
    let statuses: Vec<_> = h.aggregator.album(&stranger).collect().await;
    assert_eq!(
        statuses,
        vec![
            RequestStatus::Loading(None),
            RequestStatus::Error(ErrorKind::NotFound)
        ]
    );
}

#[tokio::test]
async fn test_add_provider_persists_and_announces() {
    let mut h = harness().await;
    let key = h
        .aggregator
        .add_provider(ProviderType::Subsonic, "Home", &host("music.example.com"))
        .await
        .unwrap();

    assert_eq!(key.provider_type, ProviderType::Subsonic);
    let stored = h.repository.find(key).await.unwrap().unwrap();
    assert_eq!(stored.name, "Home");
    assert_eq!(stored.arguments.text("host"), Some("music.example.com"));

    let providers = h.aggregator.providers();
    assert_eq!(providers.len(), 1);
    assert_eq!(providers[0].key, key);

    assert_eq!(
        drain(&mut h.events),
        vec![CoreEvent::Provider(ProviderEvent::Added {
            provider_type: "subsonic".to_string(),
            provider_id: key.id,
            name: "Home".to_string(),
        })]
    );
}

#[tokio::test]
async fn test_unreachable_provider_is_not_added() {
    let mut h = harness().await;
    let err = h
        .aggregator
        .add_provider(ProviderType::Subsonic, "Away", &host("offline"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::Io));
    assert!(h.repository.list().await.unwrap().is_empty());
    assert!(h.aggregator.providers().is_empty());
    assert!(matches!(
        drain(&mut h.events).as_slice(),
        [CoreEvent::Provider(ProviderEvent::ConnectionFailed { provider_id: None, .. })]
    ));
}

#[tokio::test]
async fn test_invalid_arguments_are_rejected() {
    let h = harness().await;
    let err = h
        .aggregator
        .add_provider(ProviderType::Subsonic, "Home", &ProviderArguments::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::InvalidInput { .. }));

    let err = h
        .aggregator
        .add_provider(ProviderType::Local, "Phone", &host("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::InvalidInput { .. }));
    assert!(h.factory.built.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_update_provider_switches_connection() {
    let mut h = harness().await;
    let key = h
        .aggregator
        .add_provider(ProviderType::Subsonic, "Home", &host("old.example.com"))
        .await
        .unwrap();
    drain(&mut h.events);

    h.aggregator
        .update_provider(key, "Office", &host("new.example.com"))
        .await
        .unwrap();

    let stored = h.repository.find(key).await.unwrap().unwrap();
    assert_eq!(stored.name, "Office");
    assert_eq!(
        drain(&mut h.events),
        vec![CoreEvent::Provider(ProviderEvent::Updated {
            provider_type: "subsonic".to_string(),
            provider_id: key.id,
            name: "Office".to_string(),
        })]
    );

    let old = Url::parse("https://old.example.com/album/1").unwrap();
    let statuses: Vec<_> = h.aggregator.album(&old).collect().await;
    assert_eq!(statuses.last(), Some(&RequestStatus::Error(ErrorKind::NotFound)));

    let missing = ProviderKey::new(ProviderType::Subsonic, key.id + 1);
    let err = h
        .aggregator
        .update_provider(missing, "Ghost", &host("new.example.com"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::NotFound));
}

#[tokio::test]
async fn test_remove_provider_stops_routing() {
    let mut h = harness().await;
    let key = h
        .aggregator
        .add_provider(ProviderType::Subsonic, "Home", &host("music.example.com"))
        .await
        .unwrap();
    drain(&mut h.events);

    h.aggregator.remove_provider(key).await.unwrap();
    assert!(h.aggregator.providers().is_empty());
    assert!(h.repository.find(key).await.unwrap().is_none());
    assert_eq!(
        drain(&mut h.events),
        vec![CoreEvent::Provider(ProviderEvent::Removed {
            provider_type: "subsonic".to_string(),
            provider_id: key.id,
        })]
    );

    let remote = Url::parse("https://music.example.com/album/1").unwrap();
    let statuses: Vec<_> = h.aggregator.album(&remote).collect().await;
    assert_eq!(statuses.last(), Some(&RequestStatus::Error(ErrorKind::NotFound)));

    let err = h.aggregator.remove_provider(key).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::NotFound));
}

#[tokio::test]
async fn test_load_providers_restores_and_skips_broken() {
    let first = harness().await;
    first
        .aggregator
        .add_provider(ProviderType::Subsonic, "Home", &host("music.example.com"))
        .await
        .unwrap();
    // Stored before the schema required a host.
    first
        .repository
        .insert(ProviderType::Subsonic, "Broken", &ProviderArguments::new())
        .await
        .unwrap();

    let mut second = harness_with(first.repository.clone()).await;
    assert_eq!(second.aggregator.load_providers().await.unwrap(), 1);

    let providers = second.aggregator.providers();
    assert_eq!(providers.len(), 1);
    assert_eq!(providers[0].name, "Home");
    assert_eq!(second.repository.list().await.unwrap().len(), 2);
    assert!(matches!(
        drain(&mut second.events).as_slice(),
        [CoreEvent::Provider(ProviderEvent::ConnectionFailed { provider_id: Some(_), .. })]
    ));
}

#[tokio::test]
async fn test_mutations_publish_outcome() {
    let mut h = harness().await;
    h.aggregator
        .add_provider(ProviderType::Subsonic, "Home", &host("music.example.com"))
        .await
        .unwrap();
    drain(&mut h.events);

    let playlist = Url::parse("https://music.example.com/playlist/3").unwrap();
    h.aggregator
        .rename_playlist(&playlist, "Evening")
        .await
        .unwrap();
    assert_eq!(
        *h.factory.built.lock().unwrap()[0].renames.lock().unwrap(),
        vec!["Evening".to_string()]
    );
    assert_eq!(
        drain(&mut h.events),
        vec![CoreEvent::Library(LibraryEvent::PlaylistRenamed {
            playlist_uri: playlist.to_string(),
            name: "Evening".to_string(),
        })]
    );

    let err = h.aggregator.rename_playlist(&playlist, "").await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Io));
    assert!(matches!(
        drain(&mut h.events).as_slice(),
        [CoreEvent::Library(LibraryEvent::MutationFailed { playlist_uri: Some(uri), .. })]
            if uri == playlist.as_str()
    ));
}

#[tokio::test]
async fn test_mutations_without_owner_fail() {
    let mut h = harness().await;

    let stranger = Url::parse("https://elsewhere.example.com/playlist/1").unwrap();
    let err = h.aggregator.delete_playlist(&stranger).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::NotFound));

    let local = ProviderKey::new(ProviderType::Local, 0);
    let err = h.aggregator.create_playlist(local, "Mix").await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::NotImplemented));

    let events = drain(&mut h.events);
    assert_eq!(events.len(), 2);
    assert!(matches!(
        &events[1],
        CoreEvent::Library(LibraryEvent::MutationFailed { playlist_uri: None, .. })
    ));
}
