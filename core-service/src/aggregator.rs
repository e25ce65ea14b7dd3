//! # Media Aggregator
//!
//! One local source plus any number of configured remote sources behind a
//! single query surface.
//!
//! - Listings (`albums`, `artists`, `genres`, `playlists`, `search`) merge
//!   every source; see [`merge_listings`](crate::merge::merge_listings).
//! - Detail queries and mutations are routed by URI: the local source first,
//!   then the first remote source (in key order) that owns the URI.
//! - Every stream starts with `Loading(None)`.
//!
//! Remote providers are added, updated and removed at runtime. Their
//! configurations are persisted and restored by [`MediaAggregator::load_providers`].

use core_library::arguments::{validate_arguments, ProviderArgument, ProviderArguments};
use core_library::models::{
    Album, AlbumDetail, Artist, ArtistDetail, Genre, GenreDetail, MediaItem, Playlist,
    PlaylistDetail, PlaylistMembership,
};
use core_library::provider::{ProviderKey, ProviderSource, ProviderType};
use core_library::repositories::{ProviderConfig, ProviderConfigRepository};
use core_library::status::{ErrorKind, MediaStream, RequestStatus};
use core_library::{LibraryError, Result};
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent, ProviderEvent};
use futures::future;
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::merge::merge_listings;
use crate::providers::{ProviderFactory, ProviderInfo};

struct RegisteredProvider {
    name: String,
    arguments: ProviderArguments,
    source: Arc<dyn ProviderSource>,
}

pub struct MediaAggregator {
    local: Arc<dyn ProviderSource>,
    remotes: RwLock<BTreeMap<ProviderKey, RegisteredProvider>>,
    repository: Arc<dyn ProviderConfigRepository>,
    factory: Arc<dyn ProviderFactory>,
    events: EventBus,
    verify_on_add: bool,
}

fn loading_then<T: Send + 'static>(rest: MediaStream<T>) -> MediaStream<T> {
    stream::once(future::ready(RequestStatus::Loading(None)))
        .chain(rest)
        .boxed()
}

fn unroutable<T: Send + 'static>(uri: &Url) -> MediaStream<T> {
    debug!(uri = %uri, "No source owns this URI");
    loading_then(stream::iter([RequestStatus::Error(ErrorKind::NotFound)]).boxed())
}

impl MediaAggregator {
    pub fn new(
        local: Arc<dyn ProviderSource>,
        repository: Arc<dyn ProviderConfigRepository>,
        factory: Arc<dyn ProviderFactory>,
        events: EventBus,
        verify_on_add: bool,
    ) -> Self {
        Self {
            local,
            remotes: RwLock::new(BTreeMap::new()),
            repository,
            factory,
            events,
            verify_on_add,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    fn emit(&self, event: CoreEvent) {
        // No subscribers is not an error.
        let _ = self.events.emit(event);
    }

    fn sources(&self) -> Vec<Arc<dyn ProviderSource>> {
        let remotes = self.remotes.read().unwrap_or_else(|e| e.into_inner());
        std::iter::once(self.local.clone())
            .chain(remotes.values().map(|remote| remote.source.clone()))
            .collect()
    }

    fn route(&self, uri: &Url) -> Option<Arc<dyn ProviderSource>> {
        if self.local.owns(uri) {
            return Some(self.local.clone());
        }
        let remotes = self.remotes.read().unwrap_or_else(|e| e.into_inner());
        remotes
            .values()
            .find(|remote| remote.source.owns(uri))
            .map(|remote| remote.source.clone())
    }

    fn merged<T, F>(&self, query: F) -> MediaStream<Vec<T>>
    where
        T: Clone + Send + 'static,
        F: Fn(&dyn ProviderSource) -> MediaStream<Vec<T>>,
    {
        let streams = self
            .sources()
            .iter()
            .map(|source| query(&**source))
            .collect();
        merge_listings(streams)
    }

    fn routed<T, F>(&self, uri: &Url, query: F) -> MediaStream<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn ProviderSource, &Url) -> MediaStream<T>,
    {
        match self.route(uri) {
            Some(source) => loading_then(query(&*source, uri)),
            None => unroutable(uri),
        }
    }

    // ----- listings -----

    pub fn albums(&self) -> MediaStream<Vec<Album>> {
        self.merged(|source| source.albums())
    }

    pub fn artists(&self) -> MediaStream<Vec<Artist>> {
        self.merged(|source| source.artists())
    }

    pub fn genres(&self) -> MediaStream<Vec<Genre>> {
        self.merged(|source| source.genres())
    }

    pub fn playlists(&self) -> MediaStream<Vec<Playlist>> {
        self.merged(|source| source.playlists())
    }

    pub fn search(&self, query: &str) -> MediaStream<Vec<MediaItem>> {
        self.merged(|source| source.search(query))
    }

    // ----- single entities -----

    pub fn album(&self, uri: &Url) -> MediaStream<AlbumDetail> {
        self.routed(uri, |source, uri| source.album(uri))
    }

    pub fn artist(&self, uri: &Url) -> MediaStream<ArtistDetail> {
        self.routed(uri, |source, uri| source.artist(uri))
    }

    pub fn genre(&self, uri: &Url) -> MediaStream<GenreDetail> {
        self.routed(uri, |source, uri| source.genre(uri))
    }

    pub fn playlist(&self, uri: &Url) -> MediaStream<PlaylistDetail> {
        self.routed(uri, |source, uri| source.playlist(uri))
    }

    pub fn audio_playlists_status(&self, audio_uri: &Url) -> MediaStream<Vec<PlaylistMembership>> {
        self.routed(audio_uri, |source, uri| source.audio_playlists_status(uri))
    }

    // ----- playlist mutations -----

    fn playlist_owner(&self, playlist_uri: &Url) -> Result<Arc<dyn ProviderSource>> {
        self.route(playlist_uri)
            .ok_or_else(|| LibraryError::not_found("Playlist", playlist_uri))
    }

    fn provider_source(&self, key: ProviderKey) -> Result<Arc<dyn ProviderSource>> {
        if key.provider_type == ProviderType::Local {
            return Ok(self.local.clone());
        }
        let remotes = self.remotes.read().unwrap_or_else(|e| e.into_inner());
        remotes
            .get(&key)
            .map(|remote| remote.source.clone())
            .ok_or_else(|| LibraryError::not_found("Provider", key))
    }

    /// Run a mutation against `target` and publish its outcome.
    async fn mutate<F, Fut>(
        &self,
        target: Result<Arc<dyn ProviderSource>>,
        playlist_uri: Option<&Url>,
        done: LibraryEvent,
        run: F,
    ) -> Result<()>
    where
        F: FnOnce(Arc<dyn ProviderSource>) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let result = match target {
            Ok(source) => run(source).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(()) => self.emit(CoreEvent::Library(done)),
            Err(e) => {
                warn!(error = %e, "Playlist mutation failed");
                self.emit(CoreEvent::Library(LibraryEvent::MutationFailed {
                    playlist_uri: playlist_uri.map(Url::to_string),
                    message: e.to_string(),
                }));
            }
        }
        result
    }

    /// Create a playlist on the provider identified by `provider`.
    #[instrument(skip(self))]
    pub async fn create_playlist(&self, provider: ProviderKey, name: &str) -> Result<()> {
        let event = LibraryEvent::PlaylistCreated {
            name: name.to_string(),
        };
        self.mutate(self.provider_source(provider), None, event, |source| async move {
            source.create_playlist(name).await
        })
        .await
    }

    #[instrument(skip(self, playlist_uri), fields(playlist = %playlist_uri))]
    pub async fn rename_playlist(&self, playlist_uri: &Url, name: &str) -> Result<()> {
        let event = LibraryEvent::PlaylistRenamed {
            playlist_uri: playlist_uri.to_string(),
            name: name.to_string(),
        };
        self.mutate(
            self.playlist_owner(playlist_uri),
            Some(playlist_uri),
            event,
            |source| async move { source.rename_playlist(playlist_uri, name).await },
        )
        .await
    }

    #[instrument(skip(self, playlist_uri), fields(playlist = %playlist_uri))]
    pub async fn delete_playlist(&self, playlist_uri: &Url) -> Result<()> {
        let event = LibraryEvent::PlaylistDeleted {
            playlist_uri: playlist_uri.to_string(),
        };
        self.mutate(
            self.playlist_owner(playlist_uri),
            Some(playlist_uri),
            event,
            |source| async move { source.delete_playlist(playlist_uri).await },
        )
        .await
    }

    #[instrument(skip(self, audio_uri, playlist_uri), fields(audio = %audio_uri, playlist = %playlist_uri))]
    pub async fn add_audio_to_playlist(&self, audio_uri: &Url, playlist_uri: &Url) -> Result<()> {
        let event = LibraryEvent::PlaylistItemAdded {
            playlist_uri: playlist_uri.to_string(),
            audio_uri: audio_uri.to_string(),
        };
        self.mutate(
            self.playlist_owner(playlist_uri),
            Some(playlist_uri),
            event,
            |source| async move { source.add_audio_to_playlist(audio_uri, playlist_uri).await },
        )
        .await
    }

    #[instrument(skip(self, audio_uri, playlist_uri), fields(audio = %audio_uri, playlist = %playlist_uri))]
    pub async fn remove_audio_from_playlist(
        &self,
        audio_uri: &Url,
        playlist_uri: &Url,
    ) -> Result<()> {
        let event = LibraryEvent::PlaylistItemRemoved {
            playlist_uri: playlist_uri.to_string(),
            audio_uri: audio_uri.to_string(),
        };
        self.mutate(
            self.playlist_owner(playlist_uri),
            Some(playlist_uri),
            event,
            |source| async move {
                source
                    .remove_audio_from_playlist(audio_uri, playlist_uri)
                    .await
            },
        )
        .await
    }

    // ----- provider management -----

    /// Configuration fields a provider kind needs.
    pub fn provider_arguments(&self, provider_type: ProviderType) -> Result<Vec<ProviderArgument>> {
        self.factory.schema(provider_type)
    }

    pub fn providers(&self) -> Vec<ProviderInfo> {
        let remotes = self.remotes.read().unwrap_or_else(|e| e.into_inner());
        remotes
            .iter()
            .map(|(key, remote)| ProviderInfo {
                key: *key,
                name: remote.name.clone(),
                arguments: remote.arguments.clone(),
            })
            .collect()
    }

    fn register(&self, config: ProviderConfig, source: Arc<dyn ProviderSource>) {
        let mut remotes = self.remotes.write().unwrap_or_else(|e| e.into_inner());
        remotes.insert(
            config.key,
            RegisteredProvider {
                name: config.name,
                arguments: config.arguments,
                source,
            },
        );
    }

    async fn connect(
        &self,
        provider_type: ProviderType,
        provider_id: Option<i64>,
        arguments: &ProviderArguments,
    ) -> Result<(ProviderArguments, Arc<dyn ProviderSource>)> {
        let schema = self.factory.schema(provider_type)?;
        let validated = validate_arguments(&schema, arguments)?;
        match self
            .factory
            .connect(provider_type, &validated, self.verify_on_add)
            .await
        {
            Ok(source) => Ok((validated, source)),
            Err(e) => {
                warn!(%provider_type, error = %e, "Provider connection failed");
                self.emit(CoreEvent::Provider(ProviderEvent::ConnectionFailed {
                    provider_type: provider_type.to_string(),
                    provider_id,
                    message: e.to_string(),
                }));
                Err(e)
            }
        }
    }

    /// Validate, optionally verify, persist and register a remote provider.
    #[instrument(skip(self, arguments))]
    pub async fn add_provider(
        &self,
        provider_type: ProviderType,
        name: &str,
        arguments: &ProviderArguments,
    ) -> Result<ProviderKey> {
        let (validated, source) = self.connect(provider_type, None, arguments).await?;
        let config = self
            .repository
            .insert(provider_type, name, &validated)
            .await?;
        let key = config.key;
        info!(provider = %key, name, "Provider added");

        self.emit(CoreEvent::Provider(ProviderEvent::Added {
            provider_type: provider_type.to_string(),
            provider_id: key.id,
            name: config.name.clone(),
        }));
        self.register(config, source);
        Ok(key)
    }

    /// Replace name and arguments of a registered provider.
    ///
    /// Streams opened before the update keep using the previous connection.
    #[instrument(skip(self, arguments))]
    pub async fn update_provider(
        &self,
        key: ProviderKey,
        name: &str,
        arguments: &ProviderArguments,
    ) -> Result<()> {
        if self.repository.find(key).await?.is_none() {
            return Err(LibraryError::not_found("Provider", key));
        }

        let (validated, source) = self
            .connect(key.provider_type, Some(key.id), arguments)
            .await?;
        let config = ProviderConfig {
            key,
            name: name.to_string(),
            arguments: validated,
        };
        self.repository.update(&config).await?;
        info!(provider = %key, name, "Provider updated");

        self.emit(CoreEvent::Provider(ProviderEvent::Updated {
            provider_type: key.provider_type.to_string(),
            provider_id: key.id,
            name: config.name.clone(),
        }));
        self.register(config, source);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn remove_provider(&self, key: ProviderKey) -> Result<()> {
        if !self.repository.delete(key).await? {
            return Err(LibraryError::not_found("Provider", key));
        }
        self.remotes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&key);
        info!(provider = %key, "Provider removed");

        self.emit(CoreEvent::Provider(ProviderEvent::Removed {
            provider_type: key.provider_type.to_string(),
            provider_id: key.id,
        }));
        Ok(())
    }

    /// Register every persisted provider without contacting it.
    ///
    /// A stored configuration that no longer builds is skipped and reported
    /// as `ConnectionFailed`; it stays persisted so the host can fix it.
    pub async fn load_providers(&self) -> Result<usize> {
        let mut loaded = 0;
        for config in self.repository.list().await? {
            let key = config.key;
            let built = match self.factory.schema(key.provider_type) {
                Ok(schema) => match validate_arguments(&schema, &config.arguments) {
                    Ok(arguments) => self
                        .factory
                        .connect(key.provider_type, &arguments, false)
                        .await
                        .map(|source| (arguments, source)),
                    Err(e) => Err(e),
                },
                Err(e) => Err(e),
            };

            match built {
                Ok((arguments, source)) => {
                    self.register(ProviderConfig { arguments, ..config }, source);
                    loaded += 1;
                }
                Err(e) => {
                    warn!(provider = %key, error = %e, "Skipping stored provider");
                    self.emit(CoreEvent::Provider(ProviderEvent::ConnectionFailed {
                        provider_type: key.provider_type.to_string(),
                        provider_id: Some(key.id),
                        message: e.to_string(),
                    }));
                }
            }
        }
        info!(loaded, "Stored providers loaded");
        Ok(loaded)
    }
}
