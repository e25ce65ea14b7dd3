//! Core service façade and bootstrap helpers.
//!
//! This crate wires the host-provided bridges (HTTP transport, device media
//! index, clock) and the SQLite store into a ready-to-use
//! [`MediaAggregator`]. Desktop apps typically enable the `desktop-shims`
//! feature so that a `reqwest`-backed HTTP client is supplied by default.
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .database_path("media.db")
//!     .media_index(index)
//!     .build()?;
//! let core = core_service::bootstrap(config).await?;
//! let mut albums = core.aggregator().albums();
//! ```

pub mod aggregator;
pub mod error;
pub mod merge;
pub mod providers;

pub use aggregator::MediaAggregator;
pub use error::{CoreError, Result};
pub use providers::{ProviderFactory, ProviderInfo, SubsonicFactory};

use std::sync::Arc;

use core_library::db::{create_pool, DatabaseConfig};
use core_library::repositories::{
    PlaylistStore, SqlitePlaylistStore, SqliteProviderConfigRepository,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::EventBus;
use provider_local::LocalIndexSource;
use sqlx::SqlitePool;
use tracing::info;

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    aggregator: Arc<MediaAggregator>,
    playlist_store: Arc<dyn PlaylistStore>,
    events: EventBus,
    pool: SqlitePool,
}

impl CoreService {
    pub fn aggregator(&self) -> Arc<MediaAggregator> {
        Arc::clone(&self.aggregator)
    }

    /// Device-side playlists kept in the core database.
    pub fn playlist_store(&self) -> Arc<dyn PlaylistStore> {
        Arc::clone(&self.playlist_store)
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Close the database pool. Streams already handed out keep working
    /// against their sources but persistence calls will fail.
    pub async fn shutdown(&self) {
        self.pool.close().await;
    }
}

/// Open the database, build the sources and restore stored providers.
pub async fn bootstrap(config: CoreConfig) -> Result<CoreService> {
    let database = if config.is_in_memory() {
        DatabaseConfig::in_memory()
    } else {
        DatabaseConfig::new(&config.database_path)
    };
    let pool = create_pool(database)
        .await
        .map_err(|e| CoreError::InitializationFailed(format!("database: {}", e)))?;

    let events = EventBus::new(config.event_buffer_size);
    let local = LocalIndexSource::with_cache_capacity(
        config.media_index.clone(),
        config.thumbnail_cache_capacity,
    );
    let repository = SqliteProviderConfigRepository::new(pool.clone(), config.clock.clone());
    let factory = SubsonicFactory::new(config.http_client.clone(), config.client_name.clone());

    let aggregator = MediaAggregator::new(
        Arc::new(local),
        Arc::new(repository),
        Arc::new(factory),
        events.clone(),
        config.verify_providers_on_add,
    );
    let restored = aggregator.load_providers().await?;
    info!(restored, database = %config.database_path.display(), "Media core ready");

    Ok(CoreService {
        aggregator: Arc::new(aggregator),
        playlist_store: Arc::new(SqlitePlaylistStore::new(pool.clone(), config.clock.clone())),
        events,
        pool,
    })
}
