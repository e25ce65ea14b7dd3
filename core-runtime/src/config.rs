//! # Core Configuration Module
//!
//! `CoreConfig` holds every collaborator and setting the media core needs.
//! It is assembled through [`CoreConfigBuilder`] and validated fail-fast so a
//! host learns about a missing capability at startup rather than on the first
//! query.
//!
//! ## Required Dependencies
//!
//! - `MediaIndex` - the device media catalogue backing the local provider
//! - database path - where provider configs and local playlists are stored
//!
//! ## Optional Dependencies (with defaults)
//!
//! - `HttpClient` - desktop default: `ReqwestHttpClient` (feature `desktop-shims`)
//! - `Clock` - default: `SystemClock`
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/path/to/media.db")
//!     .media_index(Arc::new(MyDeviceIndex::new()))
//!     .client_name("my-player")
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{Clock, HttpClient, MediaIndex, SystemClock};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Client identifier sent with every Subsonic request unless overridden.
pub const DEFAULT_CLIENT_NAME: &str = "media-provider-core";

/// Path that selects an in-memory database.
pub const IN_MEMORY_DATABASE: &str = ":memory:";

/// Core configuration for the media core.
#[derive(Clone)]
pub struct CoreConfig {
    /// Path to the SQLite database file, or [`IN_MEMORY_DATABASE`]
    pub database_path: PathBuf,

    /// Value of the `c` parameter on Subsonic requests
    pub client_name: String,

    pub http_client: Arc<dyn HttpClient>,

    pub media_index: Arc<dyn MediaIndex>,

    pub clock: Arc<dyn Clock>,

    /// Capacity of the event bus channel
    pub event_buffer_size: usize,

    /// Number of decoded local thumbnails kept in memory
    pub thumbnail_cache_capacity: usize,

    /// Ping a remote server before accepting its configuration
    pub verify_providers_on_add: bool,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_path", &self.database_path)
            .field("client_name", &self.client_name)
            .field("http_client", &"HttpClient { ... }")
            .field("media_index", &"MediaIndex { ... }")
            .field("event_buffer_size", &self.event_buffer_size)
            .field("thumbnail_cache_capacity", &self.thumbnail_cache_capacity)
            .field("verify_providers_on_add", &self.verify_providers_on_add)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path == Path::new(IN_MEMORY_DATABASE)
    }

    /// Validates the configuration and returns an actionable error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        let client_name = self.client_name.trim();
        if client_name.is_empty() {
            return Err(Error::Config(
                "Client name cannot be empty; Subsonic servers require the 'c' parameter"
                    .to_string(),
            ));
        }

        if client_name.len() != self.client_name.len() {
            return Err(Error::Config(
                "Client name must not start or end with whitespace".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.thumbnail_cache_capacity == 0 {
            return Err(Error::Config(
                "Thumbnail cache capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn media_index_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "MediaIndex".to_string(),
        message: "A MediaIndex implementation is required for the local provider. \
                  Hosts must inject an adapter over the platform media catalogue."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::new().map_err(|e| {
        Error::Internal(format!("Failed to initialize default HttpClient: {}", e))
    })?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "No HTTP client implementation provided. \
                  Desktop: enable the 'desktop-shims' feature to use ReqwestHttpClient. \
                  Mobile: inject a platform-native adapter."
            .to_string(),
    })
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    client_name: Option<String>,
    http_client: Option<Arc<dyn HttpClient>>,
    media_index: Option<Arc<dyn MediaIndex>>,
    clock: Option<Arc<dyn Clock>>,
    event_buffer_size: Option<usize>,
    thumbnail_cache_capacity: Option<usize>,
    verify_providers_on_add: Option<bool>,
}

impl CoreConfigBuilder {
    pub fn database_path(mut self, path: impl AsRef<Path>) -> Self {
        self.database_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Keep everything in memory; useful for tests and ephemeral sessions.
    pub fn in_memory_database(self) -> Self {
        self.database_path(IN_MEMORY_DATABASE)
    }

    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = Some(name.into());
        self
    }

    /// If not provided, the desktop default is used when the `desktop-shims`
    /// feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn media_index(mut self, index: Arc<dyn MediaIndex>) -> Self {
        self.media_index = Some(index);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn thumbnail_cache_capacity(mut self, capacity: usize) -> Self {
        self.thumbnail_cache_capacity = Some(capacity);
        self
    }

    pub fn verify_providers_on_add(mut self, verify: bool) -> Self {
        self.verify_providers_on_add = Some(verify);
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> Result<CoreConfig> {
        let database_path = self.database_path.ok_or_else(|| {
            Error::Config("Database path is required. Use .database_path() to set it.".to_string())
        })?;

        let media_index = self.media_index.ok_or_else(media_index_missing_error)?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let config = CoreConfig {
            database_path,
            client_name: self
                .client_name
                .unwrap_or_else(|| DEFAULT_CLIENT_NAME.to_string()),
            http_client,
            media_index,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            thumbnail_cache_capacity: self.thumbnail_cache_capacity.unwrap_or(256),
            verify_providers_on_add: self.verify_providers_on_add.unwrap_or(true),
        };

        config.validate()?;

        Ok(config)
    }
}
