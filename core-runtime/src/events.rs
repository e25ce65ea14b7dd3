//! # Event Bus System
//!
//! Decoupled notifications between the aggregator and its consumers over
//! `tokio::sync::broadcast`.
//!
//! ```text
//! ┌──────────────────┐   emit   ┌───────────┐  subscribe  ┌────────────┐
//! │ MediaAggregator  ├─────────>│ EventBus  ├────────────>│ Subscriber │
//! └──────────────────┘          └───────────┘             └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, ProviderEvent};
//!
//! let event_bus = EventBus::new(100);
//! let mut receiver = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Provider(ProviderEvent::Added {
//!         provider_type: "subsonic".to_string(),
//!         provider_id: 1,
//!         name: "Home server".to_string(),
//!     }))
//!     .ok();
//!
//! assert!(receiver.try_recv().is_ok());
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events and may continue.
//! - **`RecvError::Closed`**: every sender is gone; treat as shutdown.
//!
//! Events describe what changed. Consumers that need the new state re-query
//! through the aggregator; live query streams already refresh themselves.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError, TryRecvError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Top-level event enum published through the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Remote provider configuration changes
    Provider(ProviderEvent),
    /// Playlist mutations, local or remote
    Library(LibraryEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Provider(e) => e.description(),
            CoreEvent::Library(e) => e.description(),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Provider(ProviderEvent::ConnectionFailed { .. }) => EventSeverity::Error,
            CoreEvent::Library(LibraryEvent::MutationFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Provider(_) => EventSeverity::Info,
            CoreEvent::Library(_) => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Events about configured provider instances.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ProviderEvent {
    Added {
        provider_type: String,
        provider_id: i64,
        name: String,
    },
    Updated {
        provider_type: String,
        provider_id: i64,
        name: String,
    },
    Removed {
        provider_type: String,
        provider_id: i64,
    },
    /// A provider could not be reached while registering or loading it.
    ConnectionFailed {
        provider_type: String,
        provider_id: Option<i64>,
        message: String,
    },
}

impl ProviderEvent {
    fn description(&self) -> &str {
        match self {
            ProviderEvent::Added { .. } => "Provider added",
            ProviderEvent::Updated { .. } => "Provider updated",
            ProviderEvent::Removed { .. } => "Provider removed",
            ProviderEvent::ConnectionFailed { .. } => "Provider connection failed",
        }
    }
}

/// Events about playlist mutations. URIs identify the playlist and item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    PlaylistCreated {
        name: String,
    },
    PlaylistRenamed {
        playlist_uri: String,
        name: String,
    },
    PlaylistDeleted {
        playlist_uri: String,
    },
    PlaylistItemAdded {
        playlist_uri: String,
        audio_uri: String,
    },
    PlaylistItemRemoved {
        playlist_uri: String,
        audio_uri: String,
    },
    MutationFailed {
        playlist_uri: Option<String>,
        message: String,
    },
}

impl LibraryEvent {
    fn description(&self) -> &str {
        match self {
            LibraryEvent::PlaylistCreated { .. } => "Playlist created",
            LibraryEvent::PlaylistRenamed { .. } => "Playlist renamed",
            LibraryEvent::PlaylistDeleted { .. } => "Playlist deleted",
            LibraryEvent::PlaylistItemAdded { .. } => "Item added to playlist",
            LibraryEvent::PlaylistItemRemoved { .. } => "Item removed from playlist",
            LibraryEvent::MutationFailed { .. } => "Playlist mutation failed",
        }
    }
}

/// Central broadcast channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus. Subscribers that fall more than `capacity`
    /// events behind receive `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error when nobody is listening.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a receiver for all future events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional filter.
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            match &self.filter {
                Some(filter) if !filter(&event) => continue,
                _ => return Ok(event),
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Result<CoreEvent, TryRecvError> {
        loop {
            let event = self.receiver.try_recv()?;
            match &self.filter {
                Some(filter) if !filter(&event) => continue,
                _ => return Ok(event),
            }
        }
    }
}
