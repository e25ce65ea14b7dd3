//! # Host Bridge Traits
//!
//! Contracts between the media core and the host platform. Each trait is a
//! capability the core needs but cannot provide portably.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Async HTTP transport used by remote providers
//! - [`MediaIndex`](media_index::MediaIndex) - The device media catalogue
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! convert platform errors into it and keep messages actionable.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so they can be shared across tasks
//! behind an `Arc`.

pub mod error;
pub mod http;
pub mod media_index;
pub mod time;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use media_index::{
    IndexCollection, IndexQuery, IndexRow, IndexValue, MediaIndex, Selection, SortKey,
};
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
