//! # Request Status
//!
//! Every query in the media core is a live stream of [`RequestStatus`]
//! values. `Loading` is non-terminal and may repeat; `Success` and `Error`
//! can be replaced by later emissions on the same stream while the consumer
//! stays subscribed.

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Uniform error taxonomy surfaced regardless of which source answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotImplemented,
    /// Network or transport failure, or an unusable response
    Io,
    AuthenticationRequired,
    InvalidCredentials,
    NotFound,
    AlreadyExists,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotImplemented => "not implemented",
            ErrorKind::Io => "i/o failure",
            ErrorKind::AuthenticationRequired => "authentication required",
            ErrorKind::InvalidCredentials => "invalid credentials",
            ErrorKind::NotFound => "not found",
            ErrorKind::AlreadyExists => "already exists",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestStatus<T> {
    /// Work in progress, with an optional percentage in `0..=100`.
    Loading(Option<u8>),
    Success(T),
    Error(ErrorKind),
}

impl<T> RequestStatus<T> {
    /// Loading with a progress clamped to 100.
    pub fn progress(percent: u8) -> Self {
        RequestStatus::Loading(Some(percent.min(100)))
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, RequestStatus::Loading(_))
    }

    /// `Success` or `Error`.
    pub fn is_settled(&self) -> bool {
        !self.is_loading()
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            RequestStatus::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_success(self) -> Option<T> {
        match self {
            RequestStatus::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<ErrorKind> {
        match self {
            RequestStatus::Error(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RequestStatus<U> {
        match self {
            RequestStatus::Loading(progress) => RequestStatus::Loading(progress),
            RequestStatus::Success(value) => RequestStatus::Success(f(value)),
            RequestStatus::Error(kind) => RequestStatus::Error(kind),
        }
    }
}

impl<T> From<Result<T, ErrorKind>> for RequestStatus<T> {
    fn from(result: Result<T, ErrorKind>) -> Self {
        match result {
            Ok(value) => RequestStatus::Success(value),
            Err(kind) => RequestStatus::Error(kind),
        }
    }
}

/// A live, cancellable query. Dropping it cancels any in-flight work.
pub type MediaStream<T> = BoxStream<'static, RequestStatus<T>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_is_clamped() {
        assert_eq!(RequestStatus::<()>::progress(250), RequestStatus::Loading(Some(100)));
        assert_eq!(RequestStatus::<()>::progress(40), RequestStatus::Loading(Some(40)));
    }

    #[test]
    fn test_accessors() {
        let ok: RequestStatus<Vec<u32>> = RequestStatus::Success(vec![1, 2]);
        assert!(ok.is_settled());
        assert_eq!(ok.success(), Some(&vec![1, 2]));
        assert_eq!(ok.error(), None);

        let failed: RequestStatus<Vec<u32>> = RequestStatus::Error(ErrorKind::NotFound);
        assert!(failed.is_settled());
        assert_eq!(failed.error(), Some(ErrorKind::NotFound));
        assert_eq!(failed.into_success(), None);

        assert!(RequestStatus::<u8>::Loading(None).is_loading());
    }

    #[test]
    fn test_map_preserves_state() {
        let mapped = RequestStatus::Success(3).map(|n| n * 2);
        assert_eq!(mapped, RequestStatus::Success(6));

        let loading: RequestStatus<i32> = RequestStatus::Loading(Some(10));
        assert_eq!(loading.map(|n| n + 1), RequestStatus::Loading(Some(10)));

        let from_err: RequestStatus<i32> = Err(ErrorKind::Io).into();
        assert_eq!(from_err, RequestStatus::Error(ErrorKind::Io));
    }

    #[test]
    fn test_error_kind_serialization() {
        let json = serde_json::to_string(&ErrorKind::InvalidCredentials).unwrap();
        assert_eq!(json, "\"INVALID_CREDENTIALS\"");
        assert_eq!(ErrorKind::NotFound.to_string(), "not found");
    }
}
