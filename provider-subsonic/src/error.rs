//! Error types for the Subsonic provider

use bridge_traits::error::BridgeError;
use core_library::LibraryError;
use thiserror::Error;

/// Subsonic client errors
#[derive(Error, Debug)]
pub enum SubsonicError {
    /// The request never produced a response (connection refused, timeout)
    #[error(transparent)]
    Transport(#[from] BridgeError),

    /// The body is not a Subsonic JSON envelope
    #[error("Failed to decode {method} response: {message}")]
    Decode { method: String, message: String },

    /// `status=ok` without the field the method is supposed to populate
    #[error("{method} succeeded without a result")]
    MissingResult { method: String },

    #[error("Failed to generate salt: {0}")]
    Salt(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The server returned an entry this audio-only client cannot represent
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),
}

/// Result type for Subsonic operations
pub type Result<T> = std::result::Result<T, SubsonicError>;

impl SubsonicError {
    /// Client/server disagreements that retrying cannot fix.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            SubsonicError::MissingResult { .. } | SubsonicError::UnsupportedMediaType(_)
        )
    }
}

impl From<SubsonicError> for LibraryError {
    fn from(error: SubsonicError) -> Self {
        match error {
            SubsonicError::Transport(e) => LibraryError::Bridge(e),
            SubsonicError::Decode { .. } | SubsonicError::Salt(_) => {
                LibraryError::Io(error.to_string())
            }
            SubsonicError::MissingResult { .. } | SubsonicError::UnsupportedMediaType(_) => {
                LibraryError::ProtocolViolation(error.to_string())
            }
            SubsonicError::InvalidUrl(message) => LibraryError::invalid_input("server", message),
        }
    }
}
