use crate::status::ErrorKind;
use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Operation not implemented: {0}")]
    NotImplemented(String),

    #[error("I/O failure: {0}")]
    Io(String),

    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Entity already exists: {entity_type} {id}")]
    AlreadyExists { entity_type: String, id: String },

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },

    /// The remote answered in a shape this client does not understand.
    /// Retrying will not help; it usually means a version mismatch.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

impl LibraryError {
    pub fn not_found(entity_type: &str, id: impl ToString) -> Self {
        LibraryError::NotFound {
            entity_type: entity_type.to_string(),
            id: id.to_string(),
        }
    }

    pub fn invalid_input(field: &str, message: impl Into<String>) -> Self {
        LibraryError::InvalidInput {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// The uniform error kind reported to consumers.
    ///
    /// `None` for faults (protocol violations, invalid caller input) which
    /// are not part of the status taxonomy.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            LibraryError::Database(_)
            | LibraryError::Bridge(_)
            | LibraryError::Io(_)
            | LibraryError::Migration(_) => Some(ErrorKind::Io),
            LibraryError::NotImplemented(_) => Some(ErrorKind::NotImplemented),
            LibraryError::AuthenticationRequired => Some(ErrorKind::AuthenticationRequired),
            LibraryError::InvalidCredentials(_) => Some(ErrorKind::InvalidCredentials),
            LibraryError::NotFound { .. } => Some(ErrorKind::NotFound),
            LibraryError::AlreadyExists { .. } => Some(ErrorKind::AlreadyExists),
            LibraryError::InvalidInput { .. } | LibraryError::ProtocolViolation(_) => None,
        }
    }

    /// Build the error matching a status kind.
    pub fn from_kind(kind: ErrorKind, context: impl Into<String>) -> Self {
        let context = context.into();
        match kind {
            ErrorKind::NotImplemented => LibraryError::NotImplemented(context),
            ErrorKind::Io => LibraryError::Io(context),
            ErrorKind::AuthenticationRequired => LibraryError::AuthenticationRequired,
            ErrorKind::InvalidCredentials => LibraryError::InvalidCredentials(context),
            ErrorKind::NotFound => LibraryError::NotFound {
                entity_type: "Entity".to_string(),
                id: context,
            },
            ErrorKind::AlreadyExists => LibraryError::AlreadyExists {
                entity_type: "Entity".to_string(),
                id: context,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;
