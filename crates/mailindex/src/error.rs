//! Error type carrying a [`Status`] and an optional message

use rusqlite::ErrorCode;

use crate::status::Status;

/// Failure of an index operation
///
/// The message, when present, is what gets displayed; otherwise the
/// status description is used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", .message.as_deref().unwrap_or(.status.description()))]
pub struct Error {
    status: Status,
    message: Option<String>,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn new(status: Status) -> Self {
        Self {
            status,
            message: None,
        }
    }

    pub fn with_message(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: Some(message.into()),
        }
    }

    /// Shorthand for a generic backend failure
    pub fn backend(message: impl Into<String>) -> Self {
        Self::with_message(Status::XapianException, message)
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn code(&self) -> i32 {
        self.status.code()
    }
}

impl From<Status> for Error {
    fn from(status: Status) -> Self {
        Self::new(status)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        let status = match err.sqlite_error_code() {
            Some(ErrorCode::OutOfMemory) => Status::OutOfMemory,
            Some(ErrorCode::ReadOnly) => Status::ReadOnlyDatabase,
            Some(ErrorCode::CannotOpen) => Status::FileError,
            _ => Status::XapianException,
        };
        Self::with_message(status, err.to_string())
    }
}

impl From<rusqlite_migration::Error> for Error {
    fn from(err: rusqlite_migration::Error) -> Self {
        Self::backend(format!("Failed to run database migrations: {}", err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let status = match err.kind() {
            std::io::ErrorKind::OutOfMemory => Status::OutOfMemory,
            _ => Status::FileError,
        };
        Self::with_message(status, err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::backend(format!("Corrupt stored value: {}", err))
    }
}
