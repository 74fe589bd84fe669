//! FFI-friendly type wrappers for UniFFI export
//!
//! These types convert internal Rust types to FFI-compatible versions:
//! - `PathBuf` → `String`
//! - `MessageId` / `ThreadId` → `String`
//! - `BTreeSet<String>` → sorted `Vec<String>`

use crate::error::Error;
use crate::index::AddOutcome;
use crate::models::{Message, Thread};
use crate::query::Sort;
use crate::scan::ScanStats;
use crate::status::Status;

// ============================================================================
// Status / Error Types
// ============================================================================

/// Status codes, same ordinals as [`Status`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiStatus {
    Success,
    OutOfMemory,
    ReadOnlyDatabase,
    XapianException,
    FileError,
    FileNotEmail,
    DuplicateMessageId,
    NullPointer,
    TagTooLong,
    UnbalancedFreezeThaw,
    NotInitialized,
}

impl From<Status> for FfiStatus {
    fn from(status: Status) -> Self {
        match status {
            Status::Success => FfiStatus::Success,
            Status::OutOfMemory => FfiStatus::OutOfMemory,
            Status::ReadOnlyDatabase => FfiStatus::ReadOnlyDatabase,
            Status::XapianException => FfiStatus::XapianException,
            Status::FileError => FfiStatus::FileError,
            Status::FileNotEmail => FfiStatus::FileNotEmail,
            Status::DuplicateMessageId => FfiStatus::DuplicateMessageId,
            Status::NullPointer => FfiStatus::NullPointer,
            Status::TagTooLong => FfiStatus::TagTooLong,
            Status::UnbalancedFreezeThaw => FfiStatus::UnbalancedFreezeThaw,
            Status::NotInitialized => FfiStatus::NotInitialized,
        }
    }
}

/// FFI-friendly error type
#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum IndexError {
    #[error("{message}")]
    Failed {
        status: FfiStatus,
        code: i32,
        message: String,
    },
}

impl IndexError {
    pub fn status(&self) -> FfiStatus {
        match self {
            IndexError::Failed { status, .. } => *status,
        }
    }
}

impl From<Error> for IndexError {
    fn from(err: Error) -> Self {
        IndexError::Failed {
            status: err.status().into(),
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl From<Status> for IndexError {
    fn from(status: Status) -> Self {
        Error::new(status).into()
    }
}

/// Result ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiSort {
    OldestFirst,
    NewestFirst,
    MessageId,
    Unsorted,
}

impl From<FfiSort> for Sort {
    fn from(sort: FfiSort) -> Self {
        match sort {
            FfiSort::OldestFirst => Sort::OldestFirst,
            FfiSort::NewestFirst => Sort::NewestFirst,
            FfiSort::MessageId => Sort::MessageId,
            FfiSort::Unsorted => Sort::Unsorted,
        }
    }
}

// ============================================================================
// Message Types
// ============================================================================

/// FFI-friendly message representation
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMessage {
    pub message_id: String,
    pub thread_id: String,
    pub filenames: Vec<String>,
    /// Unix timestamp (seconds since epoch)
    pub date: i64,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub in_reply_to: Option<String>,
    pub references: Vec<String>,
    pub tags: Vec<String>,
    pub revision: u64,
}

impl From<Message> for FfiMessage {
    fn from(m: Message) -> Self {
        Self {
            message_id: m.id.0,
            thread_id: m.thread_id.0,
            filenames: m
                .filenames
                .iter()
                .map(|f| f.to_string_lossy().into_owned())
                .collect(),
            date: m.date,
            from: m.from,
            to: m.to,
            subject: m.subject,
            in_reply_to: m.in_reply_to.map(|id| id.0),
            references: m.references.into_iter().map(|id| id.0).collect(),
            tags: m.tags.into_iter().collect(),
            revision: m.revision,
        }
    }
}

/// Outcome of adding one file
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAddResult {
    pub status: FfiStatus,
    pub message: FfiMessage,
}

impl From<AddOutcome> for FfiAddResult {
    fn from(outcome: AddOutcome) -> Self {
        Self {
            status: outcome.status.into(),
            message: outcome.message.into(),
        }
    }
}

// ============================================================================
// Thread Types
// ============================================================================

/// FFI-friendly thread summary
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiThread {
    pub thread_id: String,
    pub root_message_id: String,
    pub subject: String,
    pub authors: String,
    /// Unix timestamps of the oldest / newest matched message
    pub oldest_date: i64,
    pub newest_date: i64,
    pub total_messages: u32,
    pub matched_messages: u32,
    pub tags: Vec<String>,
    pub messages: Vec<FfiMessage>,
    pub toplevel_message_ids: Vec<String>,
}

impl From<Thread> for FfiThread {
    fn from(t: Thread) -> Self {
        Self {
            thread_id: t.id.0,
            root_message_id: t.root.0,
            subject: t.subject,
            authors: t.authors,
            oldest_date: t.oldest_date,
            newest_date: t.newest_date,
            total_messages: t.total_messages as u32,
            matched_messages: t.matched_messages as u32,
            tags: t.tags.into_iter().collect(),
            messages: t.messages.into_iter().map(FfiMessage::from).collect(),
            toplevel_message_ids: t.toplevel.into_iter().map(|id| id.0).collect(),
        }
    }
}

// ============================================================================
// Scan Types
// ============================================================================

/// FFI-friendly scan statistics
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiScanStats {
    pub added: u64,
    pub duplicates: u64,
    pub removed: u64,
    pub not_email: u64,
    pub errors: u64,
    pub directories: u64,
    pub duration_ms: u64,
}

impl From<ScanStats> for FfiScanStats {
    fn from(s: ScanStats) -> Self {
        Self {
            added: s.added as u64,
            duplicates: s.duplicates as u64,
            removed: s.removed as u64,
            not_email: s.not_email as u64,
            errors: s.errors as u64,
            directories: s.directories as u64,
            duration_ms: s.duration_ms,
        }
    }
}

// ============================================================================
// Log Callback
// ============================================================================

/// Log level for FFI callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<log::Level> for FfiLogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => FfiLogLevel::Error,
            log::Level::Warn => FfiLogLevel::Warn,
            log::Level::Info => FfiLogLevel::Info,
            log::Level::Debug => FfiLogLevel::Debug,
            log::Level::Trace => FfiLogLevel::Trace,
        }
    }
}

impl From<FfiLogLevel> for log::Level {
    fn from(level: FfiLogLevel) -> Self {
        match level {
            FfiLogLevel::Error => log::Level::Error,
            FfiLogLevel::Warn => log::Level::Warn,
            FfiLogLevel::Info => log::Level::Info,
            FfiLogLevel::Debug => log::Level::Debug,
            FfiLogLevel::Trace => log::Level::Trace,
        }
    }
}

/// Receives log records emitted by the index
#[uniffi::export(callback_interface)]
pub trait LogCallback: Send + Sync {
    /// `target` is the emitting module path, e.g. `mailindex::scan`
    fn on_log(&self, level: FfiLogLevel, target: String, message: String);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_preserves_ordinals() {
        for status in Status::ALL {
            let err = IndexError::from(status);
            let IndexError::Failed { code, status: ffi, .. } = err;
            assert_eq!(code, status.code());
            assert_eq!(ffi, FfiStatus::from(status));
        }
    }

    #[test]
    fn test_error_message_carried_through() {
        let err: IndexError = Error::with_message(Status::FileError, "Cannot read /x").into();
        assert_eq!(err.to_string(), "Cannot read /x");
        assert_eq!(err.status(), FfiStatus::FileError);
    }

    #[test]
    fn test_log_level_round_trip() {
        assert_eq!(log::Level::from(FfiLogLevel::Warn), log::Level::Warn);
        assert_eq!(FfiLogLevel::from(log::Level::Trace), FfiLogLevel::Trace);
    }
}
