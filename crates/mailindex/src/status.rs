//! Status codes returned by every index operation
//!
//! The ordinals are part of the external contract (C ABI, stored values)
//! and must never be reordered.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Text used for [`Status::NotInitialized`], rendered locally rather than
/// by the backend formatter.
pub const NOT_INITIALIZED_MESSAGE: &str = "Operation on uninitialized object impossible.";

/// Text used for codes outside the enumeration.
pub const UNKNOWN_STATUS_MESSAGE: &str = "Unknown error status value";

/// Outcome of an index operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum Status {
    Success = 0,
    OutOfMemory = 1,
    ReadOnlyDatabase = 2,
    /// Generic storage backend failure. Keeps the historical
    /// `XAPIAN_EXCEPTION` name on the wire.
    XapianException = 3,
    FileError = 4,
    FileNotEmail = 5,
    DuplicateMessageId = 6,
    NullPointer = 7,
    TagTooLong = 8,
    UnbalancedFreezeThaw = 9,
    NotInitialized = 10,
}

impl Status {
    /// Every status in ordinal order
    pub const ALL: [Status; 11] = [
        Status::Success,
        Status::OutOfMemory,
        Status::ReadOnlyDatabase,
        Status::XapianException,
        Status::FileError,
        Status::FileNotEmail,
        Status::DuplicateMessageId,
        Status::NullPointer,
        Status::TagTooLong,
        Status::UnbalancedFreezeThaw,
        Status::NotInitialized,
    ];

    /// Numeric code for this status
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Look up a status by numeric code
    pub fn from_code(code: i32) -> Option<Status> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
    }

    /// Constant-style name (`"READ_ONLY_DATABASE"`, ...)
    pub const fn name(self) -> &'static str {
        match self {
            Status::Success => "SUCCESS",
            Status::OutOfMemory => "OUT_OF_MEMORY",
            Status::ReadOnlyDatabase => "READ_ONLY_DATABASE",
            Status::XapianException => "XAPIAN_EXCEPTION",
            Status::FileError => "FILE_ERROR",
            Status::FileNotEmail => "FILE_NOT_EMAIL",
            Status::DuplicateMessageId => "DUPLICATE_MESSAGE_ID",
            Status::NullPointer => "NULL_POINTER",
            Status::TagTooLong => "TAG_TOO_LONG",
            Status::UnbalancedFreezeThaw => "UNBALANCED_FREEZE_THAW",
            Status::NotInitialized => "NOT_INITIALIZED",
        }
    }

    /// Human-readable description
    pub const fn description(self) -> &'static str {
        match self {
            Status::Success => "No error occurred",
            Status::OutOfMemory => "Out of memory",
            Status::ReadOnlyDatabase => "Attempt to write to a read-only database",
            Status::XapianException => "A backend storage exception occurred",
            Status::FileError => "Something went wrong trying to read or write a file",
            Status::FileNotEmail => "File is not an email",
            Status::DuplicateMessageId => "Message ID is identical to a message in database",
            Status::NullPointer => "Erroneous NULL pointer",
            Status::TagTooLong => "Tag value is too long (exceeds TAG_MAX)",
            Status::UnbalancedFreezeThaw => "Unbalanced number of calls to freeze/thaw",
            Status::NotInitialized => NOT_INITIALIZED_MESSAGE,
        }
    }

    pub const fn is_success(self) -> bool {
        matches!(self, Status::Success)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl From<Status> for i32 {
    fn from(status: Status) -> Self {
        status.code()
    }
}

impl TryFrom<i32> for Status {
    type Error = i32;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Status::from_code(code).ok_or(code)
    }
}

/// Render any numeric status code, including unknown ones.
pub fn status_to_string(code: i32) -> &'static str {
    match Status::from_code(code) {
        Some(status) => status.description(),
        None => UNKNOWN_STATUS_MESSAGE,
    }
}
