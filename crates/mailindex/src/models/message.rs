//! Message model for an indexed email

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EmailAddress, ThreadId};

/// Internal document number of an indexed message
pub type DocId = i64;

/// RFC 822 Message-ID without the angle brackets
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Snapshot of an indexed message
///
/// A `Message` is a copy of what the database held when it was loaded.
/// Mutating operations on [`crate::Database`] that take `&mut Message`
/// keep the snapshot in step with storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub doc_id: DocId,
    pub id: MessageId,
    pub thread_id: ThreadId,
    /// Files holding this message, in the order they were indexed
    pub filenames: Vec<PathBuf>,
    /// Seconds since the Unix epoch, 0 when the Date header is missing
    pub date: i64,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub in_reply_to: Option<MessageId>,
    pub references: Vec<MessageId>,
    /// SHA-256 of the first file indexed for this message
    pub content_hash: String,
    pub tags: BTreeSet<String>,
    /// Bumped on every effective tag change
    pub revision: u64,
}

impl Message {
    /// First filename associated with the message
    pub fn filename(&self) -> Option<&Path> {
        self.filenames.first().map(PathBuf::as_path)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn date_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.date, 0)
    }

    /// Parsed first address of the From header
    pub fn author(&self) -> Option<EmailAddress> {
        EmailAddress::parse_first(&self.from)
    }

    /// Every Message-ID this message points at: References plus In-Reply-To
    pub fn parents(&self) -> impl Iterator<Item = &MessageId> {
        self.references
            .iter()
            .chain(self.in_reply_to.iter().filter(|p| !self.references.contains(p)))
    }

    /// Look up one of the stored headers by (case-insensitive) name
    pub fn header(&self, name: &str) -> Option<&str> {
        match name.to_ascii_lowercase().as_str() {
            "from" => Some(&self.from),
            "to" => Some(&self.to),
            "subject" => Some(&self.subject),
            "message-id" => Some(self.id.as_str()),
            "in-reply-to" => self.in_reply_to.as_ref().map(MessageId::as_str),
            _ => None,
        }
    }
}
