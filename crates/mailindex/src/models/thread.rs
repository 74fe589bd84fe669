//! Thread model: a conversation derived from reference linkage

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Message, MessageId};

/// Identifier for a thread, 16 lowercase hex digits
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ThreadId(pub String);

impl ThreadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Format a counter value as a thread id
    pub fn from_counter(value: u64) -> Self {
        Self(format!("{:016x}", value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ThreadId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ThreadId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Summary of a thread as returned by a thread search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: ThreadId,
    /// Earliest message by date, ties broken by Message-ID
    pub root: MessageId,
    pub subject: String,
    /// Matched authors, then `| ` and the rest
    pub authors: String,
    /// Date of the oldest matched message
    pub oldest_date: i64,
    /// Date of the newest matched message
    pub newest_date: i64,
    pub total_messages: usize,
    pub matched_messages: usize,
    /// Union of the tags of every message in the thread
    pub tags: BTreeSet<String>,
    /// All messages, oldest first
    pub messages: Vec<Message>,
    /// Messages whose parents are not part of the thread
    pub toplevel: Vec<MessageId>,
}

impl Thread {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.messages.iter().any(|m| &m.id == id)
    }
}
