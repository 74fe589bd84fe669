//! Lazy result sequences
//!
//! Both iterators hold the ordered result ids and load each entry on
//! demand. Entries that vanished since the query ran are skipped; once the
//! database is closed the iterator ends and reports itself invalid.

use log::warn;

use super::Sort;
use crate::database::Database;
use crate::models::{DocId, Message, Thread, ThreadId};
use crate::status::Status;

/// Matching messages in result order
pub struct Messages {
    db: Database,
    docs: Vec<DocId>,
    pos: usize,
    interrupted: bool,
}

impl Messages {
    pub(crate) fn new(db: Database, docs: Vec<DocId>) -> Self {
        Self {
            db,
            docs,
            pos: 0,
            interrupted: false,
        }
    }

    /// Number of matches when the query ran
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// False once exhausted or once the database went away
    pub fn is_valid(&self) -> bool {
        !self.interrupted && self.pos < self.docs.len() && self.db.is_open()
    }

    /// Start over from the first match
    pub fn restart(&mut self) {
        self.pos = 0;
        self.interrupted = false;
    }
}

impl Iterator for Messages {
    type Item = Message;

    fn next(&mut self) -> Option<Message> {
        while !self.interrupted && self.pos < self.docs.len() {
            let doc = self.docs[self.pos];
            self.pos += 1;
            match self.db.load_message(doc) {
                Ok(Some(message)) => return Some(message),
                Ok(None) => continue,
                Err(err) => {
                    if err.status() != Status::NotInitialized {
                        warn!("Stopping message iteration: {}", err);
                    }
                    self.interrupted = true;
                }
            }
        }
        None
    }
}

/// Matching threads, ordered by each thread's first matching message
pub struct Threads {
    db: Database,
    groups: Vec<(ThreadId, Vec<DocId>)>,
    sort: Sort,
    pos: usize,
    interrupted: bool,
}

impl Threads {
    pub(crate) fn new(db: Database, groups: Vec<(ThreadId, Vec<DocId>)>, sort: Sort) -> Self {
        Self {
            db,
            groups,
            sort,
            pos: 0,
            interrupted: false,
        }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn is_valid(&self) -> bool {
        !self.interrupted && self.pos < self.groups.len() && self.db.is_open()
    }

    pub fn restart(&mut self) {
        self.pos = 0;
        self.interrupted = false;
    }
}

impl Iterator for Threads {
    type Item = Thread;

    fn next(&mut self) -> Option<Thread> {
        while !self.interrupted && self.pos < self.groups.len() {
            let (id, matched) = &self.groups[self.pos];
            self.pos += 1;
            match self.db.summarize_thread(id, matched, self.sort) {
                Ok(Some(thread)) => return Some(thread),
                Ok(None) => continue,
                Err(err) => {
                    if err.status() != Status::NotInitialized {
                        warn!("Stopping thread iteration: {}", err);
                    }
                    self.interrupted = true;
                }
            }
        }
        None
    }
}
