//! IndexService facade for UniFFI export
//!
//! One service wraps one database handle registered with the library
//! context. [`crate::ffi::init_library`] must run first; after
//! [`IndexService::close`] or library teardown every call fails with
//! `NotInitialized`.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use crate::config::IndexConfig;
use crate::context::{self, DatabaseSlot};
use crate::database::Database;
use crate::error::{Error, Result};
use crate::ffi::types::*;
use crate::models::Message;
use crate::query::Query;
use crate::scan::{self, ScanOptions};
use crate::status::Status;
use crate::storage::Mode;

/// Main service object for index operations
#[derive(uniffi::Object)]
pub struct IndexService {
    slot: Arc<DatabaseSlot>,
    config: IndexConfig,
}

impl IndexService {
    fn register(db: Database) -> Result<Arc<Self>> {
        let ctx = context::current()?;
        let slot = Arc::new(RwLock::new(Some(db)));
        ctx.register(&slot);
        Ok(Arc::new(Self {
            slot,
            config: ctx.config().clone(),
        }))
    }

    fn with_db<T>(&self, f: impl FnOnce(&Database) -> Result<T>) -> Result<T, IndexError> {
        Ok(context::with_database(&self.slot, f)?)
    }

    fn query(&self, text: &str, sort: FfiSort) -> Result<Query> {
        Query::new(text)?
            .with_sort(sort.into())
            .with_exclude_tags(&self.config.exclude_tags)
    }

    fn message(db: &Database, message_id: &str) -> Result<Message> {
        db.find_message(message_id)?.ok_or_else(|| {
            Error::with_message(
                Status::NullPointer,
                format!("No message with id {}", message_id),
            )
        })
    }
}

#[uniffi::export]
impl IndexService {
    /// Open the index under the mail root `path`
    #[uniffi::constructor]
    pub fn open(path: String, read_only: bool) -> Result<Arc<Self>, IndexError> {
        context::current()?;
        let mode = if read_only {
            Mode::ReadOnly
        } else {
            Mode::ReadWrite
        };
        Ok(Self::register(Database::open(PathBuf::from(path), mode)?)?)
    }

    /// Create a new index under the mail root `path`
    #[uniffi::constructor]
    pub fn create(path: String) -> Result<Arc<Self>, IndexError> {
        context::current()?;
        Ok(Self::register(Database::create(PathBuf::from(path))?)?)
    }

    /// Open the database named by the library configuration
    #[uniffi::constructor]
    pub fn open_configured(read_only: bool) -> Result<Arc<Self>, IndexError> {
        let ctx = context::current()?;
        let mode = if read_only {
            Mode::ReadOnly
        } else {
            Mode::ReadWrite
        };
        let slot = ctx.open_database(mode)?;
        Ok(Arc::new(Self {
            slot,
            config: ctx.config().clone(),
        }))
    }

    /// Close the handle; safe to call repeatedly
    pub fn close(&self) -> Result<(), IndexError> {
        Ok(context::close_slot(&self.slot)?)
    }

    pub fn is_open(&self) -> bool {
        self.with_db(|_| Ok(())).is_ok()
    }

    pub fn path(&self) -> Result<String, IndexError> {
        self.with_db(|db| Ok(db.path().to_string_lossy().into_owned()))
    }

    pub fn version(&self) -> Result<i64, IndexError> {
        self.with_db(Database::version)
    }

    pub fn needs_upgrade(&self) -> Result<bool, IndexError> {
        self.with_db(Database::needs_upgrade)
    }

    pub fn upgrade(&self) -> Result<(), IndexError> {
        self.with_db(Database::upgrade)
    }

    // ========================================================================
    // Messages
    // ========================================================================

    pub fn add_message(&self, filename: String) -> Result<FfiAddResult, IndexError> {
        self.with_db(|db| Ok(db.add_message(&filename)?.into()))
    }

    pub fn remove_message(&self, filename: String) -> Result<FfiStatus, IndexError> {
        self.with_db(|db| Ok(db.remove_message(&filename)?.into()))
    }

    pub fn find_message(&self, message_id: String) -> Result<Option<FfiMessage>, IndexError> {
        self.with_db(|db| Ok(db.find_message(&message_id)?.map(FfiMessage::from)))
    }

    pub fn find_message_by_filename(
        &self,
        filename: String,
    ) -> Result<Option<FfiMessage>, IndexError> {
        self.with_db(|db| Ok(db.find_message_by_filename(&filename)?.map(FfiMessage::from)))
    }

    pub fn message_count(&self) -> Result<u64, IndexError> {
        self.with_db(|db| Ok(db.message_count()? as u64))
    }

    // ========================================================================
    // Tags
    // ========================================================================

    /// Add a tag; returns the updated message
    pub fn add_tag(&self, message_id: String, tag: String) -> Result<FfiMessage, IndexError> {
        self.with_db(|db| {
            let mut message = Self::message(db, &message_id)?;
            db.add_tag(&mut message, &tag)?;
            Ok(message.into())
        })
    }

    pub fn remove_tag(&self, message_id: String, tag: String) -> Result<FfiMessage, IndexError> {
        self.with_db(|db| {
            let mut message = Self::message(db, &message_id)?;
            db.remove_tag(&mut message, &tag)?;
            Ok(message.into())
        })
    }

    pub fn remove_all_tags(&self, message_id: String) -> Result<FfiMessage, IndexError> {
        self.with_db(|db| {
            let mut message = Self::message(db, &message_id)?;
            db.remove_all_tags(&mut message)?;
            Ok(message.into())
        })
    }

    pub fn all_tags(&self) -> Result<Vec<String>, IndexError> {
        self.with_db(Database::all_tags)
    }

    // ========================================================================
    // Freeze / transactions
    // ========================================================================

    pub fn freeze(&self) -> Result<(), IndexError> {
        self.with_db(Database::freeze)
    }

    pub fn thaw(&self) -> Result<(), IndexError> {
        self.with_db(Database::thaw)
    }

    pub fn begin(&self) -> Result<(), IndexError> {
        self.with_db(Database::begin)
    }

    pub fn commit(&self) -> Result<(), IndexError> {
        self.with_db(Database::commit)
    }

    pub fn rollback(&self) -> Result<(), IndexError> {
        self.with_db(Database::rollback)
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Matching messages; `limit` caps the number returned
    pub fn search_messages(
        &self,
        query: String,
        sort: FfiSort,
        limit: Option<u32>,
    ) -> Result<Vec<FfiMessage>, IndexError> {
        self.with_db(|db| {
            let results = db.search_messages(&self.query(&query, sort)?)?;
            let limit = limit.map_or(usize::MAX, |l| l as usize);
            Ok(results.take(limit).map(FfiMessage::from).collect())
        })
    }

    pub fn search_threads(
        &self,
        query: String,
        sort: FfiSort,
        limit: Option<u32>,
    ) -> Result<Vec<FfiThread>, IndexError> {
        self.with_db(|db| {
            let results = db.search_threads(&self.query(&query, sort)?)?;
            let limit = limit.map_or(usize::MAX, |l| l as usize);
            Ok(results.take(limit).map(FfiThread::from).collect())
        })
    }

    pub fn count_messages(&self, query: String) -> Result<u64, IndexError> {
        self.with_db(|db| {
            Ok(db.count_messages(&self.query(&query, FfiSort::Unsorted)?)? as u64)
        })
    }

    pub fn count_threads(&self, query: String) -> Result<u64, IndexError> {
        self.with_db(|db| {
            Ok(db.count_threads(&self.query(&query, FfiSort::Unsorted)?)? as u64)
        })
    }

    // ========================================================================
    // Scanning
    // ========================================================================

    /// Scan the mail root, tagging new messages with the configured tags
    pub fn scan(&self) -> Result<FfiScanStats, IndexError> {
        let db = self.with_db(|db| Ok(db.clone()))?;
        let options = ScanOptions::with_new_tags(self.config.new_tags.iter().cloned());
        Ok(scan::scan(&db, &options)?.into())
    }
}
