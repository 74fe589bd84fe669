//! mailindex - transactional mail indexing and search
//!
//! This crate provides:
//! - A durable index of mail files (one writer, many readers) in SQLite
//! - Tags, thread resolution and full-text postings per message
//! - A boolean query language with lazy message / thread results
//! - Freeze / explicit transaction batching
//! - An incremental scanner for mail directories
//! - A uniffi facade for foreign callers
//!
//! Every operation reports a [`Status`]; failures carry it inside
//! [`Error`] along with an optional message.

pub mod config;
pub mod context;
pub mod coordinator;
pub mod database;
pub mod error;
pub mod ffi;
pub mod index;
pub mod models;
pub mod query;
pub mod scan;
pub mod status;
pub mod storage;
pub mod threads;

pub use config::IndexConfig;
pub use coordinator::{BatchState, Coordinator};
pub use database::Database;
pub use error::{Error, Result};
pub use index::AddOutcome;
pub use models::{DocId, EmailAddress, Message, MessageId, TAG_MAX, Thread, ThreadId};
pub use query::{Messages, Query, Sort, Threads};
pub use scan::{ScanOptions, ScanStats, scan};
pub use status::{Status, status_to_string};
pub use storage::Mode;

uniffi::setup_scaffolding!();
