//! SQLite storage engine for the index

pub mod directories;
pub mod messages;
pub mod postings;
pub mod schema;
mod store;
pub mod tags;

pub use store::{INDEX_DIR, Mode, Store, database_path};
