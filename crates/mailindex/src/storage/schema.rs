//! Schema migrations and connection setup

use rusqlite::Connection;
use rusqlite_migration::{M, Migrations};

use crate::error::Result;

/// Schema version written by the newest migration
pub const SCHEMA_VERSION: i64 = 3;

/// Database migrations
///
/// Each migration is applied in order. The user_version pragma tracks which
/// migrations have been applied.
pub fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        // Migration 1: messages, files, references, tags and postings
        M::up(
            r#"
            CREATE TABLE metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE messages (
                doc_id INTEGER PRIMARY KEY AUTOINCREMENT,
                message_id TEXT NOT NULL UNIQUE,
                thread_id TEXT NOT NULL,
                date INTEGER NOT NULL DEFAULT 0,
                from_header TEXT NOT NULL DEFAULT '',
                to_header TEXT NOT NULL DEFAULT '',
                subject TEXT NOT NULL DEFAULT '',
                in_reply_to TEXT,
                content_hash TEXT NOT NULL,
                revision INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX idx_messages_thread_id ON messages(thread_id);

            -- One row per file; a message lives while it has at least one
            CREATE TABLE message_files (
                filename TEXT PRIMARY KEY,
                doc_id INTEGER NOT NULL,
                position INTEGER NOT NULL,
                FOREIGN KEY (doc_id) REFERENCES messages(doc_id) ON DELETE CASCADE
            );

            CREATE INDEX idx_message_files_doc ON message_files(doc_id);

            CREATE TABLE message_refs (
                doc_id INTEGER NOT NULL,
                referenced_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                PRIMARY KEY (doc_id, referenced_id),
                FOREIGN KEY (doc_id) REFERENCES messages(doc_id) ON DELETE CASCADE
            );

            CREATE INDEX idx_message_refs_target ON message_refs(referenced_id);

            CREATE TABLE tags (
                doc_id INTEGER NOT NULL,
                tag TEXT NOT NULL,
                PRIMARY KEY (doc_id, tag),
                FOREIGN KEY (doc_id) REFERENCES messages(doc_id) ON DELETE CASCADE
            );

            CREATE INDEX idx_tags_tag ON tags(tag);

            -- Full-text postings; positions are a JSON array of token offsets
            CREATE TABLE postings (
                term TEXT NOT NULL,
                doc_id INTEGER NOT NULL,
                positions TEXT NOT NULL,
                PRIMARY KEY (term, doc_id),
                FOREIGN KEY (doc_id) REFERENCES messages(doc_id) ON DELETE CASCADE
            ) WITHOUT ROWID;

            CREATE INDEX idx_postings_doc ON postings(doc_id);
            "#,
        ),
        // Migration 2: directory mtimes for incremental scans, date ordering
        M::up(
            r#"
            CREATE TABLE directories (
                path TEXT PRIMARY KEY,
                mtime INTEGER NOT NULL
            );

            CREATE INDEX idx_messages_date ON messages(date DESC);
            "#,
        ),
        // Migration 3: In-Reply-To targets take part in thread linkage.
        // `from_references` separates them from the References list.
        M::up(
            r#"
            ALTER TABLE message_refs
                ADD COLUMN from_references INTEGER NOT NULL DEFAULT 1;

            INSERT OR IGNORE INTO message_refs (doc_id, referenced_id, position, from_references)
            SELECT doc_id, in_reply_to, -1, 0 FROM messages
            WHERE in_reply_to IS NOT NULL AND in_reply_to != '';
            "#,
        ),
    ])
}

/// Apply the connection pragmas used by writers.
///
/// WAL lets readers keep a committed snapshot while the writer works;
/// foreign keys must be on for the cascading deletes.
pub fn configure_writer(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA cache_size = -64000;
        PRAGMA temp_store = MEMORY;
        PRAGMA foreign_keys = ON;
        "#,
    )?;
    Ok(())
}

pub fn configure_reader(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA cache_size = -16000;
        PRAGMA temp_store = MEMORY;
        "#,
    )?;
    Ok(())
}

/// Schema version recorded in the database file
pub fn stored_version(conn: &Connection) -> Result<i64> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}
