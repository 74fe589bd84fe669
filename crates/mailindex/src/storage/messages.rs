//! Message rows, file associations and references

use std::collections::BTreeSet;

use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

use crate::error::Result;
use crate::models::{DocId, Message, MessageId, ThreadId};

/// Header data written for a newly indexed message
#[derive(Debug, Clone)]
pub struct NewMessage<'a> {
    pub message_id: &'a MessageId,
    pub thread_id: &'a ThreadId,
    pub date: i64,
    pub from: &'a str,
    pub to: &'a str,
    pub subject: &'a str,
    pub in_reply_to: Option<&'a MessageId>,
    pub references: &'a [MessageId],
    pub content_hash: &'a str,
}

/// SQLite limits bound parameters; stay well below it
pub const CHUNK_SIZE: usize = 500;

pub fn insert_message(conn: &Connection, msg: &NewMessage<'_>) -> Result<DocId> {
    conn.execute(
        "INSERT INTO messages
         (message_id, thread_id, date, from_header, to_header, subject, in_reply_to, content_hash)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            msg.message_id.as_str(),
            msg.thread_id.as_str(),
            msg.date,
            msg.from,
            msg.to,
            msg.subject,
            msg.in_reply_to.map(MessageId::as_str),
            msg.content_hash,
        ],
    )?;
    let doc_id = conn.last_insert_rowid();

    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO message_refs (doc_id, referenced_id, position, from_references)
         VALUES (?, ?, ?, ?)",
    )?;
    for (position, reference) in msg.references.iter().enumerate() {
        stmt.execute(params![doc_id, reference.as_str(), position as i64, true])?;
    }
    // Kept for thread linkage only; ignored when a References entry exists
    if let Some(parent) = msg.in_reply_to {
        stmt.execute(params![doc_id, parent.as_str(), -1i64, false])?;
    }

    Ok(doc_id)
}

/// Delete a message; files, references, tags and postings cascade.
pub fn delete_message(conn: &Connection, doc_id: DocId) -> Result<()> {
    conn.execute("DELETE FROM messages WHERE doc_id = ?", [doc_id])?;
    Ok(())
}

pub fn doc_for_message_id(conn: &Connection, id: &MessageId) -> Result<Option<DocId>> {
    Ok(conn
        .query_row(
            "SELECT doc_id FROM messages WHERE message_id = ?",
            [id.as_str()],
            |row| row.get(0),
        )
        .optional()?)
}

pub fn doc_for_filename(conn: &Connection, filename: &str) -> Result<Option<DocId>> {
    Ok(conn
        .query_row(
            "SELECT doc_id FROM message_files WHERE filename = ?",
            [filename],
            |row| row.get(0),
        )
        .optional()?)
}

/// Associate a file with a message. Returns false when already attached.
pub fn attach_file(conn: &Connection, doc_id: DocId, filename: &str) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO message_files (filename, doc_id, position)
         VALUES (?, ?, (SELECT COALESCE(MAX(position), -1) + 1 FROM message_files WHERE doc_id = ?))",
        params![filename, doc_id, doc_id],
    )?;
    Ok(changed > 0)
}

/// Drop a file association, returning the owning doc and how many files
/// it still has.
pub fn detach_file(conn: &Connection, filename: &str) -> Result<Option<(DocId, usize)>> {
    let Some(doc_id) = doc_for_filename(conn, filename)? else {
        return Ok(None);
    };
    conn.execute("DELETE FROM message_files WHERE filename = ?", [filename])?;
    let remaining: i64 = conn.query_row(
        "SELECT COUNT(*) FROM message_files WHERE doc_id = ?",
        [doc_id],
        |row| row.get(0),
    )?;
    Ok(Some((doc_id, remaining as usize)))
}

pub fn filenames(conn: &Connection, doc_id: DocId) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT filename FROM message_files WHERE doc_id = ? ORDER BY position")?;
    let names = stmt
        .query_map([doc_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
}

pub fn references(conn: &Connection, doc_id: DocId) -> Result<Vec<MessageId>> {
    let mut stmt = conn
        .prepare(
            "SELECT referenced_id FROM message_refs
             WHERE doc_id = ? AND from_references = 1 ORDER BY position",
        )?;
    let refs = stmt
        .query_map([doc_id], |row| row.get::<_, String>(0))?
        .map(|r| r.map(MessageId::new))
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(refs)
}

pub fn tags(conn: &Connection, doc_id: DocId) -> Result<BTreeSet<String>> {
    let mut stmt = conn.prepare("SELECT tag FROM tags WHERE doc_id = ?")?;
    let tags = stmt
        .query_map([doc_id], |row| row.get(0))?
        .collect::<rusqlite::Result<BTreeSet<String>>>()?;
    Ok(tags)
}

/// Load a full message snapshot. Filenames are returned as stored.
pub fn load(conn: &Connection, doc_id: DocId) -> Result<Option<Message>> {
    let row = conn
        .query_row(
            "SELECT message_id, thread_id, date, from_header, to_header, subject,
                    in_reply_to, content_hash, revision
             FROM messages WHERE doc_id = ?",
            [doc_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, i64>(8)?,
                ))
            },
        )
        .optional()?;

    let Some((id, thread_id, date, from, to, subject, in_reply_to, content_hash, revision)) = row
    else {
        return Ok(None);
    };

    Ok(Some(Message {
        doc_id,
        id: MessageId::new(id),
        thread_id: ThreadId::new(thread_id),
        filenames: filenames(conn, doc_id)?.into_iter().map(Into::into).collect(),
        date,
        from,
        to,
        subject,
        in_reply_to: in_reply_to.map(MessageId::new),
        references: references(conn, doc_id)?,
        content_hash,
        tags: tags(conn, doc_id)?,
        revision: revision.max(0) as u64,
    }))
}

pub fn thread_of(conn: &Connection, doc_id: DocId) -> Result<Option<ThreadId>> {
    Ok(conn
        .query_row(
            "SELECT thread_id FROM messages WHERE doc_id = ?",
            [doc_id],
            |row| row.get::<_, String>(0),
        )
        .optional()?
        .map(ThreadId::new))
}

pub fn set_thread(conn: &Connection, doc_id: DocId, thread_id: &ThreadId) -> Result<()> {
    conn.execute(
        "UPDATE messages SET thread_id = ? WHERE doc_id = ?",
        params![thread_id.as_str(), doc_id],
    )?;
    Ok(())
}

/// Move every member of `from` into `to`
pub fn rename_thread(conn: &Connection, from: &ThreadId, to: &ThreadId) -> Result<usize> {
    Ok(conn.execute(
        "UPDATE messages SET thread_id = ? WHERE thread_id = ?",
        params![to.as_str(), from.as_str()],
    )?)
}

pub fn docs_in_thread(conn: &Connection, thread_id: &ThreadId) -> Result<Vec<DocId>> {
    let mut stmt = conn.prepare("SELECT doc_id FROM messages WHERE thread_id = ? ORDER BY doc_id")?;
    let docs = stmt
        .query_map([thread_id.as_str()], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<DocId>>>()?;
    Ok(docs)
}

/// Threads of messages that reference `id` through References or
/// In-Reply-To
pub fn threads_referencing(conn: &Connection, id: &MessageId) -> Result<Vec<ThreadId>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT m.thread_id FROM message_refs r
         JOIN messages m ON m.doc_id = r.doc_id
         WHERE r.referenced_id = ?",
    )?;
    let threads = stmt
        .query_map([id.as_str()], |row| row.get::<_, String>(0))?
        .map(|r| r.map(ThreadId::new))
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(threads)
}

/// Thread of the message with Message-ID `id`, if indexed
pub fn thread_of_message_id(conn: &Connection, id: &MessageId) -> Result<Option<ThreadId>> {
    Ok(conn
        .query_row(
            "SELECT thread_id FROM messages WHERE message_id = ?",
            [id.as_str()],
            |row| row.get::<_, String>(0),
        )
        .optional()?
        .map(ThreadId::new))
}

/// Allocate the next thread id from the persisted counter
pub fn next_thread_id(conn: &Connection) -> Result<ThreadId> {
    let last: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = 'last_thread_id'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    let next = last.and_then(|v| v.parse::<u64>().ok()).unwrap_or(0) + 1;
    conn.execute(
        "INSERT INTO metadata (key, value) VALUES ('last_thread_id', ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        [next.to_string()],
    )?;
    Ok(ThreadId::from_counter(next))
}

pub fn message_count(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
    Ok(count as usize)
}

/// Every doc id, ascending
pub fn all_docs(conn: &Connection) -> Result<Vec<DocId>> {
    let mut stmt = conn.prepare("SELECT doc_id FROM messages ORDER BY doc_id")?;
    let docs = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<DocId>>>()?;
    Ok(docs)
}

/// Sort keys for a set of docs: (doc_id, date, message_id, thread_id).
/// Missing docs are left out.
pub fn sort_keys(
    conn: &Connection,
    docs: &[DocId],
) -> Result<Vec<(DocId, i64, MessageId, ThreadId)>> {
    let mut out = Vec::with_capacity(docs.len());
    for chunk in docs.chunks(CHUNK_SIZE) {
        let placeholders = vec!["?"; chunk.len()].join(", ");
        let sql = format!(
            "SELECT doc_id, date, message_id, thread_id FROM messages WHERE doc_id IN ({})",
            placeholders
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| {
            Ok((
                row.get::<_, DocId>(0)?,
                row.get::<_, i64>(1)?,
                MessageId::new(row.get::<_, String>(2)?),
                ThreadId::new(row.get::<_, String>(3)?),
            ))
        })?;
        for row in rows {
            out.push(row?);
        }
    }
    Ok(out)
}
