//! Tag rows and the reverse tag index

use rusqlite::{Connection, params};

use crate::error::Result;
use crate::models::DocId;

/// Returns true when the tag was not already set
pub fn insert(conn: &Connection, doc_id: DocId, tag: &str) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO tags (doc_id, tag) VALUES (?, ?)",
        params![doc_id, tag],
    )?;
    Ok(changed > 0)
}

/// Returns true when the tag was present
pub fn delete(conn: &Connection, doc_id: DocId, tag: &str) -> Result<bool> {
    let changed = conn.execute(
        "DELETE FROM tags WHERE doc_id = ? AND tag = ?",
        params![doc_id, tag],
    )?;
    Ok(changed > 0)
}

pub fn delete_all(conn: &Connection, doc_id: DocId) -> Result<usize> {
    Ok(conn.execute("DELETE FROM tags WHERE doc_id = ?", [doc_id])?)
}

pub fn bump_revision(conn: &Connection, doc_id: DocId) -> Result<u64> {
    let revision: i64 = conn.query_row(
        "UPDATE messages SET revision = revision + 1 WHERE doc_id = ? RETURNING revision",
        [doc_id],
        |row| row.get(0),
    )?;
    Ok(revision.max(0) as u64)
}

/// Docs carrying `tag`, ascending
pub fn docs_with_tag(conn: &Connection, tag: &str) -> Result<Vec<DocId>> {
    let mut stmt = conn.prepare("SELECT doc_id FROM tags WHERE tag = ? ORDER BY doc_id")?;
    let docs = stmt
        .query_map([tag], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<DocId>>>()?;
    Ok(docs)
}

/// Every tag in use, sorted
pub fn all(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT DISTINCT tag FROM tags ORDER BY tag")?;
    let tags = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(tags)
}
