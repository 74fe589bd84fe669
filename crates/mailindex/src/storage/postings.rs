//! Term postings: term → documents, with token positions for phrases

use std::collections::BTreeMap;

use rusqlite::{Connection, OptionalExtension, params};

use crate::error::Result;
use crate::models::DocId;

/// Term → positions for one document
pub type TermPositions = BTreeMap<String, Vec<u32>>;

pub fn insert(conn: &Connection, doc_id: DocId, terms: &TermPositions) -> Result<()> {
    let mut stmt =
        conn.prepare("INSERT OR REPLACE INTO postings (term, doc_id, positions) VALUES (?, ?, ?)")?;
    for (term, positions) in terms {
        let encoded = serde_json::to_string(positions)?;
        stmt.execute(params![term, doc_id, encoded])?;
    }
    Ok(())
}

/// Docs containing `term`, ascending
pub fn docs(conn: &Connection, term: &str) -> Result<Vec<DocId>> {
    let mut stmt =
        conn.prepare_cached("SELECT doc_id FROM postings WHERE term = ? ORDER BY doc_id")?;
    let docs = stmt
        .query_map([term], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<DocId>>>()?;
    Ok(docs)
}

/// Docs containing any term starting with `prefix`, ascending and unique
pub fn docs_with_prefix(conn: &Connection, prefix: &str) -> Result<Vec<DocId>> {
    let upper = format!("{}\u{10FFFF}", prefix);
    let mut stmt = conn.prepare_cached(
        "SELECT DISTINCT doc_id FROM postings WHERE term >= ? AND term < ? ORDER BY doc_id",
    )?;
    let docs = stmt
        .query_map(params![prefix, upper], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<DocId>>>()?;
    Ok(docs)
}

pub fn positions(conn: &Connection, term: &str, doc_id: DocId) -> Result<Vec<u32>> {
    let encoded: Option<String> = conn
        .prepare_cached("SELECT positions FROM postings WHERE term = ? AND doc_id = ?")?
        .query_row(params![term, doc_id], |row| row.get(0))
        .optional()?;
    match encoded {
        Some(encoded) => Ok(serde_json::from_str(&encoded)?),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::migrations;

    fn conn() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        migrations().to_latest(&mut conn).unwrap();
        for id in ["a", "b"] {
            conn.execute(
                "INSERT INTO messages (message_id, thread_id, content_hash) VALUES (?, 't', 'h')",
                [id],
            )
            .unwrap();
        }
        conn
    }

    #[test]
    fn test_postings_and_positions() {
        let conn = conn();
        let mut terms = TermPositions::new();
        terms.insert("text:hello".to_string(), vec![0, 4]);
        terms.insert("text:world".to_string(), vec![1]);
        insert(&conn, 1, &terms).unwrap();

        let mut other = TermPositions::new();
        other.insert("text:hello".to_string(), vec![2]);
        insert(&conn, 2, &other).unwrap();

        assert_eq!(docs(&conn, "text:hello").unwrap(), vec![1, 2]);
        assert_eq!(docs(&conn, "text:world").unwrap(), vec![1]);
        assert_eq!(positions(&conn, "text:hello", 1).unwrap(), vec![0, 4]);
        assert!(positions(&conn, "text:world", 2).unwrap().is_empty());
    }

    #[test]
    fn test_prefix_lookup() {
        let conn = conn();
        let mut terms = TermPositions::new();
        terms.insert("text:mailing".to_string(), vec![0]);
        terms.insert("text:mailbox".to_string(), vec![1]);
        insert(&conn, 1, &terms).unwrap();

        assert_eq!(docs_with_prefix(&conn, "text:mail").unwrap(), vec![1]);
        assert!(docs_with_prefix(&conn, "text:post").unwrap().is_empty());
    }
}
