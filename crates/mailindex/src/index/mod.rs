//! Message index: file → message identity, metadata and postings

pub mod parse;
pub mod terms;

use log::debug;
use rusqlite::Connection;

use crate::error::Result;
use crate::models::{DocId, Message};
use crate::status::Status;
use crate::storage::{messages, postings};
use crate::threads;

pub use parse::{ParsedMessage, parse_bytes, parse_file};
pub use terms::Tokenizer;

/// Result of adding a file: the message it belongs to, and `Success` for
/// a new message or `DuplicateMessageId` when the Message-ID was already
/// indexed.
#[derive(Debug, Clone)]
pub struct AddOutcome {
    pub message: Message,
    pub status: Status,
}

impl AddOutcome {
    pub fn is_new(&self) -> bool {
        self.status == Status::Success
    }
}

/// Index a parsed file stored under `filename`.
///
/// A file already indexed, or a Message-ID already present, only gains a
/// file association and reports `DuplicateMessageId`.
pub fn add(
    conn: &Connection,
    filename: &str,
    parsed: &ParsedMessage,
    tokenizer: &mut Tokenizer,
) -> Result<(DocId, Status)> {
    if let Some(doc) = messages::doc_for_filename(conn, filename)? {
        return Ok((doc, Status::DuplicateMessageId));
    }

    if let Some(doc) = messages::doc_for_message_id(conn, &parsed.message_id)? {
        messages::attach_file(conn, doc, filename)?;
        debug!("{} is another copy of {}", filename, parsed.message_id);
        return Ok((doc, Status::DuplicateMessageId));
    }

    let parents = parsed.parents();
    let thread_id = threads::assign(conn, &parsed.message_id, &parents)?;
    let doc = messages::insert_message(
        conn,
        &messages::NewMessage {
            message_id: &parsed.message_id,
            thread_id: &thread_id,
            date: parsed.date,
            from: &parsed.from,
            to: &parsed.to,
            subject: &parsed.subject,
            in_reply_to: parsed.in_reply_to.as_ref(),
            references: &parsed.references,
            content_hash: &parsed.content_hash,
        },
    )?;
    messages::attach_file(conn, doc, filename)?;
    postings::insert(conn, doc, &terms::build_terms(parsed, tokenizer))?;

    debug!("Indexed {} as doc {} in thread {}", parsed.message_id, doc, thread_id);
    Ok((doc, Status::Success))
}

/// Drop `filename` from the index.
///
/// `Success` when the file was the message's last (the message is gone and
/// its thread recomputed) or was never indexed; `DuplicateMessageId` when
/// other files still hold the message.
pub fn remove(conn: &Connection, filename: &str) -> Result<Status> {
    let Some((doc, remaining)) = messages::detach_file(conn, filename)? else {
        return Ok(Status::Success);
    };
    if remaining > 0 {
        return Ok(Status::DuplicateMessageId);
    }

    let thread = messages::thread_of(conn, doc)?;
    messages::delete_message(conn, doc)?;
    if let Some(thread) = thread {
        threads::split(conn, &thread)?;
    }
    debug!("Removed doc {} with its last file {}", doc, filename);
    Ok(Status::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageId;
    use crate::storage::schema::migrations;

    fn conn() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        migrations().to_latest(&mut conn).unwrap();
        conn
    }

    fn parsed(id: &str, refs: &[&str]) -> ParsedMessage {
        let raw = format!(
            "From: a@example.com\r\nSubject: s {id}\r\nMessage-ID: <{id}>\r\nReferences: {}\r\n\r\nbody of {id}\r\n",
            refs.iter().map(|r| format!("<{}>", r)).collect::<Vec<_>>().join(" ")
        );
        parse_bytes(raw.as_bytes()).unwrap()
    }

    #[test]
    fn test_duplicate_message_id() {
        let conn = conn();
        let mut tok = Tokenizer::new();
        let p = parsed("m1", &[]);
        let (doc, status) = add(&conn, "a", &p, &mut tok).unwrap();
        assert_eq!(status, Status::Success);
        let (dup, status) = add(&conn, "b", &p, &mut tok).unwrap();
        assert_eq!((dup, status), (doc, Status::DuplicateMessageId));
        // same file twice
        assert_eq!(add(&conn, "b", &p, &mut tok).unwrap().1, Status::DuplicateMessageId);

        assert_eq!(remove(&conn, "a").unwrap(), Status::DuplicateMessageId);
        assert!(messages::load(&conn, doc).unwrap().is_some());
        assert_eq!(remove(&conn, "b").unwrap(), Status::Success);
        assert!(messages::load(&conn, doc).unwrap().is_none());
        assert_eq!(remove(&conn, "b").unwrap(), Status::Success);
    }

    #[test]
    fn test_reply_joins_parent_thread() {
        let conn = conn();
        let mut tok = Tokenizer::new();
        let (parent, _) = add(&conn, "p", &parsed("p", &[]), &mut tok).unwrap();
        let (child, _) = add(&conn, "c", &parsed("c", &["p"]), &mut tok).unwrap();
        assert_eq!(
            messages::thread_of(&conn, parent).unwrap(),
            messages::thread_of(&conn, child).unwrap()
        );
    }

    #[test]
    fn test_parent_arriving_late_merges_threads() {
        let conn = conn();
        let mut tok = Tokenizer::new();
        let (a, _) = add(&conn, "a", &parsed("a", &["root"]), &mut tok).unwrap();
        let (b, _) = add(&conn, "b", &parsed("b", &["other"]), &mut tok).unwrap();
        assert_ne!(
            messages::thread_of(&conn, a).unwrap(),
            messages::thread_of(&conn, b).unwrap()
        );

        // references both chains
        let (c, _) = add(&conn, "c", &parsed("c", &["root", "other"]), &mut tok).unwrap();
        let ta = messages::thread_of(&conn, a).unwrap().unwrap();
        assert_eq!(messages::thread_of(&conn, b).unwrap().unwrap(), ta);
        assert_eq!(messages::thread_of(&conn, c).unwrap().unwrap(), ta);
        assert_eq!(ta.as_str(), "0000000000000001");
    }

    #[test]
    fn test_removing_link_splits_thread() {
        let conn = conn();
        let mut tok = Tokenizer::new();
        let (a, _) = add(&conn, "a", &parsed("a", &[]), &mut tok).unwrap();
        add(&conn, "b", &parsed("b", &["a"]), &mut tok).unwrap();
        let (c, _) = add(&conn, "c", &parsed("c", &["b"]), &mut tok).unwrap();
        let before = messages::thread_of(&conn, a).unwrap();
        assert_eq!(messages::thread_of(&conn, c).unwrap(), before);

        remove(&conn, "b").unwrap();
        assert_eq!(messages::thread_of(&conn, a).unwrap(), before);
        assert_ne!(messages::thread_of(&conn, c).unwrap(), before);
    }

    #[test]
    fn test_postings_written() {
        let conn = conn();
        let mut tok = Tokenizer::new();
        let (doc, _) = add(&conn, "a", &parsed("m1", &[]), &mut tok).unwrap();
        assert_eq!(postings::docs(&conn, "text:body").unwrap(), vec![doc]);
        assert_eq!(
            messages::doc_for_message_id(&conn, &MessageId::new("m1")).unwrap(),
            Some(doc)
        );
    }
}
