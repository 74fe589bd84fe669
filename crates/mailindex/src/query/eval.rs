//! Query evaluation over posting lists
//!
//! Every intermediate result is a sorted, duplicate-free list of doc ids so
//! AND / OR / NOT reduce to linear merges.

use std::cmp::Ordering;

use rusqlite::{Connection, params};

use super::date;
use super::parser::{Expr, Field};
use crate::error::Result;
use crate::index::terms::{self, Tokenizer};
use crate::models::{DocId, MessageId, ThreadId};
use crate::storage::{messages, postings, tags};

pub fn intersect(a: &[DocId], b: &[DocId]) -> Vec<DocId> {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}

pub fn union(a: &[DocId], b: &[DocId]) -> Vec<DocId> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

/// Docs in `a` but not in `b`
pub fn difference(a: &[DocId], b: &[DocId]) -> Vec<DocId> {
    let mut out = Vec::with_capacity(a.len());
    let mut j = 0;
    for &doc in a {
        while j < b.len() && b[j] < doc {
            j += 1;
        }
        if j >= b.len() || b[j] != doc {
            out.push(doc);
        }
    }
    out
}

/// Evaluates expressions against one connection
pub struct Evaluator<'a> {
    conn: &'a Connection,
    tokenizer: &'a mut Tokenizer,
    all: Option<Vec<DocId>>,
}

impl<'a> Evaluator<'a> {
    pub fn new(conn: &'a Connection, tokenizer: &'a mut Tokenizer) -> Self {
        Self {
            conn,
            tokenizer,
            all: None,
        }
    }

    fn all_docs(&mut self) -> Result<Vec<DocId>> {
        if self.all.is_none() {
            self.all = Some(messages::all_docs(self.conn)?);
        }
        Ok(self.all.clone().unwrap_or_default())
    }

    pub fn eval(&mut self, expr: &Expr) -> Result<Vec<DocId>> {
        match expr {
            Expr::All => self.all_docs(),
            Expr::Term { field, value } => self.term(*field, value),
            Expr::And(a, b) => match (a.as_ref(), b.as_ref()) {
                (_, Expr::Not(neg)) => {
                    let left = self.eval(a)?;
                    if left.is_empty() {
                        return Ok(left);
                    }
                    Ok(difference(&left, &self.eval(neg)?))
                }
                (Expr::Not(neg), _) => {
                    let right = self.eval(b)?;
                    if right.is_empty() {
                        return Ok(right);
                    }
                    Ok(difference(&right, &self.eval(neg)?))
                }
                _ => {
                    let left = self.eval(a)?;
                    if left.is_empty() {
                        return Ok(left);
                    }
                    Ok(intersect(&left, &self.eval(b)?))
                }
            },
            Expr::Or(a, b) => Ok(union(&self.eval(a)?, &self.eval(b)?)),
            Expr::Not(inner) => {
                let excluded = self.eval(inner)?;
                Ok(difference(&self.all_docs()?, &excluded))
            }
        }
    }

    fn term(&mut self, field: Field, value: &str) -> Result<Vec<DocId>> {
        match field {
            Field::Tag => tags::docs_with_tag(self.conn, value),
            Field::Id => {
                let id = value.trim_start_matches('<').trim_end_matches('>');
                Ok(messages::doc_for_message_id(self.conn, &MessageId::new(id))?
                    .into_iter()
                    .collect())
            }
            Field::Thread => messages::docs_in_thread(self.conn, &ThreadId::new(value)),
            Field::Date => {
                let (start, end) = date::parse_range_now(value)?;
                self.date_range(start, end)
            }
            Field::Text => self.words(terms::TEXT, value),
            Field::From => self.words(terms::FROM, value),
            Field::To => self.words(terms::TO, value),
            Field::Subject => self.words(terms::SUBJECT, value),
            Field::Attachment => self.words(terms::ATTACHMENT, value),
        }
    }

    fn date_range(&self, start: i64, end: i64) -> Result<Vec<DocId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT doc_id FROM messages WHERE date BETWEEN ? AND ? ORDER BY doc_id")?;
        let docs = stmt
            .query_map(params![start, end], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<DocId>>>()?;
        Ok(docs)
    }

    /// One word is a posting lookup, a trailing `*` a prefix lookup, and
    /// several words a phrase.
    fn words(&mut self, prefix: &str, value: &str) -> Result<Vec<DocId>> {
        if let Some(stem) = value.strip_suffix('*') {
            let words = self.tokenizer.words(stem);
            if let [word] = words.as_slice() {
                return postings::docs_with_prefix(self.conn, &format!("{}{}", prefix, word));
            }
        }

        let tokens = self.tokenizer.tokens(value);
        match tokens.as_slice() {
            [] => Ok(Vec::new()),
            [(word, _)] => postings::docs(self.conn, &format!("{}{}", prefix, word)),
            _ => self.phrase(prefix, &tokens),
        }
    }

    /// Offsets come from the query's own token positions, so words the
    /// analyzer drops (over-long tokens) leave the same gap as in the index.
    fn phrase(&mut self, prefix: &str, tokens: &[(String, u32)]) -> Result<Vec<DocId>> {
        let first = tokens[0].1;
        let terms: Vec<(String, u32)> = tokens
            .iter()
            .map(|(word, position)| (format!("{}{}", prefix, word), position - first))
            .collect();

        let mut candidates = postings::docs(self.conn, &terms[0].0)?;
        for (term, _) in &terms[1..] {
            if candidates.is_empty() {
                return Ok(candidates);
            }
            candidates = intersect(&candidates, &postings::docs(self.conn, term)?);
        }

        let mut out = Vec::new();
        for doc in candidates {
            if self.phrase_matches(&terms, doc)? {
                out.push(doc);
            }
        }
        Ok(out)
    }

    fn phrase_matches(&self, terms: &[(String, u32)], doc: DocId) -> Result<bool> {
        let mut lists = Vec::with_capacity(terms.len());
        for (term, offset) in terms {
            lists.push((postings::positions(self.conn, term, doc)?, *offset));
        }
        let (starts, _) = &lists[0];
        let found = starts.iter().any(|&start| {
            lists[1..]
                .iter()
                .all(|(positions, offset)| positions.binary_search(&(start + offset)).is_ok())
        });
        Ok(found)
    }
}

/// Docs carrying any of `exclude`, ascending
pub fn excluded_docs(conn: &Connection, exclude: &[&str]) -> Result<Vec<DocId>> {
    let mut out = Vec::new();
    for tag in exclude {
        out = union(&out, &tags::docs_with_tag(conn, tag)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_operations() {
        let a = [1, 3, 5, 7];
        let b = [3, 4, 5, 8];
        assert_eq!(intersect(&a, &b), vec![3, 5]);
        assert_eq!(union(&a, &b), vec![1, 3, 4, 5, 7, 8]);
        assert_eq!(difference(&a, &b), vec![1, 7]);
        assert_eq!(difference(&a, &[]), a.to_vec());
        assert!(intersect(&a, &[]).is_empty());
    }
}
