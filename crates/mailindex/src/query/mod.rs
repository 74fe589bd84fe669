//! Search queries
//!
//! A [`Query`] is a parsed expression plus a sort order and a set of
//! exclude tags. Running it against a [`crate::Database`] yields lazy
//! [`Messages`] / [`Threads`] sequences or plain counts.

pub mod date;
mod eval;
pub mod parser;
mod results;

use std::collections::HashMap;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::index::Tokenizer;
use crate::models::{DocId, MessageId, ThreadId, validate_tag};
use crate::storage::messages;

pub use eval::{difference, intersect, union};
pub use parser::{Expr, Field, parse};
pub use results::{Messages, Threads};

/// Result ordering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sort {
    OldestFirst,
    #[default]
    NewestFirst,
    MessageId,
    Unsorted,
}

/// Per-document ordering key
#[derive(Debug, Clone)]
pub(crate) struct Hit {
    pub doc: DocId,
    pub date: i64,
    pub id: MessageId,
    pub thread: ThreadId,
}

/// A parsed search
#[derive(Debug, Clone)]
pub struct Query {
    text: String,
    expr: Expr,
    sort: Sort,
    exclude_tags: Vec<String>,
}

impl Query {
    /// Parse `text`; syntax errors and bad `date:` values surface here
    /// or when the query runs.
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        let expr = parse(&text)?;
        Ok(Self {
            text,
            expr,
            sort: Sort::default(),
            exclude_tags: Vec::new(),
        })
    }

    /// Query matching every message
    pub fn all() -> Self {
        Self {
            text: String::new(),
            expr: Expr::All,
            sort: Sort::default(),
            exclude_tags: Vec::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn sort(&self) -> Sort {
        self.sort
    }

    pub fn set_sort(&mut self, sort: Sort) {
        self.sort = sort;
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    /// Hide messages carrying `tag` unless the query itself names it.
    pub fn exclude_tag(&mut self, tag: &str) -> Result<()> {
        validate_tag(tag)?;
        if !self.exclude_tags.iter().any(|t| t == tag) {
            self.exclude_tags.push(tag.to_string());
        }
        Ok(())
    }

    pub fn with_exclude_tags<I, S>(mut self, tags: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for tag in tags {
            self.exclude_tag(tag.as_ref())?;
        }
        Ok(self)
    }

    pub fn exclude_tags(&self) -> &[String] {
        &self.exclude_tags
    }

    /// Exclude tags still in force: those the expression does not mention
    fn active_excludes(&self) -> Vec<&str> {
        let mentioned = self.expr.mentioned_tags();
        self.exclude_tags
            .iter()
            .map(String::as_str)
            .filter(|tag| !mentioned.contains(tag))
            .collect()
    }

    /// Matching docs, ascending by doc id
    pub(crate) fn matching_docs(
        &self,
        conn: &Connection,
        tokenizer: &mut Tokenizer,
    ) -> Result<Vec<DocId>> {
        let excluded = eval::excluded_docs(conn, &self.active_excludes())?;
        let matched = eval::Evaluator::new(conn, tokenizer).eval(&self.expr)?;
        Ok(difference(&matched, &excluded))
    }

    /// Matching docs in result order
    pub(crate) fn hits(&self, conn: &Connection, tokenizer: &mut Tokenizer) -> Result<Vec<Hit>> {
        let docs = self.matching_docs(conn, tokenizer)?;
        let mut hits: Vec<Hit> = messages::sort_keys(conn, &docs)?
            .into_iter()
            .map(|(doc, date, id, thread)| Hit {
                doc,
                date,
                id,
                thread,
            })
            .collect();
        sort_hits(&mut hits, self.sort);
        Ok(hits)
    }
}

pub(crate) fn sort_hits(hits: &mut [Hit], sort: Sort) {
    match sort {
        Sort::NewestFirst => hits.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id))),
        Sort::OldestFirst => hits.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id))),
        Sort::MessageId => hits.sort_by(|a, b| a.id.cmp(&b.id)),
        Sort::Unsorted => hits.sort_by_key(|h| h.doc),
    }
}

/// Group hits by thread, threads ordered by their first hit
pub(crate) fn group_by_thread(hits: &[Hit]) -> Vec<(ThreadId, Vec<DocId>)> {
    let mut groups: Vec<(ThreadId, Vec<DocId>)> = Vec::new();
    let mut slots: HashMap<&ThreadId, usize> = HashMap::new();
    for hit in hits {
        match slots.get(&hit.thread) {
            Some(&slot) => groups[slot].1.push(hit.doc),
            None => {
                slots.insert(&hit.thread, groups.len());
                groups.push((hit.thread.clone(), vec![hit.doc]));
            }
        }
    }
    groups
}
