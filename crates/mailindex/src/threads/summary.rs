//! Building thread summaries for search results

use std::collections::{BTreeSet, HashSet};

use crate::models::{DocId, Message, MessageId, Thread, ThreadId};
use crate::query::Sort;

use super::resolver::root_order;

const REPLY_PREFIXES: [&str; 4] = ["re: ", "aw: ", "vs: ", "sv: "];

/// Drop one leading reply marker (`Re: `, `Aw: `, `Vs: `, `Sv: `)
pub fn strip_reply_prefix(subject: &str) -> &str {
    let head = subject.get(..4).map(str::to_ascii_lowercase);
    match head {
        Some(head) if REPLY_PREFIXES.contains(&head.as_str()) => &subject[4..],
        _ => subject,
    }
}

fn push_unique(out: &mut Vec<String>, seen: &mut HashSet<String>, author: String) {
    if seen.insert(author.clone()) {
        out.push(author);
    }
}

/// Summarize a thread.
///
/// `members` are all messages of the thread; `matched` are the docs that
/// satisfied the query, in result order.
pub fn summarize(id: ThreadId, mut members: Vec<Message>, matched: &[DocId], sort: Sort) -> Thread {
    members.sort_by(root_order);

    let matched_set: HashSet<DocId> = matched.iter().copied().collect();
    let matched_msgs: Vec<&Message> = matched
        .iter()
        .filter_map(|doc| members.iter().find(|m| m.doc_id == *doc))
        .collect();

    let mut subject = members
        .first()
        .map(|m| m.subject.clone())
        .unwrap_or_default();
    let subject_source = match sort {
        Sort::OldestFirst => matched_msgs.iter().min_by(|a, b| root_order(a, b)),
        _ => matched_msgs.iter().max_by(|a, b| root_order(a, b)),
    };
    if let Some(source) = subject_source {
        subject = strip_reply_prefix(&source.subject).to_string();
    }

    let mut matched_authors = Vec::new();
    let mut seen = HashSet::new();
    for msg in &matched_msgs {
        if let Some(author) = msg.author() {
            push_unique(&mut matched_authors, &mut seen, author.author());
        }
    }
    let mut other_authors = Vec::new();
    for msg in &members {
        if let Some(author) = msg.author() {
            push_unique(&mut other_authors, &mut seen, author.author());
        }
    }
    let authors = match (matched_authors.is_empty(), other_authors.is_empty()) {
        (_, true) => matched_authors.join(", "),
        (true, false) => other_authors.join(", "),
        (false, false) => format!("{}| {}", matched_authors.join(", "), other_authors.join(", ")),
    };

    let dates: Vec<i64> = matched_msgs.iter().map(|m| m.date).collect();
    let oldest_date = dates.iter().copied().min().unwrap_or(0);
    let newest_date = dates.iter().copied().max().unwrap_or(0);

    let ids: HashSet<&MessageId> = members.iter().map(|m| &m.id).collect();
    let toplevel = members
        .iter()
        .filter(|m| {
            let parent = m.in_reply_to.as_ref().or_else(|| m.references.last());
            parent.is_none_or(|p| !ids.contains(p))
        })
        .map(|m| m.id.clone())
        .collect();

    let tags: BTreeSet<String> = members.iter().flat_map(|m| m.tags.iter().cloned()).collect();
    let root = members
        .first()
        .map(|m| m.id.clone())
        .unwrap_or_else(|| MessageId::new(""));
    let matched_messages = members.iter().filter(|m| matched_set.contains(&m.doc_id)).count();

    Thread {
        id,
        root,
        subject,
        authors,
        oldest_date,
        newest_date,
        total_messages: members.len(),
        matched_messages,
        tags,
        toplevel,
        messages: members,
    }
}
