//! Thread assignment on add and thread splitting on removal

use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::debug;
use rusqlite::Connection;

use crate::error::Result;
use crate::models::{Message, MessageId, ThreadId};
use crate::storage::messages;

/// Pick the thread for a message about to be inserted.
///
/// Candidates are the threads of indexed parents, of indexed messages that
/// reference `id`, and of messages sharing one of `parents`. Several
/// candidates are merged into the smallest id; none yields a fresh one.
pub fn assign(conn: &Connection, id: &MessageId, parents: &[MessageId]) -> Result<ThreadId> {
    let mut candidates = BTreeSet::new();

    for parent in parents {
        if let Some(thread) = messages::thread_of_message_id(conn, parent)? {
            candidates.insert(thread);
        }
        candidates.extend(messages::threads_referencing(conn, parent)?);
    }
    candidates.extend(messages::threads_referencing(conn, id)?);

    let mut candidates = candidates.into_iter();
    let Some(target) = candidates.next() else {
        let fresh = messages::next_thread_id(conn)?;
        debug!("New thread {} for {}", fresh, id);
        return Ok(fresh);
    };

    for other in candidates {
        let moved = messages::rename_thread(conn, &other, &target)?;
        debug!("Merged thread {} into {} ({} messages)", other, target, moved);
    }
    Ok(target)
}

/// Union-find over string keys
#[derive(Default)]
struct Linkage {
    index: HashMap<String, usize>,
    parent: Vec<usize>,
}

impl Linkage {
    fn node(&mut self, key: &str) -> usize {
        if let Some(&idx) = self.index.get(key) {
            return idx;
        }
        let idx = self.parent.len();
        self.parent.push(idx);
        self.index.insert(key.to_string(), idx);
        idx
    }

    fn find(&mut self, mut idx: usize) -> usize {
        while self.parent[idx] != idx {
            self.parent[idx] = self.parent[self.parent[idx]];
            idx = self.parent[idx];
        }
        idx
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}

/// Group messages into connected components of reference linkage.
/// Each component is sorted oldest first; components are ordered by
/// their first message.
pub fn components(members: &[Message]) -> Vec<Vec<&Message>> {
    let mut linkage = Linkage::default();
    for msg in members {
        let own = linkage.node(msg.id.as_str());
        for parent in msg.parents() {
            let other = linkage.node(parent.as_str());
            linkage.union(own, other);
        }
    }

    let mut groups: BTreeMap<usize, Vec<&Message>> = BTreeMap::new();
    for msg in members {
        let node = linkage.node(msg.id.as_str());
        let root = linkage.find(node);
        groups.entry(root).or_default().push(msg);
    }

    let mut groups: Vec<Vec<&Message>> = groups.into_values().collect();
    for group in &mut groups {
        group.sort_by(|a, b| root_order(a, b));
    }
    groups.sort_by(|a, b| root_order(a[0], b[0]));
    groups
}

/// Thread root order: earliest date, then Message-ID
pub fn root_order(a: &Message, b: &Message) -> std::cmp::Ordering {
    (a.date, &a.id).cmp(&(b.date, &b.id))
}

/// Recompute `thread` after one of its messages was removed.
///
/// The component holding the earliest remaining message keeps the id;
/// every other component gets a fresh one.
pub fn split(conn: &Connection, thread: &ThreadId) -> Result<Vec<ThreadId>> {
    let docs = messages::docs_in_thread(conn, thread)?;
    let mut members = Vec::with_capacity(docs.len());
    for doc in docs {
        if let Some(msg) = messages::load(conn, doc)? {
            members.push(msg);
        }
    }
    if members.is_empty() {
        return Ok(Vec::new());
    }

    let groups = components(&members);
    let mut ids = vec![thread.clone()];
    for group in groups.iter().skip(1) {
        let fresh = messages::next_thread_id(conn)?;
        for msg in group {
            messages::set_thread(conn, msg.doc_id, &fresh)?;
        }
        debug!("Split {} messages off {} into {}", group.len(), thread, fresh);
        ids.push(fresh);
    }
    Ok(ids)
}

/// Earliest message of a set, by [`root_order`]
pub fn root_of<'a>(members: impl IntoIterator<Item = &'a Message>) -> Option<&'a Message> {
    members.into_iter().min_by(|a, b| root_order(a, b))
}
