//! Database handle
//!
//! [`Database`] is a cheap, cloneable handle around one [`Store`]. All
//! operations lock the shared state, so a handle may be used from several
//! threads and closed from any of them; once closed every operation (and
//! every live [`Messages`] / [`Threads`] iterator) reports
//! `NotInitialized`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info};
use rusqlite::Connection;

use crate::coordinator::{Coordinator, Transition};
use crate::error::{Error, Result};
use crate::index::{self, AddOutcome, ParsedMessage, Tokenizer};
use crate::models::{DocId, Message, MessageId, ThreadId, validate_tag};
use crate::query::{self, Messages, Query, Sort, Threads};
use crate::status::Status;
use crate::storage::{Mode, Store, directories, messages, tags};
use crate::threads;

struct State {
    store: Option<Store>,
    coordinator: Coordinator,
    tokenizer: Tokenizer,
}

struct Shared {
    root: PathBuf,
    mode: Mode,
    state: Mutex<State>,
}

/// Handle to an on-disk mail index
#[derive(Clone)]
pub struct Database {
    inner: Arc<Shared>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("root", &self.inner.root)
            .field("mode", &self.inner.mode)
            .field("open", &self.is_open())
            .finish()
    }
}

fn not_initialized() -> Error {
    Error::new(Status::NotInitialized)
}

fn message_gone(id: &MessageId) -> Error {
    Error::with_message(
        Status::NullPointer,
        format!("Message {} is not in the database", id),
    )
}

impl Database {
    /// Create a new index under `root` and open it read-write.
    pub fn create(root: impl AsRef<Path>) -> Result<Self> {
        let store = Store::create(root.as_ref())?;
        Ok(Self::from_store(store))
    }

    /// Open an existing index under `root`.
    pub fn open(root: impl AsRef<Path>, mode: Mode) -> Result<Self> {
        let store = Store::open(root.as_ref(), mode)?;
        Ok(Self::from_store(store))
    }

    fn from_store(store: Store) -> Self {
        let shared = Shared {
            root: store.root().to_path_buf(),
            mode: store.mode(),
            state: Mutex::new(State {
                store: Some(store),
                coordinator: Coordinator::new(),
                tokenizer: Tokenizer::new(),
            }),
        };
        Self {
            inner: Arc::new(shared),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn with_store<T>(&self, f: impl FnOnce(&mut Store, &mut Tokenizer) -> Result<T>) -> Result<T> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let store = state.store.as_mut().ok_or_else(not_initialized)?;
        f(store, &mut state.tokenizer)
    }

    /// Close the handle. Pending batches are rolled back; closing twice is
    /// a no-op.
    pub fn close(&self) -> Result<()> {
        let store = {
            let mut state = self.lock();
            state.coordinator.reset();
            state.store.take()
        };
        match store {
            Some(store) => {
                store.close()?;
                info!("Closed index {}", self.inner.root.display());
                Ok(())
            }
            None => Ok(()),
        }
    }

    pub fn is_open(&self) -> bool {
        self.lock().store.is_some()
    }

    /// Mail root the index lives under
    pub fn path(&self) -> &Path {
        &self.inner.root
    }

    pub fn mode(&self) -> Mode {
        self.inner.mode
    }

    /// Schema version stored in the database
    pub fn version(&self) -> Result<i64> {
        self.with_store(|store, _| store.schema_version())
    }

    pub fn needs_upgrade(&self) -> Result<bool> {
        self.with_store(|store, _| store.needs_upgrade())
    }

    pub fn upgrade(&self) -> Result<()> {
        self.with_store(|store, _| store.upgrade())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.inner.root.join(path)
        }
    }

    fn absolutize(store: &Store, mut message: Message) -> Message {
        message.filenames = message
            .filenames
            .iter()
            .map(|name| store.absolute_path(&name.to_string_lossy()))
            .collect();
        message
    }

    // Messages

    /// Index the mail file at `path` (relative paths are taken from the
    /// mail root).
    pub fn add_message(&self, path: impl AsRef<Path>) -> Result<AddOutcome> {
        let path = self.resolve(path.as_ref());
        self.with_store(|store, _| store.ensure_writable())?;

        let parsed = index::parse_file(&path)?;
        let (doc, status) = self.index_parsed(&path, &parsed, &[])?;
        let message = self
            .load_message(doc)?
            .ok_or_else(|| message_gone(&parsed.message_id))?;
        Ok(AddOutcome { message, status })
    }

    /// Add an already parsed file and tag a newly created message with
    /// `new_tags`, in one savepoint.
    pub(crate) fn index_parsed(
        &self,
        path: &Path,
        parsed: &ParsedMessage,
        new_tags: &[String],
    ) -> Result<(DocId, Status)> {
        self.with_store(|store, tokenizer| {
            let name = store.relative_name(path);
            store.write(|conn| {
                let (doc, status) = index::add(conn, &name, parsed, tokenizer)?;
                if status == Status::Success && !new_tags.is_empty() {
                    for tag in new_tags {
                        tags::insert(conn, doc, tag)?;
                    }
                    tags::bump_revision(conn, doc)?;
                }
                Ok((doc, status))
            })
        })
    }

    /// Forget the file at `path`. `Success` when the message went away
    /// with it (or the file was unknown), `DuplicateMessageId` when other
    /// files still hold the message.
    pub fn remove_message(&self, path: impl AsRef<Path>) -> Result<Status> {
        let path = self.resolve(path.as_ref());
        self.with_store(|store, _| {
            let name = store.relative_name(&path);
            store.write(|conn| index::remove(conn, &name))
        })
    }

    /// Look up a message by Message-ID (without angle brackets)
    pub fn find_message(&self, message_id: &str) -> Result<Option<Message>> {
        let id = MessageId::new(message_id);
        self.with_store(|store, _| {
            let found = store.read(|conn| match messages::doc_for_message_id(conn, &id)? {
                Some(doc) => messages::load(conn, doc),
                None => Ok(None),
            })?;
            Ok(found.map(|m| Self::absolutize(store, m)))
        })
    }

    pub fn find_message_by_filename(&self, path: impl AsRef<Path>) -> Result<Option<Message>> {
        let path = self.resolve(path.as_ref());
        self.with_store(|store, _| {
            let name = store.relative_name(&path);
            let found = store.read(|conn| match messages::doc_for_filename(conn, &name)? {
                Some(doc) => messages::load(conn, doc),
                None => Ok(None),
            })?;
            Ok(found.map(|m| Self::absolutize(store, m)))
        })
    }

    pub(crate) fn load_message(&self, doc: DocId) -> Result<Option<Message>> {
        self.with_store(|store, _| {
            let found = store.read(|conn| messages::load(conn, doc))?;
            Ok(found.map(|m| Self::absolutize(store, m)))
        })
    }

    /// Every current member of `thread`
    pub(crate) fn thread_members(&self, thread: &ThreadId) -> Result<Vec<Message>> {
        self.with_store(|store, _| {
            let members = store.read(|conn| {
                let mut out = Vec::new();
                for doc in messages::docs_in_thread(conn, thread)? {
                    if let Some(message) = messages::load(conn, doc)? {
                        out.push(message);
                    }
                }
                Ok(out)
            })?;
            Ok(members
                .into_iter()
                .map(|m| Self::absolutize(store, m))
                .collect())
        })
    }

    /// Number of indexed messages
    pub fn message_count(&self) -> Result<usize> {
        self.with_store(|store, _| store.read(messages::message_count))
    }

    // Tags

    fn update_tags(
        &self,
        message: &mut Message,
        change: impl FnOnce(&Connection, DocId) -> Result<bool>,
    ) -> Result<()> {
        let id = message.id.clone();
        let (doc, tags, revision) = self.with_store(|store, _| {
            store.ensure_writable()?;
            store.write(|conn| {
                let doc = messages::doc_for_message_id(conn, &id)?
                    .ok_or_else(|| message_gone(&id))?;
                let revision = if change(conn, doc)? {
                    Some(tags::bump_revision(conn, doc)?)
                } else {
                    None
                };
                Ok((doc, messages::tags(conn, doc)?, revision))
            })
        })?;

        message.doc_id = doc;
        message.tags = tags;
        if let Some(revision) = revision {
            message.revision = revision;
        }
        Ok(())
    }

    /// Add `tag` to `message`. Adding a tag twice is not an error.
    pub fn add_tag(&self, message: &mut Message, tag: &str) -> Result<()> {
        validate_tag(tag)?;
        let tag = tag.to_string();
        self.update_tags(message, |conn, doc| tags::insert(conn, doc, &tag))?;
        debug!("Tagged {} +{}", message.id, tag);
        Ok(())
    }

    pub fn remove_tag(&self, message: &mut Message, tag: &str) -> Result<()> {
        validate_tag(tag)?;
        let tag = tag.to_string();
        self.update_tags(message, |conn, doc| tags::delete(conn, doc, &tag))?;
        debug!("Tagged {} -{}", message.id, tag);
        Ok(())
    }

    pub fn remove_all_tags(&self, message: &mut Message) -> Result<()> {
        self.update_tags(message, |conn, doc| Ok(tags::delete_all(conn, doc)? > 0))
    }

    /// Every tag in use, sorted
    pub fn all_tags(&self) -> Result<Vec<String>> {
        self.with_store(|store, _| store.read(tags::all))
    }

    // Freeze / transactions

    fn transition(
        &self,
        step: impl FnOnce(&mut Coordinator) -> Result<Transition>,
    ) -> Result<()> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let store = state.store.as_mut().ok_or_else(not_initialized)?;
        store.ensure_writable()?;

        let before = state.coordinator;
        let applied = match step(&mut state.coordinator)? {
            Transition::Unchanged => Ok(()),
            Transition::OpenBatch => store.begin_batch(),
            Transition::CommitBatch => store.commit_batch(),
            Transition::RollbackBatch => store.rollback_batch(),
        };
        if applied.is_err() {
            state.coordinator = before;
        }
        applied
    }

    /// Defer commits until the matching [`Database::thaw`]. Freezes nest.
    pub fn freeze(&self) -> Result<()> {
        self.transition(|c| Ok(c.freeze()))
    }

    pub fn thaw(&self) -> Result<()> {
        self.transition(Coordinator::thaw)
    }

    /// Start an explicit transaction
    pub fn begin(&self) -> Result<()> {
        self.transition(Coordinator::begin)
    }

    pub fn commit(&self) -> Result<()> {
        self.transition(Coordinator::commit)
    }

    pub fn rollback(&self) -> Result<()> {
        self.transition(Coordinator::rollback)
    }

    pub fn freeze_depth(&self) -> u32 {
        self.lock().coordinator.freeze_depth()
    }

    pub fn in_transaction(&self) -> bool {
        self.lock().coordinator.in_transaction()
    }

    // Queries

    fn hits(&self, query: &Query) -> Result<Vec<query::Hit>> {
        self.with_store(|store, tokenizer| store.read(|conn| query.hits(conn, tokenizer)))
    }

    pub fn search_messages(&self, query: &Query) -> Result<Messages> {
        let docs = self.hits(query)?.into_iter().map(|h| h.doc).collect();
        Ok(Messages::new(self.clone(), docs))
    }

    pub fn search_threads(&self, query: &Query) -> Result<Threads> {
        let groups = query::group_by_thread(&self.hits(query)?);
        Ok(Threads::new(self.clone(), groups, query.sort()))
    }

    pub fn count_messages(&self, query: &Query) -> Result<usize> {
        self.with_store(|store, tokenizer| {
            store.read(|conn| Ok(query.matching_docs(conn, tokenizer)?.len()))
        })
    }

    pub fn count_threads(&self, query: &Query) -> Result<usize> {
        Ok(query::group_by_thread(&self.hits(query)?).len())
    }

    pub(crate) fn summarize_thread(
        &self,
        thread: &ThreadId,
        matched: &[DocId],
        sort: Sort,
    ) -> Result<Option<crate::models::Thread>> {
        let members = self.thread_members(thread)?;
        if members.is_empty() {
            return Ok(None);
        }
        Ok(Some(threads::summarize(thread.clone(), members, matched, sort)))
    }

    // Directories

    /// Stored mtime of a directory, `None` when never recorded
    pub fn directory_mtime(&self, path: impl AsRef<Path>) -> Result<Option<i64>> {
        let path = self.resolve(path.as_ref());
        self.with_store(|store, _| {
            let name = store.relative_name(&path);
            store.read(|conn| directories::mtime(conn, &name))
        })
    }

    pub fn set_directory_mtime(&self, path: impl AsRef<Path>, mtime: i64) -> Result<()> {
        let path = self.resolve(path.as_ref());
        self.with_store(|store, _| {
            let name = store.relative_name(&path);
            store.write(|conn| directories::set_mtime(conn, &name, mtime))
        })
    }

    /// Forget a directory's stored mtime
    pub fn remove_directory(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = self.resolve(path.as_ref());
        self.with_store(|store, _| {
            let name = store.relative_name(&path);
            store.write(|conn| directories::delete(conn, &name))
        })
    }

    /// Indexed files directly inside `path`
    pub fn directory_files(&self, path: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let path = self.resolve(path.as_ref());
        self.with_store(|store, _| {
            let name = store.relative_name(&path);
            let files = store.read(|conn| directories::files(conn, &name))?;
            Ok(files.iter().map(|f| store.absolute_path(f)).collect())
        })
    }

    /// Recorded subdirectories directly inside `path`
    pub fn directory_children(&self, path: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let path = self.resolve(path.as_ref());
        self.with_store(|store, _| {
            let name = store.relative_name(&path);
            let children = store.read(|conn| directories::children(conn, &name))?;
            Ok(children.iter().map(|c| store.absolute_path(c)).collect())
        })
    }
}
