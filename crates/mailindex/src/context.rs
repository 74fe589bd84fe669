//! Process-wide library context
//!
//! Binding layers call [`init`] before anything else and [`teardown`] on
//! shutdown. Handles they hand out are registered here as
//! [`DatabaseSlot`]s so teardown can close them; an operation through an
//! empty slot or before `init` fails with `NotInitialized`.

use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use log::{info, warn};

use crate::config::IndexConfig;
use crate::database::Database;
use crate::error::{Error, Result};
use crate::status::Status;
use crate::storage::Mode;

/// A database handle owned by a binding object; `None` once closed
pub type DatabaseSlot = RwLock<Option<Database>>;

static CONTEXT: RwLock<Option<Arc<Context>>> = RwLock::new(None);

pub struct Context {
    config: IndexConfig,
    slots: Mutex<Vec<Weak<DatabaseSlot>>>,
}

impl Context {
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Track `slot` so teardown closes it
    pub fn register(&self, slot: &Arc<DatabaseSlot>) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.retain(|s| s.strong_count() > 0);
        slots.push(Arc::downgrade(slot));
    }

    /// Open the configured database as a registered slot
    pub fn open_database(&self, mode: Mode) -> Result<Arc<DatabaseSlot>> {
        let db = Database::open(&self.config.database_path, mode)?;
        let slot = Arc::new(RwLock::new(Some(db)));
        self.register(&slot);
        Ok(slot)
    }

    fn close_all(&self) -> usize {
        let slots = std::mem::take(&mut *self.slots.lock().unwrap_or_else(PoisonError::into_inner));
        let mut closed = 0;
        for slot in slots.iter().filter_map(Weak::upgrade) {
            let db = slot.write().unwrap_or_else(PoisonError::into_inner).take();
            if let Some(db) = db {
                if let Err(err) = db.close() {
                    warn!("Failed to close {}: {}", db.path().display(), err);
                }
                closed += 1;
            }
        }
        closed
    }
}

/// Install the context, replacing any previous one.
pub fn init(config: IndexConfig) -> Arc<Context> {
    let context = Arc::new(Context {
        config,
        slots: Mutex::new(Vec::new()),
    });
    let previous = CONTEXT
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .replace(Arc::clone(&context));
    if let Some(previous) = previous {
        previous.close_all();
    }
    info!(
        "Library initialized for {}",
        context.config.database_path.display()
    );
    context
}

/// The active context
pub fn current() -> Result<Arc<Context>> {
    CONTEXT
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
        .ok_or_else(|| Error::new(Status::NotInitialized))
}

pub fn is_initialized() -> bool {
    CONTEXT
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .is_some()
}

/// Drop the context and close every registered handle.
pub fn teardown() {
    let context = CONTEXT.write().unwrap_or_else(PoisonError::into_inner).take();
    if let Some(context) = context {
        let closed = context.close_all();
        info!("Library torn down, closed {} handle(s)", closed);
    }
}

/// Run `f` against the database in `slot`.
pub fn with_database<T>(slot: &DatabaseSlot, f: impl FnOnce(&Database) -> Result<T>) -> Result<T> {
    let guard = slot.read().unwrap_or_else(PoisonError::into_inner);
    match guard.as_ref() {
        Some(db) if db.is_open() => f(db),
        _ => Err(Error::new(Status::NotInitialized)),
    }
}

/// Take the database out of `slot` and close it. Closing an empty slot
/// is a no-op.
pub fn close_slot(slot: &DatabaseSlot) -> Result<()> {
    let db = slot.write().unwrap_or_else(PoisonError::into_inner).take();
    match db {
        Some(db) => db.close(),
        None => Ok(()),
    }
}
