//! Bindings crate for the mailindex engine
//!
//! Two surfaces are exported from the same library:
//!
//! - The UniFFI scaffolding re-exported from `mailindex` (library mode
//!   binding generation for Swift / Kotlin).
//! - A small C ABI. Every entry point returns an `int` status code with
//!   the ordinals of `mailindex::Status`; results come back through out
//!   parameters. A null database or message handle yields
//!   `NOT_INITIALIZED`, a null string or out pointer `NULL_POINTER`.
//!   All strings are UTF-8 and NUL-terminated.
//!
//! Database handles belong to the library context: `init_library` must
//! run before one is opened, and `teardown_library` closes every handle
//! still open.
//!
//! ## Generating Swift bindings
//!
//! ```bash
//! cargo build --release -p mailindex-ffi
//! cargo run -p mailindex-ffi --features bindgen --bin uniffi-bindgen generate \
//!     --library target/release/libmailindex_ffi.dylib \
//!     --language swift \
//!     --out-dir generated/swift
//! ```

use std::cell::RefCell;
use std::ffi::{CStr, CString, c_char, c_int, c_uint};
use std::path::PathBuf;
use std::ptr;
use std::sync::{Arc, OnceLock, RwLock};

use log::warn;
use mailindex::context::{self, DatabaseSlot};
use mailindex::{Database, Error, Message, Mode, Query, Status};

pub use mailindex::ffi::*;

mailindex::uniffi_reexport_scaffolding!();

/// Opaque database handle, registered with the library context
pub struct MailindexDatabase {
    slot: Arc<DatabaseSlot>,
}

/// Opaque message handle; keeps its database reachable for tag updates
pub struct MailindexMessage {
    db: Database,
    message: Message,
    id: CString,
}

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn status_strings() -> &'static [CString] {
    static STRINGS: OnceLock<Vec<CString>> = OnceLock::new();
    STRINGS.get_or_init(|| {
        Status::ALL
            .iter()
            .map(|s| s.description())
            .chain([mailindex::status::UNKNOWN_STATUS_MESSAGE])
            .map(|text| CString::new(text).unwrap_or_default())
            .collect()
    })
}

fn code(status: Status) -> c_int {
    status.code()
}

/// Record `err` for `mailindex_last_error` and return its code
fn fail(err: Error) -> c_int {
    let text = CString::new(err.to_string()).unwrap_or_default();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(text));
    code(err.status())
}

fn report(result: Result<(), Error>) -> c_int {
    match result {
        Ok(()) => code(Status::Success),
        Err(err) => fail(err),
    }
}

/// # Safety
/// `ptr` must be null or a valid NUL-terminated string.
unsafe fn read_str<'a>(ptr: *const c_char) -> Result<&'a str, Error> {
    if ptr.is_null() {
        return Err(Error::new(Status::NullPointer));
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().map_err(|_| {
        Error::with_message(Status::NullPointer, "String argument is not valid UTF-8")
    })
}

/// The open database behind `db`; `NotInitialized` for a null, closed or
/// torn down handle.
///
/// # Safety
/// `db` must be null or a handle from `mailindex_database_open/create`.
unsafe fn database(db: *mut MailindexDatabase) -> Result<Database, Error> {
    let handle = unsafe { db.as_ref() }.ok_or_else(|| Error::new(Status::NotInitialized))?;
    context::with_database(&handle.slot, |db| Ok(db.clone()))
}

/// # Safety
/// `message` must be null or a handle returned by this library.
unsafe fn message<'a>(message: *mut MailindexMessage) -> Result<&'a mut MailindexMessage, Error> {
    unsafe { message.as_mut() }.ok_or_else(|| Error::new(Status::NotInitialized))
}

fn new_message(db: &Database, message: Message) -> *mut MailindexMessage {
    let id = CString::new(message.id.as_str()).unwrap_or_default();
    Box::into_raw(Box::new(MailindexMessage {
        db: db.clone(),
        message,
        id,
    }))
}

// ============================================================================
// Status
// ============================================================================

/// Static text for a status code. Never null, never to be freed.
#[unsafe(no_mangle)]
pub extern "C" fn mailindex_status_to_string(status: c_int) -> *const c_char {
    let strings = status_strings();
    let idx = match Status::from_code(status) {
        Some(status) => status.code() as usize,
        None => strings.len() - 1,
    };
    strings[idx].as_ptr()
}

/// Message of the last failure on this thread, or null. Valid until the
/// next failing call on the same thread.
#[unsafe(no_mangle)]
pub extern "C" fn mailindex_last_error() -> *const c_char {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .map_or(ptr::null(), |text| text.as_ptr())
    })
}

// ============================================================================
// Database
// ============================================================================

unsafe fn open_with(
    path: *const c_char,
    out: *mut *mut MailindexDatabase,
    open: impl FnOnce(PathBuf) -> Result<Database, Error>,
) -> c_int {
    if out.is_null() {
        return code(Status::NullPointer);
    }
    let result = unsafe { read_str(path) }.and_then(|path| {
        let ctx = context::current()?;
        let slot = Arc::new(RwLock::new(Some(open(PathBuf::from(path))?)));
        ctx.register(&slot);
        Ok(slot)
    });
    match result {
        Ok(slot) => {
            unsafe { *out = Box::into_raw(Box::new(MailindexDatabase { slot })) };
            code(Status::Success)
        }
        Err(err) => {
            unsafe { *out = ptr::null_mut() };
            fail(err)
        }
    }
}

/// Create an index under the mail root `path`.
///
/// # Safety
/// `path` must be a valid string and `out` a valid pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mailindex_database_create(
    path: *const c_char,
    out: *mut *mut MailindexDatabase,
) -> c_int {
    unsafe { open_with(path, out, Database::create) }
}

/// Open an index; `read_write` non-zero requests the writer.
///
/// # Safety
/// `path` must be a valid string and `out` a valid pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mailindex_database_open(
    path: *const c_char,
    read_write: c_int,
    out: *mut *mut MailindexDatabase,
) -> c_int {
    let mode = if read_write != 0 {
        Mode::ReadWrite
    } else {
        Mode::ReadOnly
    };
    unsafe { open_with(path, out, |p| Database::open(p, mode)) }
}

/// Close the database. The handle stays allocated; later calls on it
/// report `NOT_INITIALIZED`.
///
/// # Safety
/// `db` must be null or a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mailindex_database_close(db: *mut MailindexDatabase) -> c_int {
    match unsafe { db.as_ref() } {
        Some(handle) => report(context::close_slot(&handle.slot)),
        None => code(Status::NotInitialized),
    }
}

/// Close and free the handle.
///
/// # Safety
/// `db` must be null or a live handle; it is invalid afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mailindex_database_destroy(db: *mut MailindexDatabase) -> c_int {
    if db.is_null() {
        return code(Status::NotInitialized);
    }
    let handle = unsafe { Box::from_raw(db) };
    report(context::close_slot(&handle.slot))
}

/// Index a file. Returns `SUCCESS` for a new message or
/// `DUPLICATE_MESSAGE_ID`; `out` may be null when the message is not needed.
///
/// # Safety
/// `db` and `filename` must be valid; `out` null or valid.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mailindex_database_add_message(
    db: *mut MailindexDatabase,
    filename: *const c_char,
    out: *mut *mut MailindexMessage,
) -> c_int {
    let result = unsafe { database(db) }.and_then(|db| {
        let filename = unsafe { read_str(filename) }?;
        let outcome = db.add_message(filename)?;
        Ok((db, outcome))
    });
    match result {
        Ok((db, outcome)) => {
            if !out.is_null() {
                unsafe { *out = new_message(&db, outcome.message) };
            }
            code(outcome.status)
        }
        Err(err) => fail(err),
    }
}

/// # Safety
/// `db` and `filename` must be valid.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mailindex_database_remove_message(
    db: *mut MailindexDatabase,
    filename: *const c_char,
) -> c_int {
    let result = unsafe { database(db) }.and_then(|db| {
        let filename = unsafe { read_str(filename) }?;
        db.remove_message(filename)
    });
    match result {
        Ok(status) => code(status),
        Err(err) => fail(err),
    }
}

/// Look up a message; `*out` is set to null when it does not exist.
///
/// # Safety
/// `db` and `message_id` must be valid; `out` a valid pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mailindex_database_find_message(
    db: *mut MailindexDatabase,
    message_id: *const c_char,
    out: *mut *mut MailindexMessage,
) -> c_int {
    if out.is_null() {
        return code(Status::NullPointer);
    }
    let result = unsafe { database(db) }.and_then(|db| {
        let id = unsafe { read_str(message_id) }?;
        let found = db.find_message(id)?;
        Ok((db, found))
    });
    match result {
        Ok((db, found)) => {
            unsafe { *out = found.map_or(ptr::null_mut(), |m| new_message(&db, m)) };
            code(Status::Success)
        }
        Err(err) => {
            unsafe { *out = ptr::null_mut() };
            fail(err)
        }
    }
}

// ============================================================================
// Freeze / transactions
// ============================================================================

macro_rules! batch_fn {
    ($(#[$doc:meta])* $name:ident => $method:ident) => {
        $(#[$doc])*
        ///
        /// # Safety
        /// `db` must be null or a live handle.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $name(db: *mut MailindexDatabase) -> c_int {
            report(unsafe { database(db) }.and_then(|db| db.$method()))
        }
    };
}

batch_fn!(mailindex_database_freeze => freeze);
batch_fn!(mailindex_database_thaw => thaw);
batch_fn!(mailindex_database_begin => begin);
batch_fn!(mailindex_database_commit => commit);
batch_fn!(mailindex_database_rollback => rollback);

// ============================================================================
// Counts
// ============================================================================

unsafe fn count_with(
    db: *mut MailindexDatabase,
    query: *const c_char,
    out: *mut c_uint,
    count: impl FnOnce(&Database, &Query) -> Result<usize, Error>,
) -> c_int {
    if out.is_null() {
        return code(Status::NullPointer);
    }
    let result = unsafe { database(db) }.and_then(|db| {
        let query = Query::new(unsafe { read_str(query) }?)?;
        count(&db, &query)
    });
    match result {
        Ok(n) => {
            unsafe { *out = n.min(c_uint::MAX as usize) as c_uint };
            code(Status::Success)
        }
        Err(err) => fail(err),
    }
}

/// # Safety
/// `db` and `query` must be valid; `out` a valid pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mailindex_query_count_messages(
    db: *mut MailindexDatabase,
    query: *const c_char,
    out: *mut c_uint,
) -> c_int {
    unsafe { count_with(db, query, out, Database::count_messages) }
}

/// # Safety
/// `db` and `query` must be valid; `out` a valid pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mailindex_query_count_threads(
    db: *mut MailindexDatabase,
    query: *const c_char,
    out: *mut c_uint,
) -> c_int {
    unsafe { count_with(db, query, out, Database::count_threads) }
}

// ============================================================================
// Messages
// ============================================================================

/// Message-ID of `message`, owned by the handle. Null for a null handle.
///
/// # Safety
/// `message` must be null or a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mailindex_message_get_message_id(
    message: *mut MailindexMessage,
) -> *const c_char {
    match unsafe { message.as_ref() } {
        Some(handle) => handle.id.as_ptr(),
        None => ptr::null(),
    }
}

unsafe fn tag_with(
    message: *mut MailindexMessage,
    tag: *const c_char,
    change: impl FnOnce(&Database, &mut Message, &str) -> Result<(), Error>,
) -> c_int {
    let result = unsafe { self::message(message) }.and_then(|handle| {
        let tag = unsafe { read_str(tag) }?;
        change(&handle.db, &mut handle.message, tag)
    });
    report(result)
}

/// # Safety
/// `message` must be null or a live handle; `tag` null or a valid string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mailindex_message_add_tag(
    message: *mut MailindexMessage,
    tag: *const c_char,
) -> c_int {
    unsafe { tag_with(message, tag, Database::add_tag) }
}

/// # Safety
/// `message` must be null or a live handle; `tag` null or a valid string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mailindex_message_remove_tag(
    message: *mut MailindexMessage,
    tag: *const c_char,
) -> c_int {
    unsafe { tag_with(message, tag, Database::remove_tag) }
}

/// # Safety
/// `message` must be null or a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mailindex_message_remove_all_tags(message: *mut MailindexMessage) -> c_int {
    let result = unsafe { self::message(message) }
        .and_then(|handle| handle.db.remove_all_tags(&mut handle.message));
    report(result)
}

/// Number of tags currently on the message snapshot
///
/// # Safety
/// `message` must be null or a live handle; `out` a valid pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mailindex_message_count_tags(
    message: *mut MailindexMessage,
    out: *mut c_uint,
) -> c_int {
    if out.is_null() {
        return code(Status::NullPointer);
    }
    match unsafe { self::message(message) } {
        Ok(handle) => {
            unsafe { *out = handle.message.tags.len() as c_uint };
            code(Status::Success)
        }
        Err(err) => fail(err),
    }
}

/// Free a message handle.
///
/// # Safety
/// `message` must be null or a live handle; it is invalid afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mailindex_message_destroy(message: *mut MailindexMessage) {
    if message.is_null() {
        warn!("mailindex_message_destroy called with a null handle");
        return;
    }
    drop(unsafe { Box::from_raw(message) });
}
