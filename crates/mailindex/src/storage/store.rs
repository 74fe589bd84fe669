//! SQLite-backed index store

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

use fs2::FileExt;
use log::{debug, info};
use rusqlite::{Connection, OpenFlags};

use super::schema;
use crate::error::{Error, Result};
use crate::status::Status;

/// Directory under the mail root that holds the index
pub const INDEX_DIR: &str = ".mailindex";
const DATABASE_FILE: &str = "index.sqlite3";
const LOCK_FILE: &str = "write.lock";

/// Access mode of an open handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    ReadOnly,
    ReadWrite,
}

/// Advisory lock held by the single writer of a database
#[derive(Debug)]
struct WriteLock {
    _file: File,
}

impl WriteLock {
    fn acquire(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;
        FileExt::try_lock_exclusive(&file).map_err(|_| {
            Error::with_message(
                Status::ReadOnlyDatabase,
                format!(
                    "Another writer holds {}; open read-only instead",
                    path.display()
                ),
            )
        })?;
        Ok(Self { _file: file })
    }
}

/// One connection to the index database plus the writer lock when held.
///
/// Writes go through [`Store::write`], which wraps them in a savepoint:
/// outside a batch the savepoint commits on its own, inside a batch it
/// nests in the outer `BEGIN IMMEDIATE`.
pub struct Store {
    conn: Connection,
    root: PathBuf,
    mode: Mode,
    in_batch: bool,
    _lock: Option<WriteLock>,
}

impl Store {
    /// Create the index under `root` and open it read-write.
    pub fn create(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root.join(INDEX_DIR))?;
        Self::open_writer(root)
    }

    /// Open an existing index.
    pub fn open(root: &Path, mode: Mode) -> Result<Self> {
        let db_path = database_path(root);
        if !db_path.exists() {
            return Err(Error::with_message(
                Status::FileError,
                format!("No index database at {}", db_path.display()),
            ));
        }
        match mode {
            Mode::ReadWrite => Self::open_writer(root),
            Mode::ReadOnly => Self::open_reader(root),
        }
    }

    fn open_writer(root: &Path) -> Result<Self> {
        let lock = WriteLock::acquire(&root.join(INDEX_DIR).join(LOCK_FILE))?;

        let db_path = database_path(root);
        let mut conn = Connection::open(&db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        schema::configure_writer(&conn)?;

        // An interrupted batch is rolled back by the journal on open
        schema::migrations().to_latest(&mut conn)?;

        info!("Opened index {} read-write", db_path.display());
        Ok(Self {
            conn,
            root: root.to_path_buf(),
            mode: Mode::ReadWrite,
            in_batch: false,
            _lock: Some(lock),
        })
    }

    fn open_reader(root: &Path) -> Result<Self> {
        let db_path = database_path(root);
        let conn = Connection::open_with_flags(
            &db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(Duration::from_secs(5))?;
        schema::configure_reader(&conn)?;

        info!("Opened index {} read-only", db_path.display());
        Ok(Self {
            conn,
            root: root.to_path_buf(),
            mode: Mode::ReadOnly,
            in_batch: false,
            _lock: None,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn in_batch(&self) -> bool {
        self.in_batch
    }

    /// Fail with `ReadOnlyDatabase` unless this is the writer.
    pub fn ensure_writable(&self) -> Result<()> {
        match self.mode {
            Mode::ReadWrite => Ok(()),
            Mode::ReadOnly => Err(Error::with_message(
                Status::ReadOnlyDatabase,
                "Cannot modify a database opened read-only",
            )),
        }
    }

    /// Run `f` against a consistent snapshot.
    pub fn read<T>(&mut self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let sp = self.conn.savepoint()?;
        f(&sp)
    }

    /// Run `f` atomically; any error rolls its changes back.
    pub fn write<T>(&mut self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        self.ensure_writable()?;
        let sp = self.conn.savepoint()?;
        let value = f(&sp)?;
        sp.commit()?;
        Ok(value)
    }

    /// Open the outer batch transaction.
    pub fn begin_batch(&mut self) -> Result<()> {
        self.ensure_writable()?;
        if !self.in_batch {
            self.conn.execute_batch("BEGIN IMMEDIATE")?;
            self.in_batch = true;
            debug!("Batch opened");
        }
        Ok(())
    }

    pub fn commit_batch(&mut self) -> Result<()> {
        if self.in_batch {
            self.conn.execute_batch("COMMIT")?;
            self.in_batch = false;
            debug!("Batch committed");
        }
        Ok(())
    }

    pub fn rollback_batch(&mut self) -> Result<()> {
        if self.in_batch {
            self.in_batch = false;
            self.conn.execute_batch("ROLLBACK")?;
            debug!("Batch rolled back");
        }
        Ok(())
    }

    pub fn schema_version(&self) -> Result<i64> {
        schema::stored_version(&self.conn)
    }

    pub fn needs_upgrade(&self) -> Result<bool> {
        Ok(self.schema_version()? < schema::SCHEMA_VERSION)
    }

    /// Bring the schema up to date. Only the writer may do this.
    pub fn upgrade(&mut self) -> Result<()> {
        self.ensure_writable()?;
        if self.in_batch {
            return Err(Error::with_message(
                Status::UnbalancedFreezeThaw,
                "Cannot upgrade while a batch is open",
            ));
        }
        schema::migrations().to_latest(&mut self.conn)?;
        Ok(())
    }

    /// Path as stored in the index: relative to the root when beneath it
    pub fn relative_name(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    }

    /// Inverse of [`Store::relative_name`]
    pub fn absolute_path(&self, stored: &str) -> PathBuf {
        let path = Path::new(stored);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Close the connection, rolling back any open batch.
    pub fn close(mut self) -> Result<()> {
        let rolled_back = self.in_batch;
        self.rollback_batch()?;
        self.conn.close().map_err(|(_, err)| Error::from(err))?;
        if rolled_back {
            log::warn!("Closed {} with an open batch; changes rolled back", self.root.display());
        }
        Ok(())
    }
}

pub fn database_path(root: &Path) -> PathBuf {
    root.join(INDEX_DIR).join(DATABASE_FILE)
}
