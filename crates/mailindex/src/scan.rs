//! Incremental scan of a mail root
//!
//! Every directory under the root is visited; a directory whose mtime
//! differs from the stored one is reconciled against the index: new files
//! are parsed in parallel and added, files that disappeared are removed,
//! and the new mtime is recorded. The whole scan runs inside one freeze.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Instant, UNIX_EPOCH};

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::database::Database;
use crate::error::{Error, Result};
use crate::index;
use crate::models::validate_tag;
use crate::status::Status;
use crate::storage::INDEX_DIR;

/// Files parsed per parallel batch
const PARSE_CHUNK: usize = 256;

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Tags applied to messages the scan creates
    pub new_tags: Vec<String>,
}

impl ScanOptions {
    pub fn with_new_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            new_tags: tags.into_iter().map(Into::into).collect(),
        }
    }
}

/// Statistics from a scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// New messages indexed
    pub added: usize,
    /// Files whose Message-ID was already indexed
    pub duplicates: usize,
    /// Files dropped because they no longer exist
    pub removed: usize,
    /// Files skipped because they do not look like mail
    pub not_email: usize,
    /// Files that could not be read
    pub errors: usize,
    /// Directories reconciled
    pub directories: usize,
    pub duration_ms: u64,
}

struct Listing {
    files: Vec<PathBuf>,
    dirs: Vec<PathBuf>,
    mtime: i64,
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.') || name == INDEX_DIR
}

fn list_dir(dir: &Path) -> Result<Listing> {
    let mtime = fs::metadata(dir)?
        .modified()?
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    let mut files = Vec::new();
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if is_hidden(&entry.file_name()) {
            continue;
        }
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            dirs.push(entry.path());
        } else if file_type.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    dirs.sort();
    Ok(Listing { files, dirs, mtime })
}

struct Scanner<'a> {
    db: &'a Database,
    options: &'a ScanOptions,
    stats: ScanStats,
}

impl Scanner<'_> {
    fn visit(&mut self, dir: &Path) -> Result<()> {
        let listing = list_dir(dir)?;
        for sub in &listing.dirs {
            self.visit(sub)?;
        }

        if self.db.directory_mtime(dir)? == Some(listing.mtime) {
            return Ok(());
        }
        debug!("Reconciling {}", dir.display());
        self.stats.directories += 1;

        let known: HashSet<PathBuf> = self.db.directory_files(dir)?.into_iter().collect();
        let on_disk: HashSet<&PathBuf> = listing.files.iter().collect();

        let fresh: Vec<&PathBuf> = listing.files.iter().filter(|f| !known.contains(*f)).collect();
        for chunk in fresh.chunks(PARSE_CHUNK) {
            let parsed: Vec<_> = chunk
                .par_iter()
                .map(|path| (*path, index::parse_file(path)))
                .collect();
            for (path, result) in parsed {
                self.add(path, result)?;
            }
        }

        for gone in known.iter().filter(|f| !on_disk.contains(f)) {
            self.db.remove_message(gone)?;
            self.stats.removed += 1;
        }

        let present: HashSet<&PathBuf> = listing.dirs.iter().collect();
        for child in self.db.directory_children(dir)? {
            if !present.contains(&child) {
                self.forget_dir(&child)?;
            }
        }

        self.db.set_directory_mtime(dir, listing.mtime)
    }

    fn add(&mut self, path: &Path, parsed: Result<index::ParsedMessage>) -> Result<()> {
        let parsed = match parsed {
            Ok(parsed) => parsed,
            Err(err) if err.status() == Status::FileNotEmail => {
                debug!("Skipping {}: not an email", path.display());
                self.stats.not_email += 1;
                return Ok(());
            }
            Err(err) => {
                warn!("Skipping {}: {}", path.display(), err);
                self.stats.errors += 1;
                return Ok(());
            }
        };
        match self.db.index_parsed(path, &parsed, &self.options.new_tags)?.1 {
            Status::Success => self.stats.added += 1,
            _ => self.stats.duplicates += 1,
        }
        Ok(())
    }

    /// Drop a vanished directory and everything recorded beneath it
    fn forget_dir(&mut self, dir: &Path) -> Result<()> {
        for child in self.db.directory_children(dir)? {
            self.forget_dir(&child)?;
        }
        for file in self.db.directory_files(dir)? {
            self.db.remove_message(&file)?;
            self.stats.removed += 1;
        }
        debug!("Forgetting vanished directory {}", dir.display());
        self.db.remove_directory(dir)
    }
}

/// Bring the index in line with the files under the database root.
///
/// Closing the database while a scan runs stops it; the scan then fails
/// with `NotInitialized` and its uncommitted work is rolled back.
pub fn scan(db: &Database, options: &ScanOptions) -> Result<ScanStats> {
    for tag in &options.new_tags {
        validate_tag(tag)?;
    }
    let start = Instant::now();
    let root = db.path().to_path_buf();

    db.freeze()?;
    let mut scanner = Scanner {
        db,
        options,
        stats: ScanStats::default(),
    };
    let outcome = scanner.visit(&root);

    match outcome {
        Ok(()) => db.thaw()?,
        Err(err) if err.status() == Status::NotInitialized => {
            return Err(Error::with_message(
                Status::NotInitialized,
                "Scan interrupted: database closed",
            ));
        }
        Err(err) => {
            // keep the freeze balanced; work done so far is committed
            if let Err(thaw_err) = db.thaw() {
                warn!("Failed to thaw after scan error: {}", thaw_err);
            }
            return Err(err);
        }
    }

    let mut stats = scanner.stats;
    stats.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Scan of {} done: {} added, {} duplicates, {} removed, {} not mail, {} errors in {}ms",
        root.display(),
        stats.added,
        stats.duplicates,
        stats.removed,
        stats.not_email,
        stats.errors,
        stats.duration_ms
    );
    Ok(stats)
}
