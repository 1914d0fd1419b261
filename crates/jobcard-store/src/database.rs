//! Database connection management.
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`] together with the
//! [`ImageStore`] holding complaint photos, and guarantees that migrations are
//! run before any other operation.
//!
//! Reads go through `&Database`. Every write goes through a [`StoreTx`]
//! obtained from [`Database::write`], which keeps SQLite and the image
//! directory in step: files written inside a failed transaction are removed
//! again, and files of deleted images are only removed after commit.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use directories::ProjectDirs;
use rusqlite::{Connection, Transaction};
use tracing::warn;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::image_store::ImageStore;
use crate::migrations;

/// Wrapper around a [`rusqlite::Connection`] and the image directory.
pub struct Database {
    conn: Connection,
    images: ImageStore,
}

impl Database {
    /// Open (or create) the default application database.
    ///
    /// The database file is placed in the platform-appropriate data directory:
    /// - Linux:   `~/.local/share/jobcard/jobcard.db`
    /// - macOS:   `~/Library/Application Support/com.jobcard.jobcard/jobcard.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\jobcard\jobcard\data\jobcard.db`
    pub fn new(images: ImageStore) -> Result<Self> {
        let project_dirs =
            ProjectDirs::from("com", "jobcard", "jobcard").ok_or(StoreError::NoDataDir)?;

        let data_dir = project_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        let db_path = data_dir.join("jobcard.db");

        tracing::info!(path = %db_path.display(), "opening database");

        Self::open_at(&db_path, images)
    }

    /// Open (or create) a database at an explicit path.
    pub fn open_at(path: &Path, images: ImageStore) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run_migrations(&conn)?;

        Ok(Self { conn, images })
    }

    /// Return a reference to the underlying `rusqlite::Connection`.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn images(&self) -> &ImageStore {
        &self.images
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn.path().map(PathBuf::from)
    }

    /// Run `f` inside a single transaction.
    ///
    /// On `Ok` the transaction commits and queued file removals are carried
    /// out. On `Err` it rolls back and any files written by `f` are removed.
    pub fn write<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut StoreTx<'_>) -> Result<T>,
    {
        let tx = self.conn.transaction()?;
        let mut store_tx = StoreTx {
            tx,
            images: &self.images,
            written: Vec::new(),
            doomed: Vec::new(),
        };

        match f(&mut store_tx) {
            Ok(value) => {
                store_tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                store_tx.abort();
                Err(e)
            }
        }
    }
}

/// A write transaction spanning the database and the image directory.
pub struct StoreTx<'a> {
    tx: Transaction<'a>,
    images: &'a ImageStore,
    /// Files created in this transaction; removed if it aborts.
    written: Vec<String>,
    /// Files whose records were deleted; removed once it commits.
    doomed: Vec<String>,
}

impl<'a> StoreTx<'a> {
    pub fn conn(&self) -> &Connection {
        &self.tx
    }

    pub(crate) fn images(&self) -> &ImageStore {
        self.images
    }

    pub(crate) fn track_written(&mut self, relative: String) {
        self.written.push(relative);
    }

    pub(crate) fn queue_removal(&mut self, relative: String) {
        self.doomed.push(relative);
    }

    fn commit(self) -> Result<()> {
        let StoreTx {
            tx,
            images,
            written,
            doomed,
        } = self;

        if let Err(e) = tx.commit() {
            remove_all(images, &written);
            return Err(e.into());
        }

        // The records are gone; a file that refuses to go is only logged.
        for relative in &doomed {
            if let Err(e) = images.remove(relative) {
                warn!(file = %relative, error = %e, "failed to remove image file after commit");
            }
        }
        Ok(())
    }

    fn abort(self) {
        let StoreTx {
            tx,
            images,
            written,
            ..
        } = self;
        drop(tx);
        remove_all(images, &written);
    }
}

fn remove_all(images: &ImageStore, files: &[String]) {
    for relative in files {
        if let Err(e) = images.remove(relative) {
            warn!(file = %relative, error = %e, "failed to remove image file after rollback");
        }
    }
}

// ---------------------------------------------------------------------------
// Column helpers
// ---------------------------------------------------------------------------

/// Current time at the precision stored in the database.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC-3339 so that text ordering matches time ordering.
pub(crate) fn to_sql_time(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn uuid_col(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let s: String = row.get(idx)?;
    Uuid::parse_str(&s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn time_col(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}
