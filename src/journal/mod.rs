//! Journaled file system with snapshot-based rollback.
//!
//! Wraps a delegate [`Filesystem`] and records, before each mutating call,
//! what it takes to undo it. Changed or removed paths are copied into a
//! session directory under the record root; newly created paths are simply
//! noted for deletion.
//!
//! ## Lifecycle
//!
//! 1. **Start**: create `{record_root}/{token}` for backups
//! 2. **Record**: snapshot each affected path, then forward the call
//! 3. **Commit**: drop the session directory and the undo log
//! 4. **Rollback** (on failure): replay the undo log in LIFO order
//!
//! ## Example
//!
//! ```no_run
//! # use fs_journal::fs::LocalFilesystem;
//! # use fs_journal::journal::JournalingFilesystem;
//! # fn example() -> fs_journal::error::Result<()> {
//! let mut journal = JournalingFilesystem::new(LocalFilesystem::new(), "/tmp/journal");
//!
//! journal.transaction(|fs| -> fs_journal::error::Result<()> {
//!     fs.put("config.toml", "[server]\nport = 8080\n")?;
//!     fs.move_to("old.log", "archive/old.log")?;
//!     Ok(())
//! })?; // Rolled back if either call fails
//! # Ok(())
//! # }
//! ```

mod dispatch;
pub mod names;
mod record;
mod rollback;
mod session;

pub use dispatch::Operation;
pub use record::{Action, Entry, Hint, UndoLog};
pub use session::{Session, SessionState};

use crate::error::{JournalError, Result};
use crate::fs::Filesystem;

use std::path::{Path, PathBuf};

/// File system wrapper that can roll back everything done since `start()`.
///
/// At most one session is active at a time. Mutating calls made without
/// an active session fail with [`JournalError::SessionState`].
pub struct JournalingFilesystem<F: Filesystem> {
    filesystem: F,
    record_root: PathBuf,
    session: Option<Session>,
    state: SessionState,
    log: UndoLog,
}

impl<F: Filesystem> JournalingFilesystem<F> {
    /// Creates a journal storing its sessions under `record_root`.
    pub fn new(filesystem: F, record_root: impl Into<PathBuf>) -> Self {
        Self {
            filesystem,
            record_root: record_root.into(),
            session: None,
            state: SessionState::Idle,
            log: UndoLog::default(),
        }
    }

    /// Creates a journal recording into `{temp_dir}/fs-journal`.
    pub fn with_default_root(filesystem: F) -> Self {
        Self::new(filesystem, default_record_root())
    }

    pub fn record_root(&self) -> &Path {
        &self.record_root
    }

    /// Moves future sessions to `record_root`.
    pub fn set_record_root(&mut self, record_root: impl Into<PathBuf>) -> Result<()> {
        if self.is_active() {
            return Err(JournalError::session(
                "cannot change the record root while a session is active",
            ));
        }
        self.record_root = record_root.into();
        Ok(())
    }

    /// Underlying delegate.
    pub fn delegate(&self) -> &F {
        &self.filesystem
    }

    /// Entries recorded so far, oldest first.
    pub fn entries(&self) -> &[Entry] {
        self.log.as_slice()
    }

    /// Runs `work` inside a transaction.
    ///
    /// On `Ok` the changes are kept and the session is discarded. On `Err`
    /// every recorded change is undone and the error is returned unchanged.
    /// If the rollback itself fails, the failure is logged and the session
    /// directory is kept so the remaining snapshots are not lost.
    pub fn transaction<T, E, W>(&mut self, work: W) -> std::result::Result<T, E>
    where
        W: FnOnce(&mut Self) -> std::result::Result<T, E>,
        E: From<JournalError>,
    {
        self.start()?;

        match work(self) {
            Ok(value) => {
                self.commit()?;
                self.end()?;
                Ok(value)
            }
            Err(e) => {
                match self.rollback() {
                    Ok(()) => {
                        if let Err(end_err) = self.end() {
                            log::warn!("Failed to remove session after rollback: {}", end_err);
                        }
                    }
                    Err(rollback_err) => {
                        let kept = self
                            .session
                            .as_ref()
                            .map(|s| s.path().display().to_string())
                            .unwrap_or_default();
                        log::error!("{}; backups kept in {}", rollback_err, kept);
                    }
                }
                Err(e)
            }
        }
    }
}

impl<F: Filesystem> Drop for JournalingFilesystem<F> {
    fn drop(&mut self) {
        if self.state == SessionState::Active {
            if let Some(session) = &self.session {
                log::warn!(
                    "Journal dropped with an active session; {} entries left in {}",
                    self.log.len(),
                    session.path().display()
                );
            }
        }
    }
}

/// `{temp_dir}/fs-journal`.
pub fn default_record_root() -> PathBuf {
    std::env::temp_dir().join("fs-journal")
}
