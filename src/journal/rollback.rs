//! Replaying the undo log.

use super::{Entry, JournalingFilesystem, SessionState, names};
use crate::error::{JournalError, Result};
use crate::fs::{FileKind, Filesystem};

use std::io;

impl<F: Filesystem> JournalingFilesystem<F> {
    /// Reverses the newest entry. No-op when the log is empty.
    ///
    /// If reversing fails, the entry goes back onto the log.
    pub fn step_back(&mut self) -> Result<()> {
        let Some(entry) = self.log.pop() else {
            return Ok(());
        };

        log::debug!("Undoing {}", entry);

        if let Err(e) = self.reverse(&entry) {
            log::error!("Failed to undo {}: {}", entry, e);
            self.log.push(entry);
            return Err(e);
        }

        Ok(())
    }

    /// Reverses up to `count` entries, newest first.
    ///
    /// Returns how many were undone.
    pub fn undo(&mut self, count: usize) -> Result<usize> {
        let mut undone = 0;
        while undone < count && !self.log.is_empty() {
            self.step_back()?;
            undone += 1;
        }
        Ok(undone)
    }

    /// Reverses every recorded entry, then discards the session.
    pub fn rollback(&mut self) -> Result<()> {
        self.require_active("roll back")?;

        log::warn!("Rolling back {} recorded changes...", self.log.len());

        while !self.log.is_empty() {
            if let Err(e) = self.step_back() {
                let remaining = self.log.len();
                log::error!("Rollback stopped with {} entries unapplied:", remaining);
                for entry in self.log.iter().rev() {
                    log::error!("  {}", entry);
                }
                return Err(JournalError::RollbackFailed {
                    remaining,
                    source: Box::new(e),
                });
            }
        }

        self.cleanup()?;
        self.state = SessionState::RolledBack;

        log::info!("Rollback completed");
        Ok(())
    }

    fn reverse(&self, entry: &Entry) -> Result<()> {
        match entry {
            Entry::Create { path } => {
                if self.filesystem.is_directory(path) {
                    self.filesystem.delete_directory(path, false)
                } else if self.filesystem.exists(path) {
                    self.filesystem.delete(std::slice::from_ref(path))
                } else {
                    log::debug!("Already gone: {}", path.display());
                    Ok(())
                }
            }
            Entry::Change { target, backup } => {
                let session = self.session.as_ref().ok_or_else(|| {
                    JournalError::session(format!("no session holds backup {}", backup))
                })?;
                let snapshot = session.backup_path(backup);

                if !self.filesystem.exists(&snapshot) {
                    return Err(JournalError::Io(io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("Backup snapshot missing: {}", snapshot.display()),
                    )));
                }

                let target_is_dir = matches!(self.filesystem.file_type(target), Ok(FileKind::Dir));
                let snapshot_is_dir = matches!(self.filesystem.file_type(&snapshot), Ok(FileKind::Dir));

                // move_to replaces a file in place; a failed move leaves it intact.
                if !(target_is_dir || snapshot_is_dir) || !self.filesystem.exists(target) {
                    return self.filesystem.move_to(&snapshot, target);
                }

                // Restore, not merge: park the current tree inside the session.
                let aside_name = names::unique_name(&self.filesystem, session.path(), target_is_dir)?;
                let aside = session.path().join(aside_name);
                self.filesystem.move_to(target, &aside)?;

                if let Err(e) = self.filesystem.move_to(&snapshot, target) {
                    if let Err(put_back) = self.filesystem.move_to(&aside, target) {
                        log::error!(
                            "Could not put {} back from {}: {}",
                            target.display(),
                            aside.display(),
                            put_back
                        );
                    }
                    return Err(e);
                }

                let cleared = if target_is_dir {
                    self.filesystem.delete_directory(&aside, false)
                } else {
                    self.filesystem.delete(std::slice::from_ref(&aside))
                };
                if let Err(e) = cleared {
                    log::warn!("Failed to discard {}: {}", aside.display(), e);
                }
                Ok(())
            }
        }
    }
}
