//! Session lifecycle: creating and discarding the backup area.

use super::{JournalingFilesystem, names};
use crate::error::{JournalError, Result};
use crate::fs::{DirOptions, Filesystem};

use std::path::{Path, PathBuf};

/// Backup area of one transaction, `{record_root}/{token}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    path: PathBuf,
}

impl Session {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Location of a backup snapshot inside this session.
    pub fn backup_path(&self, backup: &str) -> PathBuf {
        self.path.join(backup)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session.
    Idle,
    /// Recording changes.
    Active,
    /// Changes kept; session directory already gone.
    Committed,
    /// Changes undone; session directory already gone.
    RolledBack,
}

impl<F: Filesystem> JournalingFilesystem<F> {
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Current (or just finished) session.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Opens a new session under the record root.
    pub fn start(&mut self) -> Result<()> {
        if self.is_active() {
            return Err(JournalError::session("a session is already active"));
        }

        let token = names::unique_name(&self.filesystem, &self.record_root, true)?;
        let path = self.record_root.join(&token);

        self.filesystem.make_directory(
            &path,
            DirOptions::default().mode(0o755).recursive(true).force(true),
        )?;

        log::info!("Started journal session {}", path.display());

        self.session = Some(Session { token, path });
        self.state = SessionState::Active;
        Ok(())
    }

    /// Keeps every change made during the session.
    pub fn commit(&mut self) -> Result<()> {
        self.require_active("commit")?;

        let recorded = self.log.len();
        self.cleanup()?;
        self.state = SessionState::Committed;

        log::info!("Committed {} recorded changes", recorded);
        Ok(())
    }

    /// Removes the session directory if it is still there.
    ///
    /// Leaves the undo log alone. Safe to call repeatedly.
    pub fn end(&mut self) -> Result<()> {
        if let Some(session) = self.session.take() {
            if self.filesystem.is_directory(session.path()) {
                self.filesystem.delete_directory(session.path(), false)?;
            }
            log::debug!("Ended journal session {}", session.token());
        }

        if !self.log.is_empty() {
            log::warn!(
                "Session ended with {} entries still recorded",
                self.log.len()
            );
        }

        self.state = SessionState::Idle;
        Ok(())
    }

    /// Drops the session directory and clears the undo log.
    pub(super) fn cleanup(&mut self) -> Result<()> {
        if let Some(session) = &self.session {
            if self.filesystem.is_directory(session.path()) {
                self.filesystem.delete_directory(session.path(), false)?;
            }
        }
        self.log.clear();
        Ok(())
    }

    pub(super) fn require_active(&self, action: &str) -> Result<&Session> {
        match (&self.session, self.state) {
            (Some(session), SessionState::Active) => Ok(session),
            _ => Err(JournalError::session(format!(
                "cannot {} without an active session (state: {:?})",
                action, self.state
            ))),
        }
    }
}
