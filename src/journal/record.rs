//! Change recording: classifying a call and snapshotting what it touches.

use super::{JournalingFilesystem, names};
use crate::error::Result;
use crate::fs::{FileKind, Filesystem};

use std::fmt;
use std::path::{Path, PathBuf};

/// What a caller says it is about to do to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hint {
    Put,
    Prepend,
    Append,
    Move,
    Change,
    Create,
    Delete,
}

/// Recording decision once a [`Hint`] is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Path is brought into existence; undo deletes it.
    Create,
    /// Existing path is rewritten; undo restores a snapshot.
    Change,
    /// Existing path is removed; undo restores a snapshot.
    Delete,
}

impl Hint {
    /// Collapses write-style hints onto [`Action::Change`].
    pub fn resolve(self) -> Action {
        match self {
            Hint::Put | Hint::Prepend | Hint::Append | Hint::Move | Hint::Change => Action::Change,
            Hint::Create => Action::Create,
            Hint::Delete => Action::Delete,
        }
    }
}

/// One reversible step in the undo log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// `path` did not exist before.
    Create { path: PathBuf },
    /// `target` existed; its prior state is the snapshot named `backup`.
    Change { target: PathBuf, backup: String },
}

impl Entry {
    /// Path the entry restores.
    pub fn path(&self) -> &Path {
        match self {
            Entry::Create { path } => path,
            Entry::Change { target, .. } => target,
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Create { path } => write!(f, "create {}", path.display()),
            Entry::Change { target, backup } => {
                write!(f, "change {} (backup {})", target.display(), backup)
            }
        }
    }
}

/// Stack of entries: appended while recording, consumed from the tail.
#[derive(Debug, Default, Clone)]
pub struct UndoLog {
    entries: Vec<Entry>,
}

impl UndoLog {
    pub fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    /// Removes the newest entry.
    pub fn pop(&mut self) -> Option<Entry> {
        self.entries.pop()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Oldest first.
    pub fn as_slice(&self) -> &[Entry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }
}

impl<F: Filesystem> JournalingFilesystem<F> {
    /// Records undo information for `paths` before they are touched.
    ///
    /// Each path is resolved on its own:
    /// - `Change` on a missing path becomes `Create` (nothing to snapshot)
    /// - `Delete` on a missing path records nothing
    /// - `Change`/`Delete` on an existing path copies it into the session
    ///
    /// `is_directory` picks the existence check and a recursive copy.
    /// Symlinks are always snapshotted as links, never as what they point to.
    pub fn record<P: AsRef<Path>>(
        &mut self,
        hint: Hint,
        paths: &[P],
        is_directory: bool,
    ) -> Result<()> {
        let session_dir = self.require_active("record a change")?.path().to_path_buf();

        for path in paths {
            let path = path.as_ref();
            let exists = if is_directory {
                self.filesystem.is_directory(path)
            } else {
                self.filesystem.exists(path)
            };

            let action = match hint.resolve() {
                Action::Change if !exists => Action::Create,
                Action::Delete if !exists => {
                    log::debug!("Nothing to snapshot for {}", path.display());
                    continue;
                }
                action => action,
            };

            let entry = match action {
                Action::Create => Entry::Create {
                    path: path.to_path_buf(),
                },
                Action::Change | Action::Delete => {
                    let backup = names::unique_name(&self.filesystem, &session_dir, is_directory)?;
                    let backup_path = session_dir.join(&backup);

                    let is_link = matches!(self.filesystem.file_type(path), Ok(FileKind::Link));
                    if is_directory && !is_link {
                        self.filesystem.copy_directory(path, &backup_path)?;
                    } else {
                        self.filesystem.copy(path, &backup_path)?;
                    }

                    Entry::Change {
                        target: path.to_path_buf(),
                        backup,
                    }
                }
            };

            log::debug!("Recorded {}", entry);
            self.log.push(entry);
        }

        Ok(())
    }
}
