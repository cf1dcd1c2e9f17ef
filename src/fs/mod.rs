//! Delegate file systems.
//!
//! The journal never touches the disk itself: every read, write, copy and
//! delete goes through a [`Filesystem`] implementation. [`LocalFilesystem`]
//! is the `std::fs`-backed one.

pub mod local;

pub use local::LocalFilesystem;

use crate::error::Result;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Kind of entry a path points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Dir,
    Link,
    Other,
}

/// Options for [`Filesystem::make_directory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirOptions {
    /// Permission bits applied on Unix.
    pub mode: u32,
    /// Create missing parents.
    pub recursive: bool,
    /// Succeed silently if the directory already exists.
    pub force: bool,
}

impl Default for DirOptions {
    fn default() -> Self {
        Self {
            mode: 0o777,
            recursive: false,
            force: false,
        }
    }
}

impl DirOptions {
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }
}

/// Capability set of a file system the journal can wrap.
///
/// Predicates (`exists`, `is_directory`, ...) never fail; they answer
/// `false` when the path cannot be inspected.
pub trait Filesystem {
    fn exists(&self, path: &Path) -> bool;

    /// Reads a file's raw contents.
    fn get(&self, path: &Path) -> Result<Vec<u8>>;

    /// Reads a file as UTF-8 text.
    fn get_string(&self, path: &Path) -> Result<String>;

    /// Writes `contents`, replacing any existing file.
    fn put(&self, path: &Path, contents: &[u8]) -> Result<()>;

    fn prepend(&self, path: &Path, data: &[u8]) -> Result<()>;

    fn append(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Deletes each file in `paths`.
    fn delete(&self, paths: &[PathBuf]) -> Result<()>;

    /// Moves `path` to `target`, replacing a file already at `target`.
    fn move_to(&self, path: &Path, target: &Path) -> Result<()>;

    /// Copies a file to `target`, replacing what is there.
    ///
    /// Symlinks are copied as symlinks.
    fn copy(&self, path: &Path, target: &Path) -> Result<()>;

    /// Path a write to `path` lands on once symlinks are followed.
    fn resolve_link(&self, path: &Path) -> PathBuf {
        path.to_path_buf()
    }

    fn extension(&self, path: &Path) -> Option<String>;

    fn file_type(&self, path: &Path) -> Result<FileKind>;

    fn size(&self, path: &Path) -> Result<u64>;

    fn last_modified(&self, path: &Path) -> Result<SystemTime>;

    fn is_directory(&self, path: &Path) -> bool;

    fn is_writable(&self, path: &Path) -> bool;

    fn is_file(&self, path: &Path) -> bool;

    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>>;

    /// Files directly inside `directory`.
    fn files(&self, directory: &Path) -> Result<Vec<PathBuf>>;

    /// Files anywhere below `directory`.
    fn all_files(&self, directory: &Path) -> Result<Vec<PathBuf>>;

    /// Subdirectories directly inside `directory`.
    fn directories(&self, directory: &Path) -> Result<Vec<PathBuf>>;

    fn make_directory(&self, path: &Path, options: DirOptions) -> Result<()>;

    /// Recursively copies `directory` into `destination`, merging with
    /// whatever is already there. Symlinks inside are copied as symlinks.
    fn copy_directory(&self, directory: &Path, destination: &Path) -> Result<()>;

    /// Recursively deletes `directory`. With `preserve`, only its contents go.
    fn delete_directory(&self, directory: &Path, preserve: bool) -> Result<()>;

    /// Empties `directory` without removing it.
    fn clean_directory(&self, directory: &Path) -> Result<()> {
        self.delete_directory(directory, true)
    }
}
