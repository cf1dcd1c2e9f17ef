//! Journaled mirror of the [`Filesystem`] operation set.
//!
//! Mutating calls are recorded first, then forwarded; queries pass straight
//! through. Operations without special handling share one interception path
//! driven by [`OPERATIONS`].

use super::{Hint, JournalingFilesystem};
use crate::error::{JournalError, Result};
use crate::fs::{DirOptions, FileKind, Filesystem};

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::SystemTime;

/// Mutating operations the journal intercepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Put,
    Prepend,
    Append,
    Delete,
    Move,
    Copy,
    MakeDirectory,
    CopyDirectory,
    DeleteDirectory,
    CleanDirectory,
}

struct OpSpec {
    op: Operation,
    name: &'static str,
    /// Affected path is snapshotted as a directory tree.
    directory: bool,
    /// Index of the argument naming the affected path.
    path_arg: usize,
}

const OPERATIONS: &[OpSpec] = &[
    OpSpec { op: Operation::Put, name: "put", directory: false, path_arg: 0 },
    OpSpec { op: Operation::Prepend, name: "prepend", directory: false, path_arg: 0 },
    OpSpec { op: Operation::Append, name: "append", directory: false, path_arg: 0 },
    OpSpec { op: Operation::Delete, name: "delete", directory: false, path_arg: 0 },
    OpSpec { op: Operation::Move, name: "move", directory: false, path_arg: 0 },
    OpSpec { op: Operation::Copy, name: "copy", directory: false, path_arg: 1 },
    OpSpec { op: Operation::MakeDirectory, name: "make-directory", directory: true, path_arg: 0 },
    OpSpec { op: Operation::CopyDirectory, name: "copy-directory", directory: true, path_arg: 1 },
    OpSpec { op: Operation::DeleteDirectory, name: "delete-directory", directory: true, path_arg: 0 },
    OpSpec { op: Operation::CleanDirectory, name: "clean-directory", directory: true, path_arg: 0 },
];

impl Operation {
    fn spec(self) -> &'static OpSpec {
        let row = match self {
            Operation::Put => 0,
            Operation::Prepend => 1,
            Operation::Append => 2,
            Operation::Delete => 3,
            Operation::Move => 4,
            Operation::Copy => 5,
            Operation::MakeDirectory => 6,
            Operation::CopyDirectory => 7,
            Operation::DeleteDirectory => 8,
            Operation::CleanDirectory => 9,
        };
        &OPERATIONS[row]
    }

    pub fn all() -> impl Iterator<Item = Operation> {
        OPERATIONS.iter().map(|s| s.op)
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Whether the affected path is a directory tree.
    pub fn is_directory_shaped(self) -> bool {
        self.spec().directory
    }

    /// Which argument names the path the operation changes.
    ///
    /// Copies change their destination, not their source.
    pub fn path_argument(self) -> usize {
        self.spec().path_arg
    }

    /// Whether the call writes through a symlink instead of replacing it.
    pub fn writes_through_links(self) -> bool {
        matches!(self, Operation::Put | Operation::Prepend | Operation::Append)
    }

    /// Hint recorded before the operation runs.
    pub fn hint(self) -> Hint {
        match self {
            Operation::Put => Hint::Put,
            Operation::Prepend => Hint::Prepend,
            Operation::Append => Hint::Append,
            Operation::Move => Hint::Move,
            Operation::MakeDirectory => Hint::Create,
            Operation::Delete
            | Operation::Copy
            | Operation::CopyDirectory
            | Operation::DeleteDirectory
            | Operation::CleanDirectory => Hint::Change,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = JournalError;

    /// Accepts kebab-case, snake_case and `write` as an alias of `put`.
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        if normalized == "write" {
            return Ok(Operation::Put);
        }
        OPERATIONS
            .iter()
            .find(|spec| spec.name == normalized)
            .map(|spec| spec.op)
            .ok_or_else(|| JournalError::InvalidPlan(format!("unknown operation '{}'", s)))
    }
}

impl<F: Filesystem> JournalingFilesystem<F> {
    /// Records the table-selected argument of `args`, then runs `forward`.
    ///
    /// Writes that go through a symlink are recorded against the file the
    /// link points to.
    fn intercept<R>(
        &mut self,
        op: Operation,
        args: &[&Path],
        forward: impl FnOnce(&F) -> Result<R>,
    ) -> Result<R> {
        let path = args.get(op.path_argument()).ok_or_else(|| {
            JournalError::Other(anyhow::anyhow!(
                "{} called without argument {}",
                op,
                op.path_argument()
            ))
        })?;

        let affected = if op.writes_through_links() {
            self.filesystem.resolve_link(path)
        } else {
            path.to_path_buf()
        };

        self.record(op.hint(), &[affected], op.is_directory_shaped())?;
        forward(&self.filesystem)
    }

    pub fn put(&mut self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Result<()> {
        let path = path.as_ref();
        self.intercept(Operation::Put, &[path], |fs| fs.put(path, contents.as_ref()))
    }

    pub fn prepend(&mut self, path: impl AsRef<Path>, data: impl AsRef<[u8]>) -> Result<()> {
        let path = path.as_ref();
        self.intercept(Operation::Prepend, &[path], |fs| {
            fs.prepend(path, data.as_ref())
        })
    }

    pub fn append(&mut self, path: impl AsRef<Path>, data: impl AsRef<[u8]>) -> Result<()> {
        let path = path.as_ref();
        self.intercept(Operation::Append, &[path], |fs| fs.append(path, data.as_ref()))
    }

    pub fn copy(&mut self, path: impl AsRef<Path>, target: impl AsRef<Path>) -> Result<()> {
        let (path, target) = (path.as_ref(), target.as_ref());
        self.intercept(Operation::Copy, &[path, target], |fs| fs.copy(path, target))
    }

    pub fn copy_directory(
        &mut self,
        directory: impl AsRef<Path>,
        destination: impl AsRef<Path>,
    ) -> Result<()> {
        let (directory, destination) = (directory.as_ref(), destination.as_ref());
        self.intercept(Operation::CopyDirectory, &[directory, destination], |fs| {
            fs.copy_directory(directory, destination)
        })
    }

    pub fn delete_directory(&mut self, directory: impl AsRef<Path>, preserve: bool) -> Result<()> {
        let directory = directory.as_ref();
        self.intercept(Operation::DeleteDirectory, &[directory], |fs| {
            fs.delete_directory(directory, preserve)
        })
    }

    pub fn clean_directory(&mut self, directory: impl AsRef<Path>) -> Result<()> {
        let directory = directory.as_ref();
        self.intercept(Operation::CleanDirectory, &[directory], |fs| {
            fs.clean_directory(directory)
        })
    }

    /// Deletes `paths`, snapshotting each one first.
    ///
    /// A path that is currently a directory is snapshotted as a tree.
    pub fn delete<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<()> {
        self.require_active(Operation::Delete.name())?;

        let paths: Vec<PathBuf> = paths.iter().map(|p| p.as_ref().to_path_buf()).collect();
        for path in &paths {
            let is_dir = self.filesystem.is_directory(path);
            self.record(Operation::Delete.hint(), std::slice::from_ref(path), is_dir)?;
        }

        self.filesystem.delete(&paths)
    }

    /// Moves `path` to `target`, snapshotting both first.
    pub fn move_to(&mut self, path: impl AsRef<Path>, target: impl AsRef<Path>) -> Result<()> {
        let (path, target) = (path.as_ref(), target.as_ref());

        for affected in [path, target] {
            let is_dir = self.filesystem.is_directory(affected);
            self.record(Operation::Move.hint(), &[affected], is_dir)?;
        }

        self.filesystem.move_to(path, target)
    }

    /// Creates a directory.
    ///
    /// The recorded entry names the top-most directory the call brings into
    /// existence, so a rollback also removes parents made by `recursive`.
    /// Nothing is recorded when `path` already exists.
    pub fn make_directory(&mut self, path: impl AsRef<Path>, options: DirOptions) -> Result<()> {
        let path = path.as_ref();
        self.require_active(Operation::MakeDirectory.name())?;

        if self.filesystem.exists(path) {
            log::debug!("{} already exists, nothing to record", path.display());
        } else {
            let created = if options.recursive {
                self.topmost_missing(path)
            } else {
                path.to_path_buf()
            };
            self.record(
                Operation::MakeDirectory.hint(),
                &[created],
                Operation::MakeDirectory.is_directory_shaped(),
            )?;
        }

        self.filesystem.make_directory(path, options)
    }

    fn topmost_missing(&self, path: &Path) -> PathBuf {
        let mut created = path;
        while let Some(parent) = created.parent() {
            if parent.as_os_str().is_empty() || self.filesystem.exists(parent) {
                break;
            }
            created = parent;
        }
        created.to_path_buf()
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.filesystem.exists(path.as_ref())
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Result<Vec<u8>> {
        self.filesystem.get(path.as_ref())
    }

    pub fn get_string(&self, path: impl AsRef<Path>) -> Result<String> {
        self.filesystem.get_string(path.as_ref())
    }

    pub fn extension(&self, path: impl AsRef<Path>) -> Option<String> {
        self.filesystem.extension(path.as_ref())
    }

    pub fn file_type(&self, path: impl AsRef<Path>) -> Result<FileKind> {
        self.filesystem.file_type(path.as_ref())
    }

    pub fn size(&self, path: impl AsRef<Path>) -> Result<u64> {
        self.filesystem.size(path.as_ref())
    }

    pub fn last_modified(&self, path: impl AsRef<Path>) -> Result<SystemTime> {
        self.filesystem.last_modified(path.as_ref())
    }

    pub fn is_directory(&self, path: impl AsRef<Path>) -> bool {
        self.filesystem.is_directory(path.as_ref())
    }

    pub fn is_writable(&self, path: impl AsRef<Path>) -> bool {
        self.filesystem.is_writable(path.as_ref())
    }

    pub fn is_file(&self, path: impl AsRef<Path>) -> bool {
        self.filesystem.is_file(path.as_ref())
    }

    pub fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        self.filesystem.glob(pattern)
    }

    pub fn files(&self, directory: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        self.filesystem.files(directory.as_ref())
    }

    pub fn all_files(&self, directory: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        self.filesystem.all_files(directory.as_ref())
    }

    pub fn directories(&self, directory: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        self.filesystem.directories(directory.as_ref())
    }
}
