//! `std::fs`-backed delegate.
//!
//! Errors are re-wrapped with the operation and path that failed, keeping
//! the original [`io::ErrorKind`].

use super::{DirOptions, FileKind, Filesystem};
use crate::error::{JournalError, Result};

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Symlink hops followed by `resolve_link` before giving up.
const MAX_LINK_HOPS: usize = 40;

/// Delegate operating directly on the local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFilesystem;

impl LocalFilesystem {
    pub fn new() -> Self {
        Self
    }

    /// Checks if paths are on same filesystem.
    ///
    /// Determines if `rename()` is possible, or if a cross-filesystem
    /// copy+delete is required.
    fn is_same_filesystem(path1: &Path, path2: &Path) -> Result<bool> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            let meta1 = fs::symlink_metadata(path1).map_err(|e| wrap(e, "move", path1))?;
            let meta2_parent = match path2.parent() {
                Some(p) if !p.as_os_str().is_empty() => p,
                _ => Path::new("."),
            };
            let meta2 = fs::metadata(meta2_parent).map_err(|e| wrap(e, "move into", meta2_parent))?;
            Ok(meta1.dev() == meta2.dev())
        }

        #[cfg(not(unix))]
        {
            let path1_str = path1.to_string_lossy();
            let path2_str = path2.to_string_lossy();

            if path1_str.len() >= 2 && path2_str.len() >= 2 {
                Ok(path1_str.chars().next() == path2_str.chars().next())
            } else {
                Ok(true)
            }
        }
    }

    /// Recursively copies a directory tree into `to`.
    fn copy_dir_recursive(from: &Path, to: &Path) -> Result<()> {
        fs::create_dir_all(to).map_err(|e| wrap(e, "create", to))?;

        for entry in fs::read_dir(from).map_err(|e| wrap(e, "read", from))? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let from_path = entry.path();
            let to_path = to.join(entry.file_name());

            if file_type.is_dir() {
                Self::copy_dir_recursive(&from_path, &to_path)?;
            } else {
                Self::copy_entry(&from_path, &to_path)?;
            }
        }

        Ok(())
    }

    /// Copies a file, or recreates a symlink as a symlink.
    ///
    /// A symlink already at `to` is replaced, never written through.
    fn copy_entry(from: &Path, to: &Path) -> Result<()> {
        let source = fs::symlink_metadata(from).map_err(|e| wrap(e, "copy", from))?;
        let is_link = source.file_type().is_symlink();

        let clear_target = match fs::symlink_metadata(to) {
            Ok(existing) => is_link || existing.file_type().is_symlink(),
            Err(_) => false,
        };
        if clear_target {
            fs::remove_file(to).map_err(|e| wrap(e, "replace", to))?;
        }

        if is_link {
            let link = fs::read_link(from).map_err(|e| wrap(e, "read link", from))?;
            Self::symlink(&link, from, to).map_err(|e| wrap(e, "link", to))
        } else {
            fs::copy(from, to)
                .map(|_| ())
                .map_err(|e| wrap(e, "copy", from))
        }
    }

    #[cfg(unix)]
    fn symlink(link: &Path, _from: &Path, to: &Path) -> io::Result<()> {
        std::os::unix::fs::symlink(link, to)
    }

    #[cfg(windows)]
    fn symlink(link: &Path, from: &Path, to: &Path) -> io::Result<()> {
        if from.is_dir() {
            std::os::windows::fs::symlink_dir(link, to)
        } else {
            std::os::windows::fs::symlink_file(link, to)
        }
    }

    #[cfg(not(any(unix, windows)))]
    fn symlink(_link: &Path, from: &Path, to: &Path) -> io::Result<()> {
        fs::copy(from, to).map(|_| ())
    }

    fn list_dir(directory: &Path, want_dirs: bool) -> Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(directory).map_err(|e| wrap(e, "read", directory))? {
            let entry = entry?;
            if entry.file_type()?.is_dir() == want_dirs {
                out.push(entry.path());
            }
        }
        out.sort();
        Ok(out)
    }
}

fn wrap(e: io::Error, verb: &str, path: &Path) -> JournalError {
    JournalError::Io(io::Error::new(
        e.kind(),
        format!("Failed to {} {}: {}", verb, path.display(), e),
    ))
}

impl Filesystem for LocalFilesystem {
    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn get(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| wrap(e, "read", path))
    }

    fn get_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| wrap(e, "read", path))
    }

    fn put(&self, path: &Path, contents: &[u8]) -> Result<()> {
        fs::write(path, contents).map_err(|e| wrap(e, "write", path))
    }

    fn prepend(&self, path: &Path, data: &[u8]) -> Result<()> {
        if self.exists(path) {
            let mut contents = data.to_vec();
            contents.extend(self.get(path)?);
            self.put(path, &contents)
        } else {
            self.put(path, data)
        }
    }

    fn append(&self, path: &Path, data: &[u8]) -> Result<()> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| wrap(e, "open", path))?;
        file.write_all(data).map_err(|e| wrap(e, "append to", path))
    }

    fn delete(&self, paths: &[PathBuf]) -> Result<()> {
        for path in paths {
            fs::remove_file(path).map_err(|e| wrap(e, "delete", path))?;
        }
        Ok(())
    }

    fn move_to(&self, path: &Path, target: &Path) -> Result<()> {
        if Self::is_same_filesystem(path, target)? {
            fs::rename(path, target).map_err(|e| {
                JournalError::Io(io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to move {} → {}: {}",
                        path.display(),
                        target.display(),
                        e
                    ),
                ))
            })
        } else if self.is_directory(path) {
            Self::copy_dir_recursive(path, target)?;
            fs::remove_dir_all(path).map_err(|e| wrap(e, "remove", path))
        } else {
            Self::copy_entry(path, target)?;
            fs::remove_file(path).map_err(|e| wrap(e, "remove", path))
        }
    }

    fn copy(&self, path: &Path, target: &Path) -> Result<()> {
        Self::copy_entry(path, target)
    }

    fn resolve_link(&self, path: &Path) -> PathBuf {
        let mut current = path.to_path_buf();
        for _ in 0..MAX_LINK_HOPS {
            let Ok(link) = fs::read_link(&current) else {
                break;
            };
            current = match current.parent() {
                Some(parent) if link.is_relative() => parent.join(link),
                _ => link,
            };
        }
        current
    }

    fn extension(&self, path: &Path) -> Option<String> {
        path.extension().map(|e| e.to_string_lossy().into_owned())
    }

    fn file_type(&self, path: &Path) -> Result<FileKind> {
        let ft = fs::symlink_metadata(path)
            .map_err(|e| wrap(e, "stat", path))?
            .file_type();

        Ok(if ft.is_symlink() {
            FileKind::Link
        } else if ft.is_dir() {
            FileKind::Dir
        } else if ft.is_file() {
            FileKind::File
        } else {
            FileKind::Other
        })
    }

    fn size(&self, path: &Path) -> Result<u64> {
        Ok(fs::metadata(path).map_err(|e| wrap(e, "stat", path))?.len())
    }

    fn last_modified(&self, path: &Path) -> Result<SystemTime> {
        fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(|e| wrap(e, "stat", path))
    }

    fn is_directory(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_writable(&self, path: &Path) -> bool {
        fs::metadata(path)
            .map(|m| !m.permissions().readonly())
            .unwrap_or(false)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        for entry in glob::glob(pattern)? {
            match entry {
                Ok(path) => out.push(path),
                Err(e) => log::debug!("Skipping glob entry: {}", e),
            }
        }
        Ok(out)
    }

    fn files(&self, directory: &Path) -> Result<Vec<PathBuf>> {
        Self::list_dir(directory, false)
    }

    fn all_files(&self, directory: &Path) -> Result<Vec<PathBuf>> {
        if !self.is_directory(directory) {
            return Err(JournalError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Not a directory: {}", directory.display()),
            )));
        }

        let walker = ignore::WalkBuilder::new(directory)
            .standard_filters(false)
            .build();

        let mut out = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| JournalError::Io(io::Error::other(e.to_string())))?;
            if entry.file_type().is_some_and(|ft| ft.is_file()) {
                out.push(entry.into_path());
            }
        }
        out.sort();
        Ok(out)
    }

    fn directories(&self, directory: &Path) -> Result<Vec<PathBuf>> {
        Self::list_dir(directory, true)
    }

    fn make_directory(&self, path: &Path, options: DirOptions) -> Result<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(options.recursive);

        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(options.mode);
        }

        match builder.create(path) {
            Ok(()) => Ok(()),
            Err(_) if options.force && path.is_dir() => Ok(()),
            Err(e) => Err(wrap(e, "create directory", path)),
        }
    }

    fn copy_directory(&self, directory: &Path, destination: &Path) -> Result<()> {
        if !self.is_directory(directory) {
            return Err(JournalError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Not a directory: {}", directory.display()),
            )));
        }
        Self::copy_dir_recursive(directory, destination)
    }

    fn delete_directory(&self, directory: &Path, preserve: bool) -> Result<()> {
        if !preserve {
            return fs::remove_dir_all(directory).map_err(|e| wrap(e, "remove", directory));
        }

        for entry in fs::read_dir(directory).map_err(|e| wrap(e, "read", directory))? {
            let path = entry?.path();
            if path.is_dir() && !path.is_symlink() {
                fs::remove_dir_all(&path).map_err(|e| wrap(e, "remove", &path))?;
            } else {
                fs::remove_file(&path).map_err(|e| wrap(e, "remove", &path))?;
            }
        }
        Ok(())
    }
}
