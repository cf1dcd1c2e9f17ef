//! TOML operation plans for the `apply` command.
//!
//! ```toml
//! [journal]
//! record-root = ".journal"
//!
//! [[step]]
//! op = "put"
//! path = "notes.txt"
//! contents = "hello"
//!
//! [[step]]
//! op = "move"
//! path = "notes.txt"
//! target = "archive/notes.txt"
//! ```
//!
//! Relative paths resolve against the plan file's directory.

use crate::error::{JournalError, Result};
use crate::fs::{DirOptions, Filesystem};
use crate::journal::{JournalingFilesystem, Operation};

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use toml_edit::{DocumentMut, Table};

/// One journaled call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Put { path: PathBuf, contents: String },
    Prepend { path: PathBuf, contents: String },
    Append { path: PathBuf, contents: String },
    Delete { paths: Vec<PathBuf> },
    Move { path: PathBuf, target: PathBuf },
    Copy { path: PathBuf, target: PathBuf },
    MakeDirectory { path: PathBuf, options: DirOptions },
    CopyDirectory { path: PathBuf, target: PathBuf },
    DeleteDirectory { path: PathBuf, preserve: bool },
    CleanDirectory { path: PathBuf },
}

impl Step {
    pub fn operation(&self) -> Operation {
        match self {
            Step::Put { .. } => Operation::Put,
            Step::Prepend { .. } => Operation::Prepend,
            Step::Append { .. } => Operation::Append,
            Step::Delete { .. } => Operation::Delete,
            Step::Move { .. } => Operation::Move,
            Step::Copy { .. } => Operation::Copy,
            Step::MakeDirectory { .. } => Operation::MakeDirectory,
            Step::CopyDirectory { .. } => Operation::CopyDirectory,
            Step::DeleteDirectory { .. } => Operation::DeleteDirectory,
            Step::CleanDirectory { .. } => Operation::CleanDirectory,
        }
    }

    /// Paths named by the step, in argument order.
    pub fn paths(&self) -> Vec<&Path> {
        match self {
            Step::Put { path, .. }
            | Step::Prepend { path, .. }
            | Step::Append { path, .. }
            | Step::MakeDirectory { path, .. }
            | Step::DeleteDirectory { path, .. }
            | Step::CleanDirectory { path } => vec![path],
            Step::Delete { paths } => paths.iter().map(PathBuf::as_path).collect(),
            Step::Move { path, target }
            | Step::Copy { path, target }
            | Step::CopyDirectory { path, target } => vec![path, target],
        }
    }

    /// Runs the step through `journal`.
    pub fn apply<F: Filesystem>(&self, journal: &mut JournalingFilesystem<F>) -> Result<()> {
        match self {
            Step::Put { path, contents } => journal.put(path, contents),
            Step::Prepend { path, contents } => journal.prepend(path, contents),
            Step::Append { path, contents } => journal.append(path, contents),
            Step::Delete { paths } => journal.delete(paths),
            Step::Move { path, target } => journal.move_to(path, target),
            Step::Copy { path, target } => journal.copy(path, target),
            Step::MakeDirectory { path, options } => journal.make_directory(path, *options),
            Step::CopyDirectory { path, target } => journal.copy_directory(path, target),
            Step::DeleteDirectory { path, preserve } => journal.delete_directory(path, *preserve),
            Step::CleanDirectory { path } => journal.clean_directory(path),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let paths: Vec<String> = self
            .paths()
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        let separator = match self {
            Step::Delete { .. } => ", ",
            _ => " → ",
        };
        write!(f, "{} {}", self.operation(), paths.join(separator))
    }
}

/// Parsed plan file.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Directory relative paths were resolved against.
    pub base_dir: PathBuf,
    /// `[journal] record-root`, if set.
    pub record_root: Option<PathBuf>,
    pub steps: Vec<Step>,
}

impl Plan {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            JournalError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read plan {}: {}", path.display(), e),
            ))
        })?;

        let base_dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Self::parse(&content, &base_dir)
    }

    pub fn parse(content: &str, base_dir: &Path) -> Result<Self> {
        let doc = content.parse::<DocumentMut>()?;

        let record_root = match doc.get("journal").and_then(|j| j.get("record-root")) {
            Some(item) => Some(base_dir.join(item.as_str().ok_or_else(|| {
                JournalError::InvalidPlan("journal.record-root must be a string".into())
            })?)),
            None => None,
        };

        let tables = doc
            .get("step")
            .and_then(|s| s.as_array_of_tables())
            .ok_or_else(|| JournalError::InvalidPlan("no [[step]] entries".into()))?;

        let steps = tables
            .iter()
            .enumerate()
            .map(|(index, table)| parse_step(index + 1, table, base_dir))
            .collect::<Result<Vec<_>>>()?;

        log::debug!("Loaded plan with {} steps", steps.len());

        Ok(Self {
            base_dir: base_dir.to_path_buf(),
            record_root,
            steps,
        })
    }
}

fn parse_step(number: usize, table: &Table, base: &Path) -> Result<Step> {
    let op: Operation = required_str(number, table, "op")?.parse()?;
    let path = |key: &str| required_str(number, table, key).map(|p| base.join(p));
    let contents = || required_str(number, table, "contents").map(str::to_string);

    Ok(match op {
        Operation::Put => Step::Put {
            path: path("path")?,
            contents: contents()?,
        },
        Operation::Prepend => Step::Prepend {
            path: path("path")?,
            contents: contents()?,
        },
        Operation::Append => Step::Append {
            path: path("path")?,
            contents: contents()?,
        },
        Operation::Delete => Step::Delete {
            paths: delete_paths(number, table, base)?,
        },
        Operation::Move => Step::Move {
            path: path("path")?,
            target: path("target")?,
        },
        Operation::Copy => Step::Copy {
            path: path("path")?,
            target: path("target")?,
        },
        Operation::MakeDirectory => Step::MakeDirectory {
            path: path("path")?,
            options: dir_options(number, table)?,
        },
        Operation::CopyDirectory => Step::CopyDirectory {
            path: path("path")?,
            target: path("target")?,
        },
        Operation::DeleteDirectory => Step::DeleteDirectory {
            path: path("path")?,
            preserve: optional_bool(number, table, "preserve")?.unwrap_or(false),
        },
        Operation::CleanDirectory => Step::CleanDirectory {
            path: path("path")?,
        },
    })
}

fn invalid(number: usize, msg: impl fmt::Display) -> JournalError {
    JournalError::InvalidPlan(format!("step {}: {}", number, msg))
}

fn required_str<'a>(number: usize, table: &'a Table, key: &str) -> Result<&'a str> {
    table
        .get(key)
        .ok_or_else(|| invalid(number, format!("missing '{}'", key)))?
        .as_str()
        .ok_or_else(|| invalid(number, format!("'{}' must be a string", key)))
}

fn optional_bool(number: usize, table: &Table, key: &str) -> Result<Option<bool>> {
    table
        .get(key)
        .map(|item| {
            item.as_bool()
                .ok_or_else(|| invalid(number, format!("'{}' must be a boolean", key)))
        })
        .transpose()
}

fn delete_paths(number: usize, table: &Table, base: &Path) -> Result<Vec<PathBuf>> {
    if let Some(array) = table.get("paths").and_then(|p| p.as_array()) {
        return array
            .iter()
            .map(|v| {
                v.as_str()
                    .map(|p| base.join(p))
                    .ok_or_else(|| invalid(number, "'paths' must contain strings"))
            })
            .collect();
    }

    Ok(vec![base.join(required_str(number, table, "path")?)])
}

fn dir_options(number: usize, table: &Table) -> Result<DirOptions> {
    let mut options = DirOptions::default()
        .recursive(optional_bool(number, table, "recursive")?.unwrap_or(false))
        .force(optional_bool(number, table, "force")?.unwrap_or(false));

    if let Some(item) = table.get("mode") {
        let mode = item
            .as_integer()
            .and_then(|m| u32::try_from(m).ok())
            .ok_or_else(|| invalid(number, "'mode' must be a non-negative integer"))?;
        options = options.mode(mode);
    }

    Ok(options)
}
