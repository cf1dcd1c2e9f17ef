mod common;

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use common::*;
use fs_journal::fs::{DirOptions, FileKind};
use fs_journal::journal::{Entry, SessionState};
use fs_journal::plan::Step;
use fs_journal::{Filesystem, JournalError, JournalingFilesystem, LocalFilesystem, Result};

/// A mixed sequence touching files, directories and moves.
fn mixed_steps(work: &Path) -> Vec<Step> {
    vec![
        Step::Put {
            path: work.join("a.txt"),
            contents: "alpha v2".into(),
        },
        Step::Put {
            path: work.join("new.txt"),
            contents: "brand new".into(),
        },
        Step::Append {
            path: work.join("new.txt"),
            contents: " + more".into(),
        },
        Step::Prepend {
            path: work.join("b.txt"),
            contents: ">> ".into(),
        },
        Step::Move {
            path: work.join("b.txt"),
            target: work.join("a.txt"),
        },
        Step::MakeDirectory {
            path: work.join("out/reports"),
            options: DirOptions::default().recursive(true),
        },
        Step::Copy {
            path: work.join("a.txt"),
            target: work.join("out/reports/a.txt"),
        },
        Step::CopyDirectory {
            path: work.join("docs"),
            target: work.join("out/docs"),
        },
        Step::CleanDirectory {
            path: work.join("docs/guide"),
        },
        Step::DeleteDirectory {
            path: work.join("empty"),
            preserve: false,
        },
        Step::Delete {
            paths: vec![work.join("docs/readme.md")],
        },
    ]
}

/// Applies a step straight to the delegate, with no journaling.
fn apply_direct(fs: &LocalFilesystem, step: &Step) -> Result<()> {
    match step {
        Step::Put { path, contents } => fs.put(path, contents.as_bytes()),
        Step::Prepend { path, contents } => fs.prepend(path, contents.as_bytes()),
        Step::Append { path, contents } => fs.append(path, contents.as_bytes()),
        Step::Delete { paths } => fs.delete(paths),
        Step::Move { path, target } => fs.move_to(path, target),
        Step::Copy { path, target } => fs.copy(path, target),
        Step::MakeDirectory { path, options } => fs.make_directory(path, *options),
        Step::CopyDirectory { path, target } => fs.copy_directory(path, target),
        Step::DeleteDirectory { path, preserve } => fs.delete_directory(path, *preserve),
        Step::CleanDirectory { path } => fs.clean_directory(path),
    }
}

#[test]
fn test_commit_matches_direct_execution() {
    let journaled = create_test_tree();
    let direct = create_test_tree();

    let mut journal = JournalingFilesystem::new(LocalFilesystem::new(), record_root(&journaled));
    journal
        .transaction(|fs| -> Result<()> {
            for step in mixed_steps(&work_dir(&journaled)) {
                step.apply(fs)?;
            }
            Ok(())
        })
        .unwrap();

    let delegate = LocalFilesystem::new();
    for step in mixed_steps(&work_dir(&direct)) {
        apply_direct(&delegate, &step).unwrap();
    }

    assert_eq!(
        snapshot_tree(&work_dir(&journaled)),
        snapshot_tree(&work_dir(&direct))
    );
    assert_eq!(leftover_sessions(&journaled), 0);
    assert!(journal.entries().is_empty());
}

#[test]
fn test_rollback_restores_exact_state() {
    let temp = create_test_tree();
    let work = work_dir(&temp);
    let before = snapshot_tree(&work);

    let mut journal = JournalingFilesystem::new(LocalFilesystem::new(), record_root(&temp));
    let result = journal.transaction(|fs| -> Result<()> {
        for step in mixed_steps(&work) {
            step.apply(fs)?;
        }
        Err(JournalError::InvalidPlan("abort".into()))
    });

    assert!(matches!(result, Err(JournalError::InvalidPlan(msg)) if msg == "abort"));
    assert_eq!(snapshot_tree(&work), before);
    assert_eq!(leftover_sessions(&temp), 0);
    assert!(journal.entries().is_empty());
    assert_eq!(journal.state(), SessionState::Idle);
}

#[test]
fn test_rollback_after_each_prefix() {
    let steps = mixed_steps(Path::new("/unused")).len();

    for cut in 1..=steps {
        let temp = create_test_tree();
        let work = work_dir(&temp);
        let before = snapshot_tree(&work);

        let mut journal = JournalingFilesystem::new(LocalFilesystem::new(), record_root(&temp));
        journal.start().unwrap();
        for step in mixed_steps(&work).iter().take(cut) {
            step.apply(&mut journal).unwrap();
        }
        journal.rollback().unwrap();
        journal.end().unwrap();

        assert_eq!(snapshot_tree(&work), before, "after {} steps", cut);
        assert_eq!(leftover_sessions(&temp), 0);
    }
}

#[test]
fn test_failing_delegate_call_rolls_back() {
    let temp = create_test_tree();
    let work = work_dir(&temp);
    let before = snapshot_tree(&work);

    let mut journal = JournalingFilesystem::new(LocalFilesystem::new(), record_root(&temp));
    let result = journal.transaction(|fs| {
        fs.put(work.join("a.txt"), "changed")?;
        fs.delete_directory(work.join("docs"), false)?;
        fs.move_to(work.join("missing.txt"), work.join("b.txt"))
    });

    assert!(matches!(result, Err(JournalError::Io(_))));
    assert_eq!(snapshot_tree(&work), before);
    assert_eq!(leftover_sessions(&temp), 0);
}

#[test]
fn test_manual_undo_then_commit() {
    let temp = create_test_tree();
    let work = work_dir(&temp);
    let mut journal = JournalingFilesystem::new(LocalFilesystem::new(), record_root(&temp));

    journal.start().unwrap();
    journal.put(work.join("a.txt"), "one").unwrap();
    journal.put(work.join("c.txt"), "three").unwrap();
    journal
        .delete(&[work.join("b.txt"), work.join("docs/readme.md")])
        .unwrap();
    assert_eq!(journal.entries().len(), 4);

    // Undo the two deletes, keep the writes.
    assert_eq!(journal.undo(2).unwrap(), 2);
    assert_eq!(fs::read_to_string(work.join("b.txt")).unwrap(), "bravo");
    assert_eq!(
        fs::read_to_string(work.join("docs/readme.md")).unwrap(),
        "# Readme"
    );

    journal.commit().unwrap();
    journal.end().unwrap();

    assert_eq!(fs::read_to_string(work.join("a.txt")).unwrap(), "one");
    assert_eq!(fs::read_to_string(work.join("c.txt")).unwrap(), "three");
    assert_eq!(leftover_sessions(&temp), 0);
}

#[test]
fn test_entries_follow_recording_order() {
    let temp = create_test_tree();
    let work = work_dir(&temp);
    let mut journal = JournalingFilesystem::new(LocalFilesystem::new(), record_root(&temp));

    journal.start().unwrap();
    journal.put(work.join("fresh.txt"), "x").unwrap();
    journal.put(work.join("a.txt"), "y").unwrap();
    journal
        .make_directory(work.join("dir"), DirOptions::default())
        .unwrap();

    let paths: Vec<PathBuf> = journal
        .entries()
        .iter()
        .map(|e| e.path().to_path_buf())
        .collect();
    assert_eq!(
        paths,
        vec![work.join("fresh.txt"), work.join("a.txt"), work.join("dir")]
    );
    assert!(matches!(journal.entries()[0], Entry::Create { .. }));
    assert!(matches!(journal.entries()[1], Entry::Change { .. }));
    assert!(matches!(journal.entries()[2], Entry::Create { .. }));

    journal.rollback().unwrap();
    journal.end().unwrap();
}

/// Delegate that refuses moves onto one path, `refusals` times.
struct RestoreBlocker {
    inner: LocalFilesystem,
    blocked: PathBuf,
    refusals: Cell<usize>,
    moves: Cell<usize>,
}

impl RestoreBlocker {
    fn new(blocked: PathBuf, refusals: usize) -> Self {
        Self {
            inner: LocalFilesystem::new(),
            blocked,
            refusals: Cell::new(refusals),
            moves: Cell::new(0),
        }
    }
}

impl Filesystem for RestoreBlocker {
    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }
    fn get(&self, path: &Path) -> Result<Vec<u8>> {
        self.inner.get(path)
    }
    fn get_string(&self, path: &Path) -> Result<String> {
        self.inner.get_string(path)
    }
    fn put(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.inner.put(path, contents)
    }
    fn prepend(&self, path: &Path, data: &[u8]) -> Result<()> {
        self.inner.prepend(path, data)
    }
    fn append(&self, path: &Path, data: &[u8]) -> Result<()> {
        self.inner.append(path, data)
    }
    fn delete(&self, paths: &[PathBuf]) -> Result<()> {
        self.inner.delete(paths)
    }
    fn move_to(&self, path: &Path, target: &Path) -> Result<()> {
        self.moves.set(self.moves.get() + 1);
        if target == self.blocked && self.refusals.get() > 0 {
            self.refusals.set(self.refusals.get() - 1);
            return Err(JournalError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "restore blocked",
            )));
        }
        self.inner.move_to(path, target)
    }
    fn copy(&self, path: &Path, target: &Path) -> Result<()> {
        self.inner.copy(path, target)
    }
    fn resolve_link(&self, path: &Path) -> PathBuf {
        self.inner.resolve_link(path)
    }
    fn extension(&self, path: &Path) -> Option<String> {
        self.inner.extension(path)
    }
    fn file_type(&self, path: &Path) -> Result<FileKind> {
        self.inner.file_type(path)
    }
    fn size(&self, path: &Path) -> Result<u64> {
        self.inner.size(path)
    }
    fn last_modified(&self, path: &Path) -> Result<SystemTime> {
        self.inner.last_modified(path)
    }
    fn is_directory(&self, path: &Path) -> bool {
        self.inner.is_directory(path)
    }
    fn is_writable(&self, path: &Path) -> bool {
        self.inner.is_writable(path)
    }
    fn is_file(&self, path: &Path) -> bool {
        self.inner.is_file(path)
    }
    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        self.inner.glob(pattern)
    }
    fn files(&self, directory: &Path) -> Result<Vec<PathBuf>> {
        self.inner.files(directory)
    }
    fn all_files(&self, directory: &Path) -> Result<Vec<PathBuf>> {
        self.inner.all_files(directory)
    }
    fn directories(&self, directory: &Path) -> Result<Vec<PathBuf>> {
        self.inner.directories(directory)
    }
    fn make_directory(&self, path: &Path, options: DirOptions) -> Result<()> {
        self.inner.make_directory(path, options)
    }
    fn copy_directory(&self, directory: &Path, destination: &Path) -> Result<()> {
        self.inner.copy_directory(directory, destination)
    }
    fn delete_directory(&self, directory: &Path, preserve: bool) -> Result<()> {
        self.inner.delete_directory(directory, preserve)
    }
}

#[test]
fn test_failed_rollback_keeps_session_and_returns_work_error() {
    let temp = create_test_tree();
    let work = work_dir(&temp);
    let blocker = RestoreBlocker::new(work.join("a.txt"), usize::MAX);
    let mut journal = JournalingFilesystem::new(blocker, record_root(&temp));

    let result = journal.transaction(|fs| -> Result<()> {
        fs.put(work.join("a.txt"), "changed")?;
        fs.put(work.join("b.txt"), "changed")?;
        Err(JournalError::InvalidPlan("work failed".into()))
    });

    // The work's error wins over the rollback failure.
    assert!(matches!(result, Err(JournalError::InvalidPlan(msg)) if msg == "work failed"));

    // b.txt was restored before the blocked entry stopped the replay; a.txt
    // keeps the transaction's version rather than vanishing.
    assert_eq!(fs::read_to_string(work.join("b.txt")).unwrap(), "bravo");
    assert_eq!(fs::read_to_string(work.join("a.txt")).unwrap(), "changed");
    assert_eq!(journal.delegate().moves.get(), 2);

    // The snapshot of a.txt survives in the kept session.
    let Entry::Change { backup, .. } = journal.entries()[0].clone() else {
        panic!("expected change entry");
    };
    let snapshot = journal.session().unwrap().backup_path(&backup);
    assert_eq!(fs::read_to_string(snapshot).unwrap(), "alpha");

    assert_eq!(journal.state(), SessionState::Active);
    assert_eq!(journal.entries().len(), 1);
    assert_eq!(leftover_sessions(&temp), 1);

    match journal.rollback() {
        Err(JournalError::RollbackFailed { remaining, source }) => {
            assert_eq!(remaining, 1);
            assert!(source.to_string().contains("restore blocked"));
        }
        other => panic!("expected RollbackFailed, got {:?}", other),
    }
    assert_eq!(fs::read_to_string(work.join("a.txt")).unwrap(), "changed");
}

#[test]
fn test_failed_directory_restore_puts_current_tree_back() {
    let temp = create_test_tree();
    let work = work_dir(&temp);
    let before = snapshot_tree(&work);
    let docs = work.join("docs");
    let mut journal =
        JournalingFilesystem::new(RestoreBlocker::new(docs.clone(), 1), record_root(&temp));

    let result = journal.transaction(|fs| -> Result<()> {
        fs.clean_directory(&docs)?;
        fs.put(docs.join("new.txt"), "new")?;
        Err(JournalError::InvalidPlan("work failed".into()))
    });
    assert!(matches!(result, Err(JournalError::InvalidPlan(_))));

    // The refused restore left the cleaned directory where it was.
    assert!(docs.is_dir());
    assert_eq!(fs::read_dir(&docs).unwrap().count(), 0);
    assert_eq!(journal.entries().len(), 1);
    assert_eq!(journal.state(), SessionState::Active);

    journal.rollback().unwrap();
    journal.end().unwrap();

    assert_eq!(snapshot_tree(&work), before);
    assert_eq!(leftover_sessions(&temp), 0);
}

#[cfg(unix)]
#[test]
fn test_rollback_through_symlinked_file() {
    use std::os::unix::fs::symlink;

    let temp = create_test_tree();
    let work = work_dir(&temp);
    symlink("a.txt", work.join("alias.txt")).unwrap();
    let before = snapshot_tree(&work);

    let mut journal = JournalingFilesystem::new(LocalFilesystem::new(), record_root(&temp));
    let result = journal.transaction(|fs| -> Result<()> {
        fs.prepend(work.join("alias.txt"), ">> ")?;
        fs.delete(&[work.join("alias.txt")])?;
        Err(JournalError::InvalidPlan("abort".into()))
    });

    assert!(result.is_err());
    assert_eq!(snapshot_tree(&work), before);
    assert!(work.join("alias.txt").is_symlink());
    assert_eq!(fs::read_to_string(work.join("a.txt")).unwrap(), "alpha");
}

#[test]
fn test_sessions_do_not_collide_with_existing_entries() {
    let temp = create_test_tree();
    let root = record_root(&temp);
    fs::create_dir_all(&root).unwrap();
    for i in 0..20 {
        fs::create_dir(root.join(format!("stale-{}", i))).unwrap();
    }

    let mut journal = JournalingFilesystem::new(LocalFilesystem::new(), &root);
    journal.start().unwrap();
    let token = journal.session().unwrap().token().to_string();
    assert!(!token.starts_with("stale-"));
    journal.commit().unwrap();
    journal.end().unwrap();

    // Stale sessions from other runs are left alone.
    assert_eq!(leftover_sessions(&temp), 20);
}
