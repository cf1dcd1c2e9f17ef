//! Shared helpers for fs-journal integration tests.
//!
//! Each test builds a small tree under `<temp>/work` and keeps the journal's
//! record root at `<temp>/.journal`, outside the tree being compared.

use assert_cmd::cargo::cargo_bin_cmd;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// File contents by relative path; `None` marks a directory.
pub type TreeState = BTreeMap<PathBuf, Option<Vec<u8>>>;

/// Helper to create a test tree with files and nested directories
#[allow(unused)]
pub fn create_test_tree() -> TempDir {
    let temp = TempDir::new().unwrap();
    let work = temp.path().join("work");

    fs::create_dir_all(work.join("docs/guide")).unwrap();
    fs::create_dir_all(work.join("empty")).unwrap();
    fs::write(work.join("a.txt"), "alpha").unwrap();
    fs::write(work.join("b.txt"), "bravo").unwrap();
    fs::write(work.join("docs/readme.md"), "# Readme").unwrap();
    fs::write(work.join("docs/guide/intro.md"), "intro").unwrap();

    temp
}

#[allow(unused)]
pub fn work_dir(temp: &TempDir) -> PathBuf {
    temp.path().join("work")
}

#[allow(unused)]
pub fn record_root(temp: &TempDir) -> PathBuf {
    temp.path().join(".journal")
}

/// Number of session directories left under the record root.
#[allow(unused)]
pub fn leftover_sessions(temp: &TempDir) -> usize {
    fs::read_dir(record_root(temp))
        .map(|d| d.count())
        .unwrap_or(0)
}

/// Captures every file and directory below `root`.
#[allow(unused)]
pub fn snapshot_tree(root: &Path) -> TreeState {
    let mut state = TreeState::new();
    collect(root, root, &mut state);
    state
}

fn collect(root: &Path, dir: &Path, state: &mut TreeState) {
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        let relative = path.strip_prefix(root).unwrap().to_path_buf();
        if path.is_dir() {
            state.insert(relative, None);
            collect(root, &path, state);
        } else {
            state.insert(relative, Some(fs::read(&path).unwrap()));
        }
    }
}

/// Writes `plan.toml` into `dir`.
#[allow(unused)]
pub fn write_plan(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("plan.toml");
    fs::write(&path, content).unwrap();
    path
}

/// Helper to run the apply command
#[allow(unused)]
pub fn run_apply(plan: &Path, extra_args: &[&str]) -> assert_cmd::assert::Assert {
    let mut cmd = cargo_bin_cmd!("fs-journal");
    cmd.arg("apply").arg(plan).args(extra_args);

    cmd.assert()
}
