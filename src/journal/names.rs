//! Collision-free names for session directories and backup snapshots.

use crate::error::{JournalError, Result};
use crate::fs::Filesystem;

use sha2::{Digest, Sha256};
use std::io;
use std::path::Path;

/// Candidates tried before giving up.
pub const MAX_ATTEMPTS: usize = 64;

/// Hex characters in a generated name.
const NAME_LEN: usize = 32;

/// Returns a name that does not exist under `parent` right now.
///
/// Directory names are checked with `is_directory`, everything else with
/// `exists`.
pub fn unique_name<F>(fs: &F, parent: &Path, is_directory: bool) -> Result<String>
where
    F: Filesystem + ?Sized,
{
    unique_name_with(parent, |candidate| {
        if is_directory {
            fs.is_directory(candidate)
        } else {
            fs.exists(candidate)
        }
    })
}

/// Generates names until `is_taken` rejects none, or [`MAX_ATTEMPTS`] run out.
pub fn unique_name_with<P>(parent: &Path, mut is_taken: P) -> Result<String>
where
    P: FnMut(&Path) -> bool,
{
    let mut name = rand::random::<u32>().to_string();

    for _ in 0..MAX_ATTEMPTS {
        name = rehash(&name, rand::random());

        if !is_taken(&parent.join(&name)) {
            return Ok(name);
        }

        log::debug!("Name {} taken under {}, retrying", name, parent.display());
    }

    Err(JournalError::Io(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!(
            "No free name under {} after {} attempts",
            parent.display(),
            MAX_ATTEMPTS
        ),
    )))
}

fn rehash(previous: &str, salt: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(previous.as_bytes());
    hasher.update(salt.to_le_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..NAME_LEN / 2])
}
