//! Binary entry point for `fs-journal`.

use std::process;

fn main() {
    if let Err(e) = fs_journal::run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
