pub mod apply;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum JournalCommand {
    /// Run every step of a TOML plan in one transaction.
    Apply(apply::ApplyArgs),
}
