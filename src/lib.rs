#![doc = include_str!("../README.md")]

pub mod cli;
pub mod command;
pub mod error;
pub mod fs;
pub mod journal;
pub mod plan;

pub use error::*;
pub use fs::{Filesystem, LocalFilesystem};
pub use journal::JournalingFilesystem;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn run() -> Result<()> {
    use clap::Parser;
    use command::JournalCommand;

    let cli = cli::JournalCli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter()))
        .format_timestamp(None)
        .init();

    match cli.command {
        JournalCommand::Apply(args) => command::apply::execute(args),
    }
}
