use clap::{ArgAction, Parser};

use crate::command::JournalCommand;

#[derive(Parser)]
#[command(name = "fs-journal", version, about)]
pub struct JournalCli {
    /// Increase log output (-v for info, -vv for debug)
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: JournalCommand,
}

impl JournalCli {
    /// Default `env_logger` filter for the requested verbosity.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}
