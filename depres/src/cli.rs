// depres/src/cli.rs
//! Defines the command-line argument structure using clap.
use clap::{ArgAction, Parser, Subcommand};
use depres_common::config::Config;
use depres_common::error::Result;

pub mod clean;
pub mod output;
pub mod resolve;
pub mod status;

use crate::cli::clean::Clean;
use crate::cli::resolve::ResolveArgs;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, name = "depres", bin_name = "depres")]
pub struct CliArgs {
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve a library's transitive dependencies and download them
    Resolve(ResolveArgs),
    /// Remove every cached POM, metadata file and artifact
    Clean(Clean),
}

impl Command {
    /// Runs the command and returns the process exit code.
    pub async fn run(&self, config: &Config) -> Result<i32> {
        match self {
            Self::Resolve(command) => command.run(config).await,
            Self::Clean(command) => command.run(config).map(|_| 0),
        }
    }
}
