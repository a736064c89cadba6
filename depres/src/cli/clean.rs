//! Contains the logic for the `clean` command.
use clap::Args;
use colored::Colorize;
use depres_common::cache::Cache;
use depres_common::config::Config;
use depres_common::error::{DepresError, Result};
use dialoguer::Confirm;

#[derive(Args, Debug)]
pub struct Clean {
    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

impl Clean {
    pub fn run(&self, config: &Config) -> Result<()> {
        let cache = Cache::new(config)?;
        let dir = cache.get_dir().display().to_string();

        if !self.yes {
            let confirmed = Confirm::new()
                .with_prompt(format!("Remove everything cached under {dir}?"))
                .default(false)
                .interact()
                .map_err(|e| DepresError::Generic(format!("Confirmation prompt failed: {e}")))?;
            if !confirmed {
                println!("Nothing removed.");
                return Ok(());
            }
        }

        tracing::debug!("Clearing cache directory {}", dir);
        cache.clear_all()?;
        println!("{}{} {}", "==> ".bold().blue(), "Cleared".bold(), dir);
        Ok(())
    }
}
