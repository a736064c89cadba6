// depres/src/cli/resolve.rs
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use colored::Colorize;
use depres_common::config::{Config, RangePolicy};
use depres_common::error::{DepresError, Result};
use depres_common::model::{Dependency, RepositoryList};
use depres_core::{BaselineFilter, DownloadOptions, Pipeline, StaticBaseline};
use depres_net::validation::validate_url;
use tracing::debug;

use crate::cli::output::{OutputCopier, ResolutionReport};
use crate::cli::status;

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Group id of the library to resolve
    #[arg(short, long, requires = "artifact_id", conflicts_with = "dependency")]
    pub group_id: Option<String>,

    /// Artifact id of the library to resolve
    #[arg(short, long, requires = "group_id")]
    pub artifact_id: Option<String>,

    /// Version of the library; the repository's latest version when omitted
    #[arg(long, requires = "group_id")]
    pub version: Option<String>,

    /// Gradle declaration, e.g. "implementation 'g:a:v'" or plain "g:a:v"
    #[arg(short, long, required_unless_present = "group_id")]
    pub dependency: Option<String>,

    /// Directory receiving the downloaded files and dependencies.json
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Extra repository tried before the public defaults (repeatable)
    #[arg(short = 'r', long = "repository")]
    pub repositories: Vec<String>,

    /// Keep only classes.jar from downloaded AARs
    #[arg(short, long)]
    pub jar_only: bool,

    /// Skip libraries already bundled by the App Inventor runtime
    #[arg(long)]
    pub app_inventor_baseline: bool,

    /// Pick the metadata's latest version for ranges instead of the nearest match
    #[arg(long)]
    pub legacy_ranges: bool,

    /// Print the resolution report as JSON instead of progress output
    #[arg(long)]
    pub json: bool,
}

impl ResolveArgs {
    fn root_dependency(&self) -> Result<Dependency> {
        if let Some(notation) = &self.dependency {
            return Dependency::from_gradle_notation(notation);
        }
        match (&self.group_id, &self.artifact_id) {
            (Some(group_id), Some(artifact_id)) => Ok(Dependency::new(
                group_id.trim(),
                artifact_id.trim(),
                self.version.as_deref().unwrap_or_default().trim(),
            )),
            _ => Err(DepresError::Generic(
                "Either --dependency or both --group-id and --artifact-id are required".to_string(),
            )),
        }
    }

    fn download_options(&self) -> DownloadOptions {
        DownloadOptions {
            jar_only: self.jar_only,
            baseline: self
                .app_inventor_baseline
                .then(|| Arc::new(StaticBaseline::app_inventor()) as Arc<dyn BaselineFilter>),
        }
    }

    /// Returns 1 when the root library could not be found in any repository.
    pub async fn run(&self, config: &Config) -> Result<i32> {
        let root = self.root_dependency()?;
        for url in &self.repositories {
            validate_url(url)?;
        }

        let mut config = config.clone();
        if self.legacy_ranges {
            config = config.with_range_policy(RangePolicy::Latest);
        }
        let output_dir = self
            .output
            .clone()
            .unwrap_or_else(|| config.merged_dir().join(&root.artifact_id));
        debug!("Output directory: {}", output_dir.display());

        let pipeline = Pipeline::new(
            &config,
            RepositoryList::new(&self.repositories),
            self.download_options(),
        )?
        .with_post_processor(OutputCopier::new(&output_dir));

        let printer = (!self.json).then(|| tokio::spawn(status::handle_events(pipeline.subscribe())));

        let started = Instant::now();
        let result = pipeline.run(root.clone()).await;
        // Dropping the pipeline closes the event channel so the printer can finish.
        drop(pipeline);
        if let Some(printer) = printer {
            let _ = printer.await;
        }
        let output = result?;
        let elapsed = started.elapsed();

        if !output.resolution.found {
            eprintln!(
                "{} {} was not found in any repository. Tried:",
                "Error:".red().bold(),
                root.to_string().cyan()
            );
            for url in &output.resolution.attempted_urls {
                eprintln!("  {url}");
            }
            return Ok(1);
        }

        let report = ResolutionReport::new(&output);
        let report_path = report.write_to(&output_dir)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!(
                "{}{} {} dependencies, {} files in {} ({:.1}s)",
                "==> ".bold().blue(),
                "Resolved".bold(),
                output.resolution.dependencies.len(),
                output.files.len(),
                output_dir.display(),
                elapsed.as_secs_f64()
            );
            if report.missing > 0 {
                println!(
                    "{} {} artifacts were skipped or unavailable",
                    "Warning:".yellow(),
                    report.missing
                );
            }
            debug!("Report written to {}", report_path.display());
        }
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::{CliArgs, Command};

    fn parse(args: &[&str]) -> ResolveArgs {
        let cli = CliArgs::try_parse_from(args).unwrap();
        match cli.command {
            Command::Resolve(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn builds_root_from_coordinates() {
        let args = parse(&["depres", "resolve", "-g", "org.example", "-a", "lib", "--version", "1.2"]);
        let root = args.root_dependency().unwrap();
        assert_eq!(root, Dependency::new("org.example", "lib", "1.2"));
    }

    #[test]
    fn version_is_optional() {
        let args = parse(&["depres", "resolve", "-g", "org.example", "-a", "lib"]);
        assert!(!args.root_dependency().unwrap().has_version());
    }

    #[test]
    fn builds_root_from_gradle_notation() {
        let args = parse(&[
            "depres",
            "resolve",
            "-d",
            "implementation 'com.test:test:1.0'",
            "-r",
            "https://jitpack.io",
            "-j",
        ]);
        assert_eq!(args.root_dependency().unwrap(), Dependency::new("com.test", "test", "1.0"));
        assert_eq!(args.repositories, vec!["https://jitpack.io".to_string()]);
        assert!(args.download_options().jar_only);
        assert!(args.download_options().baseline.is_none());
    }

    #[test]
    fn root_is_required() {
        assert!(CliArgs::try_parse_from(["depres", "resolve"]).is_err());
        assert!(CliArgs::try_parse_from(["depres", "resolve", "-g", "org.example"]).is_err());
    }
}
