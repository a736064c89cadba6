// depres/src/main.rs
use std::fs;
use std::process;

use clap::Parser;
use colored::Colorize;
use depres_common::config::Config;
use depres_common::error::{DepresError, Result as DepresResult};
use tracing::level_filters::LevelFilter;
use tracing::{debug, error};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::CliArgs;

fn init_logging(config: &Config, verbose: u8) {
    let level_filter = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let max_log_level = level_filter.into_level().unwrap_or(tracing::Level::INFO);

    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .with_env_var("DEPRES_LOG")
        .from_env_lossy();

    if verbose == 0 {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .without_time()
            .try_init();
        return;
    }

    let log_dir = config.logs_dir();
    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!(
            "{} Failed to create log directory {}: {}",
            "Error:".red().bold(),
            log_dir.display(),
            e
        );
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .without_time()
            .try_init();
        return;
    }

    let file_appender = tracing_appender::rolling::daily(&log_dir, "depres.log");
    let (non_blocking_appender, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_writer = std::io::stderr.with_max_level(max_log_level);
    let file_writer = non_blocking_appender.with_max_level(max_log_level);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(stderr_writer.and(file_writer))
        .with_ansi(true)
        .without_time()
        .try_init();

    // The appender flushes on drop; keep it for the life of the process.
    Box::leak(Box::new(guard));

    debug!(
        "Verbose logging enabled. Writing logs to: {}/depres.log",
        log_dir.display()
    );
}

#[tokio::main]
async fn main() -> DepresResult<()> {
    let cli_args = CliArgs::parse();

    let config = Config::load()
        .map_err(|e| DepresError::Config(format!("Could not load configuration: {e}")))?;

    init_logging(&config, cli_args.verbose);

    match cli_args.command.run(&config).await {
        Ok(0) => {
            debug!("Command completed successfully.");
            Ok(())
        }
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            process::exit(1);
        }
    }
}
