// depres/src/cli/status.rs
use std::collections::HashMap;
use std::time::Instant;

use colored::*;
use depres_common::pipeline::{MergeStage, PipelineEvent};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobStatus {
    Downloading,
    Downloaded,
    Skipped,
}

impl JobStatus {
    fn display_state(&self) -> &'static str {
        match self {
            JobStatus::Downloading => "downloading",
            JobStatus::Downloaded => "downloaded",
            JobStatus::Skipped => "skipped",
        }
    }

    fn slot_indicator(&self) -> String {
        match self {
            JobStatus::Downloading => " ↓".yellow().to_string(),
            JobStatus::Downloaded => " ✓".green().bold().to_string(),
            JobStatus::Skipped => " ·".dimmed().to_string(),
        }
    }

    fn colored_state(&self) -> ColoredString {
        match self {
            JobStatus::Downloading => self.display_state().yellow(),
            JobStatus::Downloaded => self.display_state().green(),
            JobStatus::Skipped => self.display_state().dimmed(),
        }
    }
}

struct StatusDisplay {
    jobs: HashMap<String, (usize, Instant)>,
    next_job_id: usize,
    poms_fetched: usize,
    start_time: Instant,
    logs_buffer: Vec<String>,
}

impl StatusDisplay {
    fn new() -> Self {
        Self {
            jobs: HashMap::new(),
            next_job_id: 1,
            poms_fetched: 0,
            start_time: Instant::now(),
            logs_buffer: Vec::new(),
        }
    }

    fn print_job(&mut self, target_id: &str, status: JobStatus, detail: Option<&str>) {
        let next_job_id = &mut self.next_job_id;
        let (job_id, started) = *self.jobs.entry(target_id.to_string()).or_insert_with(|| {
            let id = *next_job_id;
            *next_job_id += 1;
            (id, Instant::now())
        });
        let elapsed = match status {
            JobStatus::Downloading => String::new(),
            _ => format!("{:.1}s", started.elapsed().as_secs_f64()),
        };
        println!(
            "{:<6} {:<12} {} {:>6}{}{}",
            format!("#{job_id:02}").cyan(),
            status.colored_state(),
            target_id.cyan(),
            elapsed.dimmed(),
            status.slot_indicator(),
            detail.map(|d| format!(" {}", d.dimmed())).unwrap_or_default()
        );
    }

    fn handle(&mut self, event: PipelineEvent) {
        match event {
            PipelineEvent::ResolutionStarted { root, repositories } => {
                println!(
                    "{}{} {} ({} repositories)",
                    "==> ".bold().blue(),
                    "Resolving".bold(),
                    root.cyan(),
                    repositories
                );
            }
            PipelineEvent::PomDownloaded { .. } => self.poms_fetched += 1,
            PipelineEvent::PomDownloading { .. }
            | PipelineEvent::PomParsing { .. }
            | PipelineEvent::PomParsed { .. } => {}
            PipelineEvent::ResolutionFinished {
                found,
                dependency_count,
            } => {
                if found {
                    println!(
                        "{} {} dependencies ({} POMs fetched, {:.1}s)",
                        "Dependency resolution complete:".cyan(),
                        dependency_count,
                        self.poms_fetched,
                        self.start_time.elapsed().as_secs_f64()
                    );
                } else {
                    println!("{}", "Dependency resolution failed.".red().bold());
                }
            }
            PipelineEvent::DownloadStarted { total } => {
                println!(
                    "{}{} {} artifacts",
                    "==> ".bold().blue(),
                    "Downloading".bold(),
                    total
                );
            }
            PipelineEvent::FileDownloading { target_id, .. } => {
                self.print_job(&target_id, JobStatus::Downloading, None);
            }
            PipelineEvent::FileDownloaded { target_id, .. } => {
                self.print_job(&target_id, JobStatus::Downloaded, None);
            }
            PipelineEvent::FileSkipped { target_id, reason } => {
                self.print_job(&target_id, JobStatus::Skipped, Some(&reason));
            }
            PipelineEvent::DownloadFinished {
                downloaded,
                missing,
            } => {
                println!(
                    "{} {} downloaded, {} skipped or missing",
                    "Download complete:".cyan(),
                    downloaded.to_string().green(),
                    missing
                );
            }
            PipelineEvent::Merging { stage } => {
                println!("{} {}", "merge".blue(), merge_stage_label(stage));
            }
            PipelineEvent::MergeFinished { success } => {
                if success {
                    println!("{}", "Merge complete.".green());
                } else {
                    println!("{}", "Merge failed.".red().bold());
                }
            }
            PipelineEvent::LogInfo { message } => {
                println!("{}", message.dimmed());
            }
            PipelineEvent::LogWarn { message } => {
                self.logs_buffer
                    .push(format!("{} {}", "Warning:".yellow(), message));
            }
            PipelineEvent::LogError { message } => {
                self.logs_buffer
                    .push(format!("{} {}", "Error:".red().bold(), message));
            }
        }
    }

    fn flush_logs(&mut self) {
        if self.logs_buffer.is_empty() {
            return;
        }
        println!();
        for line in self.logs_buffer.drain(..) {
            eprintln!("{line}");
        }
    }
}

fn merge_stage_label(stage: MergeStage) -> &'static str {
    match stage {
        MergeStage::Start => "starting",
        MergeStage::MergeManifest => "merging manifests",
        MergeStage::MergeManifestSuccess => "manifests merged",
        MergeStage::MergeManifestFailed => "manifest merge failed",
        MergeStage::MergeClassFiles => "merging class files",
        MergeStage::MergeClassFilesSuccess => "class files merged",
        MergeStage::MergeResources => "merging resources",
        MergeStage::MergeResourcesSuccess => "resources merged",
    }
}

/// Prints pipeline progress until every sender of the channel is gone.
pub async fn handle_events(mut event_rx: broadcast::Receiver<PipelineEvent>) {
    let mut display = StatusDisplay::new();
    loop {
        match event_rx.recv().await {
            Ok(event) => display.handle(event),
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!("Status display lagged, {} events dropped", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
    display.flush_logs();
}
