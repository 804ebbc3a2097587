// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes.

use serde::Serialize;
use std::time::Instant;

use crate::gc::{RepositoryReport, RunReport, RunTotals};
use crate::types::{Image, RepositoryName};

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn duration(&self) -> Option<f64> {
        self.start_time.map(|_| self.elapsed_secs())
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => {
                println!("{message}");
            }
            OutputMode::Json => self.json_line(&JsonEvent {
                event: "success",
                message,
                duration_secs: self.duration(),
            }),
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "error",
                    message,
                    duration_secs: self.duration(),
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }

    /// Print the images of a repository, newest first.
    pub fn images(&self, repository: &RepositoryName, images: &[Image]) {
        let mut sorted: Vec<&Image> = images.iter().collect();
        sorted.sort_by(|a, b| a.cmp_newest_first(b));

        match self.mode {
            OutputMode::Normal => {
                println!("{repository} ({} images)", images.len());
                for image in sorted {
                    println!("  {}", image_line(image));
                }
            }
            OutputMode::Quiet => {
                for image in sorted {
                    println!("{}", image.digest());
                }
            }
            OutputMode::Json => self.json_line(&JsonImages {
                event: "images",
                repository,
                images: sorted,
            }),
        }
    }

    /// Print one repository's outcome.
    pub fn repository(&self, report: &RepositoryReport) {
        match self.mode {
            OutputMode::Normal => {
                if let Some(ref error) = report.error {
                    println!("{}: skipped ({error})", report.repository);
                    return;
                }

                let verb = if report.dry_run { "would delete" } else { "deleted" };
                let affected = if report.dry_run {
                    report.marked_count()
                } else {
                    report.deleted_count()
                };
                println!(
                    "{}: {} evaluated, {} marked, {verb} {affected}, {} failed",
                    report.repository,
                    report.evaluated,
                    report.marked_count(),
                    report.failures.len()
                );

                if report.dry_run {
                    for image in &report.marked {
                        println!("  {}", image_line(image));
                    }
                }
                for failure in &report.failures {
                    println!(
                        "  {}... {}: {}",
                        failure.id.digest.short(),
                        failure.code,
                        failure.reason
                    );
                }
            }
            OutputMode::Quiet => {}
            OutputMode::Json => self.json_line(&JsonRepository {
                event: "repository",
                report,
            }),
        }
    }

    /// Print every repository followed by the run totals.
    pub fn run(&self, report: &RunReport) {
        for repository in &report.repositories {
            self.repository(repository);
        }

        let totals = report.totals();
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => self.success(&summary_line(&totals)),
            OutputMode::Json => self.json_line(&JsonSummary {
                event: "summary",
                totals,
                duration_secs: self.duration(),
            }),
        }
    }

    fn json_line<T: Serialize>(&self, value: &T) {
        if let Ok(json) = serde_json::to_string(value) {
            println!("{json}");
        }
    }
}

/// `YYYY-MM-DD HH:MM:SS: <digest16>... [tags]`
pub fn image_line(image: &Image) -> String {
    let tags: Vec<&str> = image.tags().collect();
    format!(
        "{}: {}... [{}]",
        image.pushed_at().format("%Y-%m-%d %H:%M:%S"),
        image.digest().short(),
        tags.join(", ")
    )
}

fn summary_line(totals: &RunTotals) -> String {
    let mut line = format!(
        "{} repositories, {} images evaluated, {} marked, {} deleted",
        totals.repositories, totals.evaluated, totals.marked, totals.deleted
    );
    if totals.failures > 0 {
        line.push_str(&format!(", {} failed", totals.failures));
    }
    if totals.unavailable > 0 {
        line.push_str(&format!(", {} skipped", totals.unavailable));
    }
    line
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[derive(Serialize)]
struct JsonImages<'a> {
    event: &'a str,
    repository: &'a RepositoryName,
    images: Vec<&'a Image>,
}

#[derive(Serialize)]
struct JsonRepository<'a> {
    event: &'a str,
    #[serde(flatten)]
    report: &'a RepositoryReport,
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    event: &'a str,
    #[serde(flatten)]
    totals: RunTotals,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}
