//! Output formatting and outcome reporting.
//!
//! Everything the user sees goes through this module: the styled lines of
//! [`OutputFormatter`], the live progress bar, the run summary, and the
//! optional outcome log file. Per-file outcomes reach these through the
//! [`OutcomeSink`] trait, which the coordinator calls from a single thread.

use crate::error::{OrganizeError, OrganizeResult};
use crate::outcome::{ClassificationOutcome, RunSummary};
use chrono::Local;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Receives the outcome of every file in a run.
///
/// `on_outcome` is called exactly once per classified file. `on_start` and
/// `on_finish` bracket the run and are only called when there is something
/// to classify.
pub trait OutcomeSink {
    fn on_start(&self, _total: u64) {}

    fn on_outcome(&self, outcome: &ClassificationOutcome);

    fn on_finish(&self, _summary: &RunSummary) {}
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl OutcomeSink for NullSink {
    fn on_outcome(&self, _outcome: &ClassificationOutcome) {}
}

/// Forwards every event to each contained sink, in insertion order.
#[derive(Default)]
pub struct SinkSet {
    sinks: Vec<Box<dyn OutcomeSink>>,
}

impl SinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sink: Box<dyn OutcomeSink>) {
        self.sinks.push(sink);
    }

}

impl OutcomeSink for SinkSet {
    fn on_start(&self, total: u64) {
        for sink in &self.sinks {
            sink.on_start(total);
        }
    }

    fn on_outcome(&self, outcome: &ClassificationOutcome) {
        for sink in &self.sinks {
            sink.on_outcome(outcome);
        }
    }

    fn on_finish(&self, summary: &RunSummary) {
        for sink in &self.sinks {
            sink.on_finish(summary);
        }
    }
}

/// Terminal progress bar with one line per failure.
///
/// In verbose mode every outcome is printed, not only failures. Lines are
/// printed above the bar so it keeps redrawing cleanly.
pub struct ProgressSink {
    bar: ProgressBar,
    verbose: bool,
}

impl ProgressSink {
    pub fn new(verbose: bool) -> Self {
        Self {
            bar: OutputFormatter::create_progress_bar(0),
            verbose,
        }
    }

    /// A sink that tracks progress without drawing anything.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            verbose: false,
        }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl OutcomeSink for ProgressSink {
    fn on_start(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_message("Classifying files");
    }

    fn on_outcome(&self, outcome: &ClassificationOutcome) {
        self.bar.inc(1);
        match outcome {
            ClassificationOutcome::Failed { .. } => {
                self.bar.println(format!("{} {}", "✗".red(), outcome));
            }
            ClassificationOutcome::Skipped { .. } if self.verbose => {
                self.bar.println(format!("{} {}", "⚠".yellow(), outcome));
            }
            ClassificationOutcome::Moved { .. } | ClassificationOutcome::Planned { .. }
                if self.verbose =>
            {
                self.bar.println(format!("{} {}", "✓".green(), outcome));
            }
            _ => {}
        }
    }

    fn on_finish(&self, _summary: &RunSummary) {
        self.bar.finish_with_message("File classification completed.");
    }
}

/// Append-only, human-readable record of every outcome.
///
/// Each line reads `<timestamp> - <LEVEL> - <message>`. Write failures are
/// reported through `tracing` and do not interrupt the run.
pub struct OutcomeLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl OutcomeLog {
    /// Opens (or creates) the log at `path` for appending.
    ///
    /// # Errors
    ///
    /// Returns `OrganizeError::Io` if the file cannot be opened.
    pub fn open(path: &Path) -> OrganizeResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| OrganizeError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&self, level: &str, message: &str) {
        let line = format!(
            "{} - {} - {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            level,
            message
        );

        let Ok(mut file) = self.file.lock() else {
            warn!(path = %self.path.display(), "outcome log lock poisoned");
            return;
        };
        if let Err(e) = file.write_all(line.as_bytes()) {
            warn!(path = %self.path.display(), error = %e, "failed to write outcome log");
        }
    }
}

impl OutcomeSink for OutcomeLog {
    fn on_start(&self, total: u64) {
        self.write_line("INFO", &format!("Classifying {} files", total));
    }

    fn on_outcome(&self, outcome: &ClassificationOutcome) {
        let level = if outcome.is_failure() { "ERROR" } else { "INFO" };
        self.write_line(level, &outcome.to_string());
    }

    fn on_finish(&self, summary: &RunSummary) {
        self.write_line(
            "INFO",
            &format!(
                "Finished: {} moved, {} skipped, {} failed, {} planned",
                summary.moved, summary.skipped, summary.failed, summary.planned
            ),
        );
    }
}

/// Manages all CLI output with consistent styling and formatting.
///
/// This struct provides methods for:
/// - Success messages (green with ✓)
/// - Error messages (red with ✗)
/// - Warning messages (yellow with ⚠)
/// - Info messages (cyan)
/// - Progress bars and the run summary
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use srex::output::OutputFormatter;
    /// OutputFormatter::success("All files classified");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark, on stderr.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Creates a progress bar for `total` files.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use srex::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(100);
    /// pb.inc(1);
    /// pb.finish_with_message("Completed!");
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        let pb = ProgressBar::new(total);
        pb.set_style(style);
        pb
    }

    /// Prints the per-category table followed by the outcome counts and the
    /// list of failed files.
    pub fn summary(summary: &RunSummary, dry_run: bool) {
        Self::header(if dry_run { "PLANNED MOVES" } else { "SUMMARY" });

        let width = summary
            .per_category
            .keys()
            .map(|name| name.len())
            .max()
            .unwrap_or(0)
            .max(8); // "Category"

        println!(
            "{:<width$} | {}",
            "Category".bold(),
            "Files".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 10));

        for (category, count) in &summary.per_category {
            println!(
                "{:<width$} | {} {}",
                category,
                count.to_string().green(),
                file_word(*count),
                width = width
            );
        }

        let placed = if dry_run { summary.planned } else { summary.moved };
        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            placed.to_string().green().bold(),
            file_word(placed),
            width = width
        );

        println!();
        if summary.skipped > 0 {
            Self::warning(&format!("{} {} skipped", summary.skipped, file_word(summary.skipped)));
        }
        if summary.unreadable > 0 {
            Self::warning(&format!(
                "{} {} could not be read",
                summary.unreadable,
                if summary.unreadable == 1 { "entry" } else { "entries" }
            ));
        }
        if summary.has_failures() {
            Self::header("FAILED");
            for failure in &summary.failures {
                Self::error(&format!("{}: {}", failure.file_name, failure.reason));
            }
        } else if dry_run {
            Self::dry_run_notice(&format!(
                "{} {} would be moved",
                summary.planned,
                file_word(summary.planned)
            ));
        } else {
            Self::success(&format!(
                "Classified {} of {} {}",
                summary.succeeded(),
                summary.total,
                file_word(summary.total)
            ));
        }
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }
}

fn file_word(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}
