//! Command-line interface for srex.
//!
//! ```bash
//! # Sort ~/Downloads with the built-in categories
//! srex ~/Downloads
//!
//! # Preview only, with a custom configuration
//! srex ~/Downloads --dry-run --config sort.toml
//!
//! # Single-threaded, top-level files only, JSON summary
//! srex ~/Downloads -j 1 --recursion top-level --output json
//! ```

use crate::config::OrganizerConfig;
use crate::coordinator::{Organizer, RunOverrides};
use crate::error::{OrganizeError, OrganizeResult};
use crate::outcome::RunSummary;
use crate::output::{OutcomeLog, OutputFormatter, ProgressSink, SinkSet};
use crate::walker::RecursionPolicy;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prompt shown when no directory is given on the command line.
pub const DIRECTORY_PROMPT: &str = "Please enter the source directory to be monitored: ";

/// srex - sort the files of a directory into category subdirectories
#[derive(Parser, Debug)]
#[command(name = "srex")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to organize (prompted for when omitted)
    pub path: Option<PathBuf>,

    /// Configuration file (default: ./.srexrc.toml, then ~/.config/srex/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Show what would be moved without moving anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Number of worker threads (1 = sequential)
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Which subdirectories to descend into
    #[arg(short, long)]
    pub recursion: Option<Recursion>,

    /// Append every outcome to this log file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "pretty")]
    pub output: OutputFormat,

    /// Print every outcome and enable debug diagnostics
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Recursion {
    /// Everything except the category directories at the root (default)
    SkipCategories,
    /// Every subdirectory, category directories included
    All,
    /// Only files directly in the root
    TopLevel,
}

impl From<Recursion> for RecursionPolicy {
    fn from(recursion: Recursion) -> Self {
        match recursion {
            Recursion::SkipCategories => RecursionPolicy::SkipCategories,
            Recursion::All => RecursionPolicy::All,
            Recursion::TopLevel => RecursionPolicy::TopLevel,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Progress bar and colored summary
    Pretty,
    /// JSON summary for scripting
    Json,
}

/// Machine-readable result of a run.
#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    root: String,
    dry_run: bool,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<&'a RunSummary>,
}

/// Parses the process arguments and runs. Returns the process exit code.
pub fn run() -> i32 {
    let cli = Cli::parse();
    crate::init_tracing(cli.verbose);
    run_cli(&cli)
}

/// Runs an already parsed command line, reading the directory from stdin
/// when none was given.
pub fn run_cli(cli: &Cli) -> i32 {
    let stdin = io::stdin();
    run_cli_with_input(cli, &mut stdin.lock())
}

/// Like [`run_cli`], with the prompt answer read from `input`.
///
/// Per-file failures are reported but never change the exit code; only
/// fatal setup errors return 1.
pub fn run_cli_with_input(cli: &Cli, input: &mut dyn BufRead) -> i32 {
    let root = match source_directory(cli.path.as_deref(), input, &mut io::stderr()) {
        Ok(root) => root,
        Err(e) => return report_error(cli, Path::new(""), &e),
    };

    if cli.output == OutputFormat::Pretty {
        let mode = if cli.dry_run { " (dry run)" } else { "" };
        OutputFormatter::info(&format!("Organizing directory: {}{}", root.display(), mode));
    }

    match organize(cli, &root) {
        Ok(summary) => {
            match cli.output {
                OutputFormat::Pretty => OutputFormatter::summary(&summary, cli.dry_run),
                OutputFormat::Json => print_json(&JsonReport {
                    root: root.display().to_string(),
                    dry_run: cli.dry_run,
                    status: "completed",
                    error: None,
                    summary: Some(&summary),
                }),
            }
            0
        }
        Err(e) => report_error(cli, &root, &e),
    }
}

/// Loads the configuration, wires up the sinks and runs the organizer.
fn organize(cli: &Cli, root: &Path) -> OrganizeResult<RunSummary> {
    let config = OrganizerConfig::load(cli.config.as_deref())?;
    let mut organizer = Organizer::from_config(
        root,
        &config,
        RunOverrides {
            dry_run: cli.dry_run,
            workers: cli.workers,
            recursion: cli.recursion.map(Into::into),
        },
    )?;
    debug!(options = ?organizer.options(), "resolved run options");

    let mut sinks = SinkSet::new();
    sinks.push(match cli.output {
        OutputFormat::Pretty => Box::new(ProgressSink::new(cli.verbose)),
        OutputFormat::Json => Box::new(ProgressSink::hidden()),
    });
    if let Some(log_path) = cli.log_file.as_ref().or(config.run.log_file.as_ref()) {
        sinks.push(Box::new(OutcomeLog::open(log_path)?));
        organizer.exclude_path(log_path);
    }

    organizer.run(&sinks)
}

/// The directory to organize: `path` if given, otherwise one line of `input`.
///
/// The prompt is written to `prompt`, which the binary points at stderr so
/// stdout only ever carries the report.
///
/// # Errors
///
/// Returns `OrganizeError::Io` if writing the prompt or reading the answer
/// fails and `OrganizeError::InvalidRoot` if the answer is blank.
pub fn source_directory(
    path: Option<&Path>,
    input: &mut dyn BufRead,
    prompt: &mut dyn Write,
) -> OrganizeResult<PathBuf> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }

    let stdin_error = |source| OrganizeError::Io {
        path: PathBuf::from("<stdin>"),
        source,
    };
    write!(prompt, "{}", DIRECTORY_PROMPT).map_err(stdin_error)?;
    prompt.flush().map_err(stdin_error)?;

    let mut answer = String::new();
    input.read_line(&mut answer).map_err(stdin_error)?;

    let answer = answer.trim();
    if answer.is_empty() {
        return Err(OrganizeError::InvalidRoot {
            path: PathBuf::new(),
        });
    }
    Ok(PathBuf::from(answer))
}

fn report_error(cli: &Cli, root: &Path, error: &OrganizeError) -> i32 {
    match cli.output {
        OutputFormat::Pretty if error.is_fatal() => OutputFormatter::error(&error.to_string()),
        OutputFormat::Pretty => OutputFormatter::warning(&error.to_string()),
        OutputFormat::Json => print_json(&JsonReport {
            root: root.display().to_string(),
            dry_run: cli.dry_run,
            status: if error.is_fatal() { "failed" } else { "empty" },
            error: Some(error.to_string()),
            summary: None,
        }),
    }
    error.exit_code()
}

fn print_json(report: &JsonReport<'_>) {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{}", json),
        Err(e) => OutputFormatter::error(&format!("Failed to serialize report: {}", e)),
    }
}
