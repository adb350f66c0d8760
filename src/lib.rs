//! srex - sort the files of a directory into category subdirectories
//!
//! Each file below a root directory is classified by its extension through a
//! [`CategoryTable`] and moved into `root/<category>/`. Files that are already
//! in place, or whose destination name is taken, are left alone. Runs can be
//! sequential or spread over a bounded worker pool, and every file's outcome
//! is reported through an [`OutcomeSink`].
//!
//! ```no_run
//! use srex::{CategoryTable, Organizer, RunOptions};
//! use srex::output::NullSink;
//!
//! let organizer = Organizer::new("/home/user/Downloads", CategoryTable::default(), RunOptions::default());
//! let summary = organizer.run(&NullSink)?;
//! println!("{} moved, {} failed", summary.moved, summary.failed);
//! # Ok::<(), srex::OrganizeError>(())
//! ```

pub mod category_table;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod outcome;
pub mod output;
pub mod provisioner;
pub mod walker;

pub use category_table::CategoryTable;
pub use classifier::Classifier;
pub use config::{CompiledFilters, ConfigError, OrganizerConfig};
pub use coordinator::{Organizer, RunOptions, RunOverrides};
pub use error::{ClassifyError, OrganizeError, OrganizeResult};
pub use outcome::{ClassificationOutcome, FailureKind, RunSummary, SkipReason};
pub use output::OutcomeSink;
pub use walker::{FileWalker, RecursionPolicy};

/// Installs the global tracing subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence; otherwise only warnings are shown, or debug
/// output for srex itself when `verbose` is set. Calling this twice is a
/// no-op.
pub fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "srex=debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
