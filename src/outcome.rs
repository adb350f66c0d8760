//! Per-file outcomes and the run summary they add up to.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::error::ClassifyError;

/// Why a file was left where it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The file already lives in its category directory.
    AlreadyPlaced,
    /// Another file with the same name sits at the destination.
    DestinationOccupied,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyPlaced => write!(f, "already correctly placed"),
            Self::DestinationOccupied => write!(f, "destination already occupied"),
        }
    }
}

/// Kind of a per-file failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    PermissionDenied,
    MoveFailed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::MoveFailed => write!(f, "move failed"),
        }
    }
}

/// What happened to one file during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationOutcome {
    /// The file was moved into its category directory.
    Moved { file_name: String, category: String },
    /// The file was left untouched.
    Skipped {
        file_name: String,
        category: String,
        reason: SkipReason,
    },
    /// Classification failed; the file was not moved.
    Failed {
        file_name: String,
        kind: FailureKind,
        reason: String,
    },
    /// Dry run: the file would have been moved.
    Planned { file_name: String, category: String },
}

impl ClassificationOutcome {
    /// Builds the `Failed` outcome for a classification error on `path`.
    pub fn failed(path: &Path, error: &ClassifyError) -> Self {
        Self::Failed {
            file_name: file_name_of(path),
            kind: error.kind(),
            reason: error.to_string(),
        }
    }

    /// The resolved category, if classification got that far.
    pub fn category(&self) -> Option<&str> {
        match self {
            Self::Moved { category, .. }
            | Self::Skipped { category, .. }
            | Self::Planned { category, .. } => Some(category),
            Self::Failed { .. } => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl fmt::Display for ClassificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Moved {
                file_name,
                category,
            } => write!(f, "Moved {} to {}", file_name, category),
            Self::Skipped {
                file_name,
                category,
                reason,
            } => write!(f, "Skipped {} ({}): {}", file_name, category, reason),
            Self::Failed {
                file_name, reason, ..
            } => write!(f, "Failed {}: {}", file_name, reason),
            Self::Planned {
                file_name,
                category,
            } => write!(f, "Would move {} to {}", file_name, category),
        }
    }
}

/// One failed file, as kept in the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub file_name: String,
    pub kind: FailureKind,
    pub reason: String,
}

/// Aggregated result of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Files dispatched to the classifier.
    pub total: usize,
    pub moved: usize,
    pub skipped: usize,
    pub failed: usize,
    pub planned: usize,
    /// Moved (or, in a dry run, planned) files per category.
    pub per_category: BTreeMap<String, usize>,
    pub failures: Vec<FailureRecord>,
    /// Directory entries the walker could not read.
    pub unreadable: usize,
}

impl RunSummary {
    /// Adds one outcome to the tally.
    pub fn record(&mut self, outcome: &ClassificationOutcome) {
        self.total += 1;
        match outcome {
            ClassificationOutcome::Moved { category, .. } => {
                self.moved += 1;
                *self.per_category.entry(category.clone()).or_insert(0) += 1;
            }
            ClassificationOutcome::Planned { category, .. } => {
                self.planned += 1;
                *self.per_category.entry(category.clone()).or_insert(0) += 1;
            }
            ClassificationOutcome::Skipped { .. } => self.skipped += 1,
            ClassificationOutcome::Failed {
                file_name,
                kind,
                reason,
            } => {
                self.failed += 1;
                self.failures.push(FailureRecord {
                    file_name: file_name.clone(),
                    kind: *kind,
                    reason: reason.clone(),
                });
            }
        }
    }

    /// Files that ended in the right place (moved or already there).
    pub fn succeeded(&self) -> usize {
        self.moved + self.skipped
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// The final path component as a displayable string.
pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
