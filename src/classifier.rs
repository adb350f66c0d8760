//! Classification of single files into category directories.
//!
//! The classifier decides which category a file belongs to, computes its
//! destination under the root, and performs the move. It never overwrites:
//! a file that is already in place, or whose destination is taken, is
//! reported as skipped.

use crate::category_table::CategoryTable;
use crate::error::ClassifyError;
use crate::outcome::{ClassificationOutcome, SkipReason, file_name_of};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Moves files into `root/<category>/<file name>`.
///
/// Holds only shared references, so one classifier can be used from many
/// worker threads at once.
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    root: &'a Path,
    table: &'a CategoryTable,
    dry_run: bool,
}

impl<'a> Classifier<'a> {
    /// Creates a classifier that moves files below `root`.
    ///
    /// Category directories are expected to exist already (see
    /// [`crate::provisioner::ensure`]).
    pub fn new(root: &'a Path, table: &'a CategoryTable) -> Self {
        Self {
            root,
            table,
            dry_run: false,
        }
    }

    /// In dry-run mode files are never moved; movable files yield
    /// [`ClassificationOutcome::Planned`].
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// The category directory and full destination for `file_path`.
    pub fn destination_for(&self, file_path: &Path) -> (PathBuf, PathBuf) {
        let category_dir = self.root.join(self.table.resolve_path(file_path));
        let destination = match file_path.file_name() {
            Some(name) => category_dir.join(name),
            None => category_dir.clone(),
        };
        (category_dir, destination)
    }

    /// Classifies one file and moves it into its category directory.
    ///
    /// # Returns
    ///
    /// * `Moved` when the file was renamed into place
    /// * `Skipped(AlreadyPlaced)` when the file already lives in its
    ///   category directory
    /// * `Skipped(DestinationOccupied)` when the destination name is taken;
    ///   neither file is touched
    /// * `Planned` instead of `Moved` in dry-run mode
    ///
    /// # Errors
    ///
    /// * `ClassifyError::NotFound` if the file does not exist at call time
    /// * `ClassifyError::PermissionDenied` if the rename is refused
    /// * `ClassifyError::MoveFailed` for any other rename failure
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use srex::category_table::CategoryTable;
    /// use srex::classifier::Classifier;
    /// use std::path::Path;
    ///
    /// let table = CategoryTable::default();
    /// let classifier = Classifier::new(Path::new("/data/inbox"), &table);
    /// match classifier.classify(Path::new("/data/inbox/photo.jpg")) {
    ///     Ok(outcome) => println!("{}", outcome),
    ///     Err(e) => eprintln!("{}", e),
    /// }
    /// ```
    pub fn classify(&self, file_path: &Path) -> Result<ClassificationOutcome, ClassifyError> {
        // symlink_metadata so a dangling link still counts as present
        if fs::symlink_metadata(file_path).is_err() {
            return Err(ClassifyError::NotFound {
                path: file_path.to_path_buf(),
            });
        }

        let category = self.table.resolve_path(file_path).to_string();
        let file_name = file_name_of(file_path);
        let (category_dir, destination) = self.destination_for(file_path);

        if file_path.parent() == Some(category_dir.as_path()) {
            debug!(file = %file_name, %category, "already in its category directory");
            return Ok(ClassificationOutcome::Skipped {
                file_name,
                category,
                reason: SkipReason::AlreadyPlaced,
            });
        }

        if let Ok(existing) = fs::symlink_metadata(&destination) {
            debug!(
                file = %file_name,
                %category,
                source_len = ?fs::metadata(file_path).map(|m| m.len()).ok(),
                existing_len = existing.len(),
                "destination already occupied"
            );
            return Ok(ClassificationOutcome::Skipped {
                file_name,
                category,
                reason: SkipReason::DestinationOccupied,
            });
        }

        if self.dry_run {
            return Ok(ClassificationOutcome::Planned {
                file_name,
                category,
            });
        }

        fs::rename(file_path, &destination).map_err(|e| {
            warn!(
                source = %file_path.display(),
                destination = %destination.display(),
                error = %e,
                "move failed"
            );
            move_error(file_path, &destination, e)
        })?;

        debug!(file = %file_name, %category, "moved");
        Ok(ClassificationOutcome::Moved {
            file_name,
            category,
        })
    }

    /// Like [`Classifier::classify`], but turns an error into a `Failed`
    /// outcome so callers can record it and carry on.
    pub fn outcome_for(&self, file_path: &Path) -> ClassificationOutcome {
        self.classify(file_path)
            .unwrap_or_else(|e| ClassificationOutcome::failed(file_path, &e))
    }
}

fn move_error(source: &Path, destination: &Path, error: io::Error) -> ClassifyError {
    match error.kind() {
        io::ErrorKind::PermissionDenied => ClassifyError::PermissionDenied {
            source_path: source.to_path_buf(),
            destination: destination.to_path_buf(),
        },
        io::ErrorKind::NotFound if fs::symlink_metadata(source).is_err() => {
            ClassifyError::NotFound {
                path: source.to_path_buf(),
            }
        }
        _ => ClassifyError::MoveFailed {
            source_path: source.to_path_buf(),
            destination: destination.to_path_buf(),
            cause: error,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::FailureKind;
    use crate::provisioner;
    use tempfile::TempDir;

    fn setup() -> (TempDir, CategoryTable) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let table = CategoryTable::default();
        provisioner::ensure(temp_dir.path(), &table).expect("Provisioning failed");
        (temp_dir, table)
    }

    #[test]
    fn test_classify_moves_known_extension() {
        let (temp_dir, table) = setup();
        let base_path = temp_dir.path();
        let file_path = base_path.join("photo.jpg");
        fs::write(&file_path, "image data").unwrap();

        let outcome = Classifier::new(base_path, &table)
            .classify(&file_path)
            .expect("Failed to classify file");

        assert_eq!(
            outcome,
            ClassificationOutcome::Moved {
                file_name: "photo.jpg".to_string(),
                category: "Images".to_string(),
            }
        );
        assert!(!file_path.exists());
        assert!(base_path.join("Images").join("photo.jpg").exists());
    }

    #[test]
    fn test_classify_unknown_extension_goes_to_fallback() {
        let (temp_dir, table) = setup();
        let base_path = temp_dir.path();
        let file_path = base_path.join("notes.xyz");
        fs::write(&file_path, "???").unwrap();

        let outcome = Classifier::new(base_path, &table)
            .classify(&file_path)
            .unwrap();

        assert_eq!(outcome.category(), Some("Others"));
        assert!(base_path.join("Others").join("notes.xyz").exists());
    }

    #[test]
    fn test_classify_upper_case_extension() {
        let (temp_dir, table) = setup();
        let base_path = temp_dir.path();
        let file_path = base_path.join("SONG.MP3");
        fs::write(&file_path, "audio").unwrap();

        Classifier::new(base_path, &table)
            .classify(&file_path)
            .unwrap();

        assert!(base_path.join("Audio").join("SONG.MP3").exists());
    }

    #[test]
    fn test_classify_nested_file_goes_to_root_category() {
        let (temp_dir, table) = setup();
        let base_path = temp_dir.path();
        fs::create_dir(base_path.join("trip")).unwrap();
        let file_path = base_path.join("trip").join("beach.png");
        fs::write(&file_path, "image").unwrap();

        Classifier::new(base_path, &table)
            .classify(&file_path)
            .unwrap();

        assert!(base_path.join("Images").join("beach.png").exists());
        assert!(!file_path.exists());
    }

    #[test]
    fn test_classify_twice_is_noop() {
        let (temp_dir, table) = setup();
        let base_path = temp_dir.path();
        let file_path = base_path.join("report.pdf");
        fs::write(&file_path, "pdf").unwrap();
        let classifier = Classifier::new(base_path, &table);

        classifier.classify(&file_path).unwrap();
        let placed = base_path.join("Documents").join("report.pdf");
        let second = classifier.classify(&placed).unwrap();

        assert_eq!(
            second,
            ClassificationOutcome::Skipped {
                file_name: "report.pdf".to_string(),
                category: "Documents".to_string(),
                reason: SkipReason::AlreadyPlaced,
            }
        );
        assert_eq!(fs::read_to_string(&placed).unwrap(), "pdf");
    }

    #[test]
    fn test_classify_never_overwrites_destination() {
        let (temp_dir, table) = setup();
        let base_path = temp_dir.path();
        let existing = base_path.join("Text").join("todo.txt");
        fs::write(&existing, "old list").unwrap();
        let file_path = base_path.join("todo.txt");
        fs::write(&file_path, "new list").unwrap();

        let outcome = Classifier::new(base_path, &table)
            .classify(&file_path)
            .unwrap();

        assert!(matches!(
            outcome,
            ClassificationOutcome::Skipped {
                reason: SkipReason::DestinationOccupied,
                ..
            }
        ));
        assert_eq!(fs::read_to_string(&existing).unwrap(), "old list");
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "new list");
    }

    #[test]
    fn test_classify_missing_file() {
        let (temp_dir, table) = setup();
        let file_path = temp_dir.path().join("ghost.jpg");

        let result = Classifier::new(temp_dir.path(), &table).classify(&file_path);

        match result {
            Err(ClassifyError::NotFound { path }) => assert_eq!(path, file_path),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_outcome_for_converts_errors() {
        let (temp_dir, table) = setup();
        let file_path = temp_dir.path().join("ghost.jpg");

        let outcome = Classifier::new(temp_dir.path(), &table).outcome_for(&file_path);

        match outcome {
            ClassificationOutcome::Failed {
                file_name, kind, ..
            } => {
                assert_eq!(file_name, "ghost.jpg");
                assert_eq!(kind, FailureKind::NotFound);
            }
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_category_directory_is_move_failed() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let table = CategoryTable::default();
        let file_path = temp_dir.path().join("clip.mp4");
        fs::write(&file_path, "video").unwrap();

        let result = Classifier::new(temp_dir.path(), &table).classify(&file_path);

        assert!(matches!(result, Err(ClassifyError::MoveFailed { .. })));
        assert!(file_path.exists());
    }

    #[test]
    fn test_dry_run_does_not_move() {
        let (temp_dir, table) = setup();
        let file_path = temp_dir.path().join("sheet.xlsx");
        fs::write(&file_path, "cells").unwrap();

        let outcome = Classifier::new(temp_dir.path(), &table)
            .dry_run(true)
            .classify(&file_path)
            .unwrap();

        assert_eq!(
            outcome,
            ClassificationOutcome::Planned {
                file_name: "sheet.xlsx".to_string(),
                category: "Spreadsheets".to_string(),
            }
        );
        assert!(file_path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_permission_denied_on_move() {
        use std::os::unix::fs::PermissionsExt;

        let (temp_dir, table) = setup();
        let locked = temp_dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        let file_path = locked.join("scan.pdf");
        fs::write(&file_path, "pdf").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

        // Privileged users bypass directory permissions.
        if fs::write(locked.join("write-check"), "x").is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let result = Classifier::new(temp_dir.path(), &table).classify(&file_path);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        match result {
            Err(ClassifyError::PermissionDenied {
                source_path,
                destination,
            }) => {
                assert_eq!(source_path, file_path);
                assert_eq!(destination, temp_dir.path().join("Documents").join("scan.pdf"));
            }
            other => panic!("expected PermissionDenied, got {:?}", other),
        }
        assert!(file_path.exists());
    }
}
