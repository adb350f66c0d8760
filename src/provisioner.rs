//! Creation of the category directories.
//!
//! Every category directory must exist before the first file is moved, so
//! provisioning runs once, synchronously, ahead of the walk.

use crate::category_table::CategoryTable;
use crate::error::{OrganizeError, OrganizeResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Ensures `root/<category>` exists for every category in `table`.
///
/// Directories that already exist are left alone. Returns the category
/// directory paths in sorted category order.
///
/// # Errors
///
/// * `OrganizeError::PermissionDenied` if the filesystem refuses to create a
///   directory; the error names the category path.
/// * `OrganizeError::Directory` for any other failure, including a regular
///   file occupying a category name.
///
/// # Examples
///
/// ```no_run
/// use srex::category_table::CategoryTable;
/// use srex::provisioner::ensure;
/// use std::path::Path;
///
/// let created = ensure(Path::new("/home/user/Downloads"), &CategoryTable::default())?;
/// println!("{} category directories ready", created.len());
/// # Ok::<(), srex::OrganizeError>(())
/// ```
pub fn ensure(root: &Path, table: &CategoryTable) -> OrganizeResult<Vec<PathBuf>> {
    let mut ready = Vec::new();

    for category in table.categories() {
        let category_path = root.join(category);

        if category_path.is_dir() {
            debug!(path = %category_path.display(), "category directory already present");
        } else {
            fs::create_dir_all(&category_path)
                .map_err(|e| OrganizeError::from_create_dir(category_path.clone(), e))?;
            info!(path = %category_path.display(), "created category directory");
        }

        ready.push(category_path);
    }

    Ok(ready)
}
