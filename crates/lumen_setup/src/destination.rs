//! Scoped ownership of the writable extraction target.
//!
//! ```text
//! acquire(path):  remove existing subtree ─> create empty dir
//!      │
//!      ├── commit()  ─> tree is kept
//!      └── drop      ─> partial tree is removed
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use lumen_core::SetupError;

/// An emptied destination directory, owned until committed.
#[derive(Debug)]
pub struct ScopedDestination {
    path: PathBuf,
    committed: bool,
}

impl ScopedDestination {
    /// Deletes anything at `path` and recreates it as an empty directory.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::ClearDestination`] if the old subtree cannot be
    /// removed, or [`SetupError::CreateDir`] if the directory cannot be made.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, SetupError> {
        let path = path.into();
        match fs::symlink_metadata(&path) {
            Ok(meta) => {
                let removed = if meta.is_dir() {
                    fs::remove_dir_all(&path)
                } else {
                    fs::remove_file(&path)
                };
                removed.map_err(|source| SetupError::ClearDestination {
                    path: path.clone(),
                    source,
                })?;
                tracing::debug!(path = %path.display(), "cleared previous extraction");
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(SetupError::ClearDestination { path, source });
            }
        }
        fs::create_dir_all(&path).map_err(|source| SetupError::CreateDir {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            path,
            committed: false,
        })
    }

    /// The destination directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keeps the tree and releases ownership.
    #[must_use]
    pub fn commit(mut self) -> PathBuf {
        self.committed = true;
        std::mem::take(&mut self.path)
    }
}

impl Drop for ScopedDestination {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(e) = fs::remove_dir_all(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove partial extraction");
        }
    }
}
