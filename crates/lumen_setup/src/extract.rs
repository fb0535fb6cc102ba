//! # Asset Extraction
//!
//! Copies one folder of the bundled tree into a writable root:
//!
//! ```text
//! bundle/<folder>/...   ──extract──>   dest_root/<folder>/...
//! ```
//!
//! The destination subtree is deleted first, so the result never depends on
//! what a previous run left behind. Any failure aborts and removes the
//! partial copy; the next start retries from scratch.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use lumen_core::SetupError;

use crate::destination::ScopedDestination;
use crate::source::{is_plain_relative, AssetKind, AssetSource};

/// What an extraction produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Extracted folder, `dest_root/<folder>`.
    pub root: PathBuf,
    /// Files copied.
    pub files: u64,
    /// Directories created below the root.
    pub dirs: u64,
    /// Bytes copied.
    pub bytes: u64,
}

/// Extracts `folder` from `source` into `dest_root`.
///
/// # Errors
///
/// Returns [`SetupError::InvalidFolder`] if `folder` is absolute or contains
/// `.` or `..`, [`SetupError::MissingFolder`] if it is not a directory in the
/// bundle, [`SetupError::DirectoryCycle`] if a linked directory leads back to
/// one of its ancestors, or the first I/O failure encountered. Every error is
/// fatal to startup.
pub fn extract(
    source: &dyn AssetSource,
    folder: &Path,
    dest_root: &Path,
) -> Result<ExtractionReport, SetupError> {
    let start = Instant::now();
    // The destination subtree is deleted, so it must stay below dest_root.
    if !is_plain_relative(folder) {
        return Err(SetupError::InvalidFolder(folder.to_path_buf()));
    }
    if source.kind(folder)? != Some(AssetKind::Dir) {
        return Err(SetupError::MissingFolder(folder.to_path_buf()));
    }

    let scope = ScopedDestination::acquire(dest_root.join(folder))?;
    let mut report = ExtractionReport::default();
    copy_dir(source, folder, scope.path(), &mut Vec::new(), &mut report)?;
    report.root = scope.commit();

    tracing::info!(
        root = %report.root.display(),
        files = report.files,
        dirs = report.dirs,
        bytes = report.bytes,
        elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        "assets extracted"
    );
    Ok(report)
}

/// `ancestors` holds the resolved directories on the current copy path.
fn copy_dir(
    source: &dyn AssetSource,
    from: &Path,
    to: &Path,
    ancestors: &mut Vec<PathBuf>,
    report: &mut ExtractionReport,
) -> Result<(), SetupError> {
    let identity = source.canonical_dir(from)?;
    if let Some(id) = &identity {
        if ancestors.contains(id) {
            return Err(SetupError::DirectoryCycle(from.to_path_buf()));
        }
        ancestors.push(id.clone());
    }
    for entry in source.list(from)? {
        let src = from.join(&entry.name);
        let dst = to.join(&entry.name);
        match entry.kind {
            AssetKind::Dir => {
                std::fs::create_dir(&dst).map_err(|e| SetupError::CreateDir {
                    path: dst.clone(),
                    source: e,
                })?;
                report.dirs += 1;
                copy_dir(source, &src, &dst, ancestors, report)?;
            }
            AssetKind::File => {
                report.bytes += copy_file(source, &src, &dst)?;
                report.files += 1;
            }
        }
    }
    if identity.is_some() {
        ancestors.pop();
    }
    Ok(())
}

fn copy_file(source: &dyn AssetSource, src: &Path, dst: &Path) -> Result<u64, SetupError> {
    let copy_error = |e: io::Error| SetupError::Copy {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    };
    let mut reader = source.open(src)?;
    let mut writer = BufWriter::new(File::create(dst).map_err(copy_error)?);
    let bytes = io::copy(&mut reader, &mut writer).map_err(copy_error)?;
    writer.flush().map_err(copy_error)?;
    tracing::trace!(file = %src.display(), bytes, "asset copied");
    Ok(bytes)
}
