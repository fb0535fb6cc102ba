//! # Asset Sources
//!
//! Read-only views of the bundled asset tree. Each source classifies its own
//! entries:
//!
//! - [`DirectorySource`]: filesystem metadata
//! - [`ManifestSource`]: an explicit TOML listing over a directory
//!
//! Paths passed to a source are relative to its root.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

use lumen_core::SetupError;

/// Whether an entry is a file or a directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// Regular file.
    File,
    /// Directory.
    Dir,
}

/// One child of a listed directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetEntry {
    /// File name (single path component), kept as the OS reported it.
    pub name: OsString,
    /// Entry type.
    pub kind: AssetKind,
}

/// A read-only bundled asset tree.
pub trait AssetSource {
    /// Classifies `path`, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::Source`] if the source cannot be queried.
    fn kind(&self, path: &Path) -> Result<Option<AssetKind>, SetupError>;

    /// Lists the children of directory `dir`, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::Source`] if the directory cannot be listed.
    fn list(&self, dir: &Path) -> Result<Vec<AssetEntry>, SetupError>;

    /// Opens file `path` for reading.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::Source`] if the file cannot be opened.
    fn open(&self, path: &Path) -> Result<Box<dyn Read + '_>, SetupError>;

    /// Resolved identity of directory `dir`, used to detect linked cycles.
    /// Sources without links return `None`.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::Source`] if the directory cannot be resolved.
    fn canonical_dir(&self, _dir: &Path) -> Result<Option<PathBuf>, SetupError> {
        Ok(None)
    }
}

/// Returns whether `path` is non-empty and made only of plain names, so
/// joining it onto a root can never leave that root.
#[must_use]
pub fn is_plain_relative(path: &Path) -> bool {
    path.components().next().is_some()
        && path.components().all(|c| matches!(c, Component::Normal(_)))
}

fn source_error(path: &Path, source: io::Error) -> SetupError {
    SetupError::Source {
        path: path.to_path_buf(),
        source,
    }
}

/// Assets bundled as a plain directory.
#[derive(Clone, Debug)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    /// Creates a source rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The bundle root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetSource for DirectorySource {
    fn kind(&self, path: &Path) -> Result<Option<AssetKind>, SetupError> {
        match fs::metadata(self.root.join(path)) {
            Ok(meta) if meta.is_dir() => Ok(Some(AssetKind::Dir)),
            Ok(_) => Ok(Some(AssetKind::File)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(source_error(path, e)),
        }
    }

    fn list(&self, dir: &Path) -> Result<Vec<AssetEntry>, SetupError> {
        let full = self.root.join(dir);
        let mut entries = Vec::new();
        for entry in fs::read_dir(&full).map_err(|e| source_error(dir, e))? {
            let entry = entry.map_err(|e| source_error(dir, e))?;
            // Follows symlinks, so a linked directory is copied as a directory.
            let meta = fs::metadata(entry.path()).map_err(|e| source_error(&entry.path(), e))?;
            let kind = if meta.is_dir() {
                AssetKind::Dir
            } else {
                AssetKind::File
            };
            entries.push(AssetEntry {
                name: entry.file_name(),
                kind,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn open(&self, path: &Path) -> Result<Box<dyn Read + '_>, SetupError> {
        let file = File::open(self.root.join(path)).map_err(|e| source_error(path, e))?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn canonical_dir(&self, dir: &Path) -> Result<Option<PathBuf>, SetupError> {
        fs::canonicalize(self.root.join(dir))
            .map(Some)
            .map_err(|e| source_error(dir, e))
    }
}

/// On-disk manifest format.
///
/// ```toml
/// files = ["data/shaders/color.vert", "data/models/cube.obj"]
/// dirs = ["data/cache"]
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Manifest {
    files: Vec<PathBuf>,
    dirs: Vec<PathBuf>,
}

/// Assets listed by a manifest; file contents are read from a directory.
///
/// Parent directories of every listed file are implied.
#[derive(Clone, Debug)]
pub struct ManifestSource {
    root: PathBuf,
    entries: BTreeMap<PathBuf, AssetKind>,
}

impl ManifestSource {
    /// Parses a manifest from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::Manifest`] if the text is not a valid manifest,
    /// a path is absolute or escapes the root, or a path is listed both as a
    /// file and as a directory.
    pub fn from_toml(root: impl Into<PathBuf>, text: &str) -> Result<Self, SetupError> {
        let manifest: Manifest =
            toml::from_str(text).map_err(|e| SetupError::Manifest(e.to_string()))?;

        let mut entries = BTreeMap::new();
        for dir in &manifest.dirs {
            check_relative(dir)?;
            insert_with_parents(&mut entries, dir, AssetKind::Dir)?;
        }
        for file in &manifest.files {
            check_relative(file)?;
            insert_with_parents(&mut entries, file, AssetKind::File)?;
        }
        Ok(Self {
            root: root.into(),
            entries,
        })
    }

    /// Reads and parses the manifest file at `manifest_path`.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::Source`] if the file cannot be read, otherwise as
    /// [`from_toml`](Self::from_toml).
    pub fn load(root: impl Into<PathBuf>, manifest_path: &Path) -> Result<Self, SetupError> {
        let text = fs::read_to_string(manifest_path).map_err(|e| source_error(manifest_path, e))?;
        Self::from_toml(root, &text)
    }

    /// Number of listed entries, implied directories included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the manifest lists nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn check_relative(path: &Path) -> Result<(), SetupError> {
    if is_plain_relative(path) {
        Ok(())
    } else {
        Err(SetupError::Manifest(format!(
            "{} must be a relative path without `.` or `..`",
            path.display()
        )))
    }
}

fn insert_with_parents(
    entries: &mut BTreeMap<PathBuf, AssetKind>,
    path: &Path,
    kind: AssetKind,
) -> Result<(), SetupError> {
    let mut claim = |p: &Path, k: AssetKind| match entries.get(p).copied() {
        Some(existing) if existing != k => Err(SetupError::Manifest(format!(
            "{} listed both as a file and as a directory",
            p.display()
        ))),
        Some(_) => Ok(()),
        None => {
            entries.insert(p.to_path_buf(), k);
            Ok(())
        }
    };
    for parent in path.ancestors().skip(1) {
        if parent.as_os_str().is_empty() {
            break;
        }
        claim(parent, AssetKind::Dir)?;
    }
    claim(path, kind)
}

impl AssetSource for ManifestSource {
    fn kind(&self, path: &Path) -> Result<Option<AssetKind>, SetupError> {
        Ok(self.entries.get(path).copied())
    }

    fn list(&self, dir: &Path) -> Result<Vec<AssetEntry>, SetupError> {
        let entries = self
            .entries
            .iter()
            .filter(|(p, _)| p.parent() == Some(dir))
            .filter_map(|(p, kind)| {
                p.file_name().map(|name| AssetEntry {
                    name: name.to_os_string(),
                    kind: *kind,
                })
            })
            .collect();
        // BTreeMap iteration is already sorted by path.
        Ok(entries)
    }

    fn open(&self, path: &Path) -> Result<Box<dyn Read + '_>, SetupError> {
        if self.entries.get(path) != Some(&AssetKind::File) {
            return Err(source_error(
                path,
                io::Error::new(io::ErrorKind::NotFound, "not listed as a file in the manifest"),
            ));
        }
        let file = File::open(self.root.join(path)).map_err(|e| source_error(path, e))?;
        Ok(Box::new(BufReader::new(file)))
    }
}
