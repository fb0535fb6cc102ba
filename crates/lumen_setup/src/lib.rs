//! # Lumen Setup
//!
//! The one-shot step that runs before the engine exists: copy the bundled,
//! read-only asset folder into a writable location the engine can open with
//! ordinary file I/O.
//!
//! ```rust,ignore
//! let source = DirectorySource::new("/opt/app/bundle");
//! let report = extract(&source, Path::new("data"), Path::new("/var/lib/app"))?;
//! // report.root == "/var/lib/app/data"
//! ```

#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod destination;
pub mod extract;
pub mod source;

pub use destination::ScopedDestination;
pub use extract::{extract, ExtractionReport};
pub use source::{
    is_plain_relative, AssetEntry, AssetKind, AssetSource, DirectorySource, ManifestSource,
};
