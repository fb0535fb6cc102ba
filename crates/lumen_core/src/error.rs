//! # Host Error Types
//!
//! All errors that can cross a layer boundary in the host.
//!
//! ```text
//! SetupError       ─┐
//! PeripheralError  ─┤
//! EngineError      ─┼──> HostError ──> ErrorKind + is_fatal()
//! SurfaceError     ─┤
//! protocol misuse  ─┘
//! ```

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::needs::Peripheral;

/// Failures of the one-shot asset extraction step.
///
/// Every variant is fatal to startup: the engine is never initialized on top
/// of a partial extraction.
#[derive(Error, Debug)]
pub enum SetupError {
    /// The bundled asset source could not be listed or read.
    #[error("asset source unreadable at {path}: {source}")]
    Source {
        /// Path inside the bundle.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The requested asset folder does not exist in the bundle.
    #[error("asset folder {0} missing from bundle")]
    MissingFolder(PathBuf),

    /// The existing destination subtree could not be removed.
    #[error("failed to clear destination {path}: {source}")]
    ClearDestination {
        /// Destination directory.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A destination directory could not be created.
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A single file copy failed; extraction is aborted.
    #[error("failed to copy {from} to {to}: {source}")]
    Copy {
        /// Source path inside the bundle.
        from: PathBuf,
        /// Destination path.
        to: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The asset manifest is malformed or names an invalid path.
    #[error("invalid asset manifest: {0}")]
    Manifest(String),

    /// The asset folder is absolute or contains `.` or `..`, so its
    /// destination would not stay below the destination root.
    #[error("asset folder {0} must be a relative path without `.` or `..`")]
    InvalidFolder(PathBuf),

    /// A linked directory leads back to a directory being copied.
    #[error("directory cycle at {0}")]
    DirectoryCycle(PathBuf),
}

/// A platform peripheral refused or failed a start/stop command.
///
/// Never fatal: the controller retries on the next reconcile pass.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeripheralError {
    /// The user or the platform denied access.
    #[error("{peripheral} permission denied")]
    PermissionDenied {
        /// Which peripheral.
        peripheral: Peripheral,
    },

    /// The device has no such peripheral.
    #[error("{peripheral} not present on this device")]
    Absent {
        /// Which peripheral.
        peripheral: Peripheral,
    },

    /// Any other platform failure.
    #[error("{peripheral} failed: {reason}")]
    Failed {
        /// Which peripheral.
        peripheral: Peripheral,
        /// Platform-supplied reason.
        reason: String,
    },
}

impl PeripheralError {
    /// Returns the peripheral this error concerns.
    #[must_use]
    pub fn peripheral(&self) -> Peripheral {
        match self {
            Self::PermissionDenied { peripheral }
            | Self::Absent { peripheral }
            | Self::Failed { peripheral, .. } => *peripheral,
        }
    }
}

/// Names of the engine boundary calls, used to tag failures and misuse.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EngineCall {
    /// `init(width, height, dpi, asset_root)`.
    Init,
    /// `resize(width, height)`.
    Resize,
    /// `update() -> needs_repaint`.
    Update,
    /// The four needs getters, read as one snapshot.
    QueryNeeds,
    /// `push_video_frame(frame)`.
    PushVideoFrame,
    /// `request_file_frame()`.
    RequestFileFrame,
    /// `push_rotation(orientation)`.
    PushRotation,
    /// `push_location(fix)`.
    PushLocation,
    /// `handle_event(event)`.
    HandleEvent,
    /// `shutdown()`.
    Shutdown,
}

impl EngineCall {
    /// Returns the call name as written in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Resize => "resize",
            Self::Update => "update",
            Self::QueryNeeds => "query_peripheral_needs",
            Self::PushVideoFrame => "push_video_frame",
            Self::RequestFileFrame => "request_file_frame",
            Self::PushRotation => "push_rotation",
            Self::PushLocation => "push_location",
            Self::HandleEvent => "handle_event",
            Self::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for EngineCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A boundary call returned an error from the native side.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("engine call `{call}` failed: {reason}")]
pub struct EngineError {
    /// The call that failed.
    pub call: EngineCall,
    /// Engine-supplied reason.
    pub reason: String,
}

impl EngineError {
    /// Creates a new engine error.
    #[must_use]
    pub fn new(call: EngineCall, reason: impl Into<String>) -> Self {
        Self {
            call,
            reason: reason.into(),
        }
    }
}

/// Display-path failures during a repaint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// The rendering context is not current on the calling thread.
    #[error("rendering context is not current on this thread")]
    ContextNotCurrent,

    /// The back-to-front buffer swap failed.
    #[error("buffer swap failed: {0}")]
    SwapFailed(String),
}

/// A video frame was constructed with inconsistent dimensions or buffers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Width or height is zero.
    #[error("frame dimensions must be non-zero, got {width}x{height}")]
    EmptyDimensions {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },

    /// Packed buffer length does not match any supported pixel format.
    #[error("packed buffer of {actual} bytes does not fit {width}x{height} at 1, 3 or 4 bytes per pixel")]
    PackedSize {
        /// Frame width.
        width: u32,
        /// Frame height.
        height: u32,
        /// Buffer length.
        actual: usize,
    },

    /// A plane is too small for its stride layout.
    #[error("{plane} plane needs at least {required} bytes, got {actual}")]
    PlaneTooSmall {
        /// Plane name (`y`, `u` or `v`).
        plane: &'static str,
        /// Minimum length for the declared strides.
        required: usize,
        /// Actual length.
        actual: usize,
    },

    /// A plane declared a zero stride.
    #[error("{plane} plane has a zero stride")]
    ZeroStride {
        /// Plane name (`y`, `u` or `v`).
        plane: &'static str,
    },

    /// A plane's declared strides span more bytes than can be addressed.
    #[error("{plane} plane stride layout overflows")]
    LayoutOverflow {
        /// Plane name (`y`, `u` or `v`).
        plane: &'static str,
    },
}

/// Classification of a [`HostError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Asset extraction failed.
    SetupFailure,
    /// A camera or sensor is denied or absent.
    PeripheralUnavailable,
    /// A boundary call failed on the native side.
    EngineCallFailure,
    /// A call was made out of order or from the wrong thread.
    ProtocolMisuse,
    /// The display path failed.
    SurfaceFailure,
    /// The host configuration is invalid.
    InvalidConfig,
    /// A host thread could not be started.
    ThreadSpawn,
}

/// Umbrella error for the host.
#[derive(Error, Debug)]
pub enum HostError {
    /// Asset extraction failed.
    #[error("setup failed: {0}")]
    Setup(#[from] SetupError),

    /// A peripheral is unavailable.
    #[error("peripheral unavailable: {0}")]
    PeripheralUnavailable(#[from] PeripheralError),

    /// An engine boundary call failed.
    #[error(transparent)]
    EngineCall(#[from] EngineError),

    /// Programming-contract violation; indicates a synchronization bug.
    #[error("protocol misuse: {0}")]
    ProtocolMisuse(String),

    /// The display path failed.
    #[error("surface failure: {0}")]
    Surface(#[from] SurfaceError),

    /// The host configuration could not be loaded.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A host thread could not be started.
    #[error("failed to spawn thread {name}: {source}")]
    Spawn {
        /// Thread name.
        name: &'static str,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl HostError {
    /// Creates a protocol misuse error.
    #[must_use]
    pub fn misuse(reason: impl Into<String>) -> Self {
        Self::ProtocolMisuse(reason.into())
    }

    /// Returns the error kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Setup(_) => ErrorKind::SetupFailure,
            Self::PeripheralUnavailable(_) => ErrorKind::PeripheralUnavailable,
            Self::EngineCall(_) => ErrorKind::EngineCallFailure,
            Self::ProtocolMisuse(_) => ErrorKind::ProtocolMisuse,
            Self::Surface(_) => ErrorKind::SurfaceFailure,
            Self::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Self::Spawn { .. } => ErrorKind::ThreadSpawn,
        }
    }

    /// Returns whether the host cannot keep rendering after this error.
    ///
    /// Only `init` failures are fatal among engine calls; per-tick failures
    /// skip the tick and `shutdown` failures are logged.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Setup(_)
            | Self::ProtocolMisuse(_)
            | Self::InvalidConfig(_)
            | Self::Spawn { .. } => true,
            Self::EngineCall(e) => e.call == EngineCall::Init,
            Self::PeripheralUnavailable(_) | Self::Surface(_) => false,
        }
    }
}

/// Result type for host operations.
pub type HostResult<T> = Result<T, HostError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_init_failure_is_fatal() {
        let err: HostError = EngineError::new(EngineCall::Init, "no GL context").into();
        assert_eq!(err.kind(), ErrorKind::EngineCallFailure);
        assert!(err.is_fatal());
    }

    #[test]
    fn test_per_tick_failures_are_not_fatal() {
        for call in [EngineCall::Update, EngineCall::PushVideoFrame, EngineCall::Shutdown] {
            let err: HostError = EngineError::new(call, "boom").into();
            assert!(!err.is_fatal(), "{call} must not be fatal");
        }
    }

    #[test]
    fn test_peripheral_error_is_degradation() {
        let err: HostError = PeripheralError::PermissionDenied {
            peripheral: Peripheral::Camera,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::PeripheralUnavailable);
        assert!(!err.is_fatal());
        assert_eq!(
            err.to_string(),
            "peripheral unavailable: camera permission denied"
        );
    }

    #[test]
    fn test_misuse_is_fatal() {
        let err = HostError::misuse("update before init");
        assert_eq!(err.kind(), ErrorKind::ProtocolMisuse);
        assert!(err.is_fatal());
    }

    #[test]
    fn test_engine_error_message_names_call() {
        let err = EngineError::new(EngineCall::PushVideoFrame, "bad stride");
        assert_eq!(err.to_string(), "engine call `push_video_frame` failed: bad stride");
    }
}
