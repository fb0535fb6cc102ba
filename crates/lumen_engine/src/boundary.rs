//! # Engine Boundary
//!
//! The synchronous call surface between the host and the native engine.
//!
//! ```text
//! init ──> ( resize | query needs | push_* | handle_event | update )* ──> shutdown
//!                                                            │
//!                                      on_ray_trace_repaint <┘ (0..n times)
//! ```
//!
//! All calls are made from the render thread, one at a time. The engine may
//! call back into the host through [`RayTraceRepaint`] while `update` runs.

use std::path::PathBuf;

use lumen_core::{
    EngineError, HostEvent, LocationFix, Orientation, PeripheralNeeds, VideoFrame, VideoMode,
};

/// Parameters for [`EngineBoundary::init`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InitParams {
    /// Surface width in pixels.
    pub width: u32,
    /// Surface height in pixels.
    pub height: u32,
    /// Display density.
    pub dots_per_inch: u32,
    /// Writable directory holding the extracted assets.
    pub asset_root: PathBuf,
}

/// Host callback the engine invokes to show intermediate ray-tracing output.
///
/// Implementations forward the repaint to the display path and swap buffers
/// before returning. The return value tells the engine whether to keep
/// tracing.
pub trait RayTraceRepaint {
    /// Repaints the current trace image. Returns `false` to stop tracing.
    fn on_ray_trace_repaint(&mut self) -> bool;
}

/// Repaint sink for callers that never trace.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRepaint;

impl RayTraceRepaint for NoRepaint {
    fn on_ray_trace_repaint(&mut self) -> bool {
        false
    }
}

/// The native engine as seen from the host.
///
/// The four needs getters are read together as one snapshot through
/// [`query_peripheral_needs`](Self::query_peripheral_needs).
pub trait EngineBoundary {
    /// Initializes the engine. Called once, before anything else.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the engine cannot start; this is fatal.
    fn init(&mut self, params: &InitParams) -> Result<(), EngineError>;

    /// Reports a new surface size.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] on engine failure.
    fn resize(&mut self, width: u32, height: u32) -> Result<(), EngineError>;

    /// Advances the engine by one tick. Returns whether a repaint is wanted.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] on engine failure; the tick is skipped.
    fn update(&mut self, repaint: &mut dyn RayTraceRepaint) -> Result<bool, EngineError>;

    /// Video source the engine wants.
    fn video_mode(&self) -> VideoMode;

    /// Index into the platform's list of capture sizes.
    fn video_size_index(&self) -> i32;

    /// Whether orientation updates are wanted.
    fn wants_orientation(&self) -> bool;

    /// Whether location updates are wanted.
    fn wants_location(&self) -> bool;

    /// Reads the four needs getters as one snapshot.
    fn query_peripheral_needs(&self) -> PeripheralNeeds {
        PeripheralNeeds {
            video_mode: self.video_mode(),
            video_size_index: self.video_size_index(),
            wants_orientation: self.wants_orientation(),
            wants_location: self.wants_location(),
        }
    }

    /// Delivers one decoded camera frame.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] on engine failure; the tick is skipped.
    fn push_video_frame(&mut self, frame: &VideoFrame) -> Result<(), EngineError>;

    /// Asks the engine to pull the next frame from its replay file.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] on engine failure; the tick is skipped.
    fn request_file_frame(&mut self) -> Result<(), EngineError>;

    /// Delivers the latest orientation reading.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] on engine failure.
    fn push_rotation(&mut self, _orientation: Orientation) -> Result<(), EngineError> {
        Ok(())
    }

    /// Delivers the latest location fix.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] on engine failure.
    fn push_location(&mut self, _fix: LocationFix) -> Result<(), EngineError> {
        Ok(())
    }

    /// Delivers an input event or platform report.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] on engine failure.
    fn handle_event(&mut self, _event: &HostEvent) -> Result<(), EngineError> {
        Ok(())
    }

    /// Stops the engine. Called once, last.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] on engine failure; the host only logs it.
    fn shutdown(&mut self) -> Result<(), EngineError>;
}
