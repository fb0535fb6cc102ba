//! # Ray-Trace Repaint Hook
//!
//! While the engine traces inside `update`, it calls back into the host to
//! show partial results:
//!
//! ```text
//! render thread stack
//! ───────────────────────────────────────────────────────────
//! driver.tick()
//!   └─ engine.update(&mut hook)
//!        └─ hook.on_ray_trace_repaint()
//!             ├─ surface.paint_views()
//!             ├─ surface.swap_buffers()
//!             └─ return switch.is_running()   ─> engine keeps tracing?
//! ```
//!
//! The hook runs on the caller's stack and takes no locks, so it cannot
//! deadlock against anything held across `update`. Stopping the host clears
//! the [`RayTraceSwitch`] from any thread; the engine observes it at its next
//! callback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lumen_core::SurfaceError;

use crate::boundary::RayTraceRepaint;
use crate::surface::DisplaySurface;

/// Cross-thread cancellation flag for an in-progress ray trace.
#[derive(Clone, Debug)]
pub struct RayTraceSwitch {
    running: Arc<AtomicBool>,
}

impl RayTraceSwitch {
    /// Creates an armed switch.
    #[must_use]
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Allows tracing to continue.
    pub fn arm(&self) {
        self.running.store(true, Ordering::Release);
    }

    /// Asks any trace in progress to stop at its next repaint.
    pub fn cancel(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Returns whether tracing may continue.
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Default for RayTraceSwitch {
    fn default() -> Self {
        Self::new()
    }
}

/// [`RayTraceRepaint`] implementation that paints and swaps a [`DisplaySurface`].
pub struct RepaintHook<'a, S: DisplaySurface + ?Sized> {
    surface: &'a mut S,
    switch: &'a RayTraceSwitch,
    repaints: u32,
    error: Option<SurfaceError>,
}

impl<'a, S: DisplaySurface + ?Sized> RepaintHook<'a, S> {
    /// Creates a hook for one `update` call.
    #[must_use]
    pub fn new(surface: &'a mut S, switch: &'a RayTraceSwitch) -> Self {
        Self {
            surface,
            switch,
            repaints: 0,
            error: None,
        }
    }

    /// Number of repaints that reached the swap.
    #[must_use]
    pub fn repaints(&self) -> u32 {
        self.repaints
    }

    /// Consumes the hook, returning the first surface failure if any.
    #[must_use]
    pub fn into_error(self) -> Option<SurfaceError> {
        self.error
    }

    fn present(&mut self) -> Result<(), SurfaceError> {
        if !self.surface.is_current() {
            return Err(SurfaceError::ContextNotCurrent);
        }
        self.surface.paint_views()?;
        self.surface.swap_buffers()
    }
}

impl<S: DisplaySurface + ?Sized> RayTraceRepaint for RepaintHook<'_, S> {
    fn on_ray_trace_repaint(&mut self) -> bool {
        if self.error.is_some() {
            return false;
        }
        match self.present() {
            Ok(()) => {
                self.repaints += 1;
                self.switch.is_running()
            }
            Err(e) => {
                tracing::error!(error = %e, "ray-trace repaint failed, stopping trace");
                self.error = Some(e);
                false
            }
        }
    }
}
