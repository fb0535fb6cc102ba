//! Display surface seen from the render thread.

use lumen_core::SurfaceError;

/// The render thread's drawing surface and its rendering context.
///
/// Only the thread the context is current on may paint or swap.
pub trait DisplaySurface {
    /// Returns whether the rendering context is current on the calling thread.
    fn is_current(&self) -> bool;

    /// Draws every view into the back buffer.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError`] if drawing fails.
    fn paint_views(&mut self) -> Result<(), SurfaceError>;

    /// Presents the back buffer.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError`] if the swap fails.
    fn swap_buffers(&mut self) -> Result<(), SurfaceError>;
}

/// A surface with no display behind it.
///
/// Counts paints and swaps. Becomes current on the thread that calls
/// [`make_current`](Self::make_current).
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    owner: Option<std::thread::ThreadId>,
    paints: u64,
    swaps: u64,
    fail_swaps: bool,
}

impl HeadlessSurface {
    /// Creates a surface that is not current anywhere.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the surface current on the calling thread.
    pub fn make_current(&mut self) {
        self.owner = Some(std::thread::current().id());
    }

    /// Detaches the surface from every thread.
    pub fn release(&mut self) {
        self.owner = None;
    }

    /// Makes every subsequent swap fail (for fault injection).
    pub fn fail_swaps(&mut self, fail: bool) {
        self.fail_swaps = fail;
    }

    /// Number of completed paints.
    #[must_use]
    pub fn paints(&self) -> u64 {
        self.paints
    }

    /// Number of completed swaps.
    #[must_use]
    pub fn swaps(&self) -> u64 {
        self.swaps
    }
}

impl DisplaySurface for HeadlessSurface {
    fn is_current(&self) -> bool {
        self.owner == Some(std::thread::current().id())
    }

    fn paint_views(&mut self) -> Result<(), SurfaceError> {
        if !self.is_current() {
            return Err(SurfaceError::ContextNotCurrent);
        }
        self.paints += 1;
        Ok(())
    }

    fn swap_buffers(&mut self) -> Result<(), SurfaceError> {
        if !self.is_current() {
            return Err(SurfaceError::ContextNotCurrent);
        }
        if self.fail_swaps {
            return Err(SurfaceError::SwapFailed("injected swap failure".into()));
        }
        self.swaps += 1;
        Ok(())
    }
}
