//! # Render Loop Driver
//!
//! Runs one engine tick per redraw on the render thread.
//!
//! ```text
//!                 surface created               surface destroyed
//! Uninitialized ───────────────────> Ready ──┐ ─────────────────────┐
//!       ▲                              │     │                      ▼
//!       │                         tick │     │              ShuttingDown
//!       │                              ▼     │                      │
//!       │                           Running ─┘                      ▼
//!       └──────────── (re-created: Stopped ──> Ready) ──────── Stopped
//! ```
//!
//! ## Tick Order
//!
//! ```text
//! 1. query needs            (one snapshot of the four getters)
//! 2. submit needs           (reconciler; never blocks)
//! 3. request_file_frame     (FileReplay only)
//! 4. take frame slot        (push_video_frame if present)
//! 5. sensors, host events   (push_rotation, push_location, handle_event)
//! 6. update                 (may re-enter through the repaint hook)
//! 7. reschedule?            update == true && mode in {None, FileReplay}
//! ```
//!
//! Reconciliation always precedes the frame push, so a camera stopped this
//! tick is stopped before its last frame reaches the engine.

use std::path::PathBuf;
use std::time::Instant;

use lumen_core::{ErrorKind, HostError, HostResult, PeripheralNeeds, VideoMode};
use lumen_engine::{
    DisplaySurface, EngineBoundary, EngineHandle, GuardedEngine, InitParams, RayTraceSwitch,
    RepaintHook,
};
use lumen_peripherals::NeedsReconciler;

use crate::inputs::DriverInputs;
use crate::stats::TickStats;

/// Lifecycle of the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DriverState {
    /// No surface yet; the engine does not exist.
    Uninitialized,
    /// Engine initialized, no tick run yet.
    Ready,
    /// Ticking.
    Running,
    /// Teardown in progress.
    ShuttingDown,
    /// Engine shut down; may be re-created.
    Stopped,
}

/// Fixed parameters for every engine instance the driver creates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DriverConfig {
    /// Extracted asset root, reused across re-creations.
    pub asset_root: PathBuf,
    /// Display density.
    pub dots_per_inch: u32,
}

/// What one tick did.
#[derive(Debug)]
pub struct TickOutcome {
    /// Needs snapshot taken at the start of the tick.
    pub needs: PeripheralNeeds,
    /// Whether a camera frame was pushed.
    pub frame_pushed: bool,
    /// Whether `update` ran to completion.
    pub updated: bool,
    /// Whether the driver wants another tick without waiting for a frame.
    pub reschedule: bool,
    /// Ray-trace repaints presented during `update`.
    pub repaints: u32,
    /// The per-tick failure that cut the tick short, if any.
    pub failure: Option<HostError>,
}

/// Orders engine calls, peripheral reconciliation and input delivery.
pub struct RenderLoopDriver<E, R> {
    engine: GuardedEngine<E>,
    reconciler: R,
    inputs: DriverInputs,
    config: DriverConfig,
    switch: RayTraceSwitch,
    state: DriverState,
    stats: TickStats,
}

impl<E: EngineBoundary, R: NeedsReconciler> RenderLoopDriver<E, R> {
    /// Creates a driver; the engine is initialized on surface creation.
    #[must_use]
    pub fn new(engine: E, reconciler: R, inputs: DriverInputs, config: DriverConfig) -> Self {
        Self {
            engine: GuardedEngine::new(engine),
            reconciler,
            inputs,
            config,
            switch: RayTraceSwitch::new(),
            state: DriverState::Uninitialized,
            stats: TickStats::new(),
        }
    }

    /// Uses `switch` as the ray-trace cancellation flag, so a thread other
    /// than the render thread can stop a trace in progress.
    #[must_use]
    pub fn with_ray_trace_switch(mut self, switch: RayTraceSwitch) -> Self {
        self.switch = switch;
        self
    }

    /// Current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Tick statistics so far.
    #[must_use]
    pub fn stats(&self) -> TickStats {
        self.stats
    }

    /// Cancellation flag shared with the repaint hook.
    #[must_use]
    pub fn ray_trace_switch(&self) -> RayTraceSwitch {
        self.switch.clone()
    }

    /// The live engine handle, if any.
    #[must_use]
    pub fn engine_handle(&self) -> Option<&EngineHandle> {
        self.engine.handle()
    }

    /// The wrapped engine.
    #[must_use]
    pub fn engine(&self) -> &E {
        self.engine.inner()
    }

    /// The reconciler needs are submitted to.
    #[must_use]
    pub fn reconciler(&self) -> &R {
        &self.reconciler
    }

    /// Initializes the engine for a new surface.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::ProtocolMisuse`] unless the driver is
    /// `Uninitialized` or `Stopped`, or the fatal `init` failure.
    pub fn on_surface_created(&mut self, width: u32, height: u32) -> HostResult<EngineHandle> {
        if !matches!(self.state, DriverState::Uninitialized | DriverState::Stopped) {
            return Err(self.misuse("surface created while engine is live"));
        }
        let params = InitParams {
            width,
            height,
            dots_per_inch: self.config.dots_per_inch,
            asset_root: self.config.asset_root.clone(),
        };
        self.switch.arm();
        let handle = self.engine.init(&params)?;
        self.state = DriverState::Ready;
        Ok(handle)
    }

    /// Forwards a surface size change. The caller schedules one extra tick
    /// whatever the video mode.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::ProtocolMisuse`] if no engine is live. Engine
    /// failures are logged and counted, not returned.
    pub fn on_resize(&mut self, width: u32, height: u32) -> HostResult<()> {
        self.require_live("resize")?;
        match self.engine.resize(width, height) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::ProtocolMisuse => Err(e),
            Err(e) => {
                tracing::warn!(error = %e, width, height, "resize failed");
                Ok(())
            }
        }
    }

    /// Runs one tick.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::ProtocolMisuse`] if no engine is live or a call
    /// breaks the boundary protocol. Per-tick failures are reported in
    /// [`TickOutcome::failure`] instead.
    pub fn tick(&mut self, surface: &mut dyn DisplaySurface) -> HostResult<TickOutcome> {
        self.require_live("tick")?;
        self.state = DriverState::Running;
        let start = Instant::now();

        let needs = self.engine.query_peripheral_needs()?;
        self.reconciler.submit(needs);

        let mut outcome = TickOutcome {
            needs,
            frame_pushed: false,
            updated: false,
            reschedule: false,
            repaints: 0,
            failure: None,
        };

        match self.run_steps(&needs, surface, &mut outcome) {
            Ok(wants_repaint) => {
                outcome.reschedule = wants_repaint && needs.video_mode.self_schedules();
            }
            Err(e) if e.kind() == ErrorKind::ProtocolMisuse => return Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "tick skipped");
                outcome.failure = Some(e);
            }
        }

        self.stats.record(
            start.elapsed(),
            outcome.frame_pushed,
            outcome.reschedule,
            outcome.failure.is_some(),
        );
        tracing::trace!(
            mode = ?needs.video_mode,
            frame = outcome.frame_pushed,
            reschedule = outcome.reschedule,
            "tick"
        );
        Ok(outcome)
    }

    /// Stops the peripherals and shuts the engine down.
    ///
    /// Does nothing if no engine is live. A failing engine `shutdown` is
    /// logged only.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::ProtocolMisuse`] if called re-entrantly.
    pub fn shutdown(&mut self) -> HostResult<()> {
        match self.state {
            DriverState::Uninitialized | DriverState::Stopped => {
                tracing::debug!(state = ?self.state, "shutdown with no live engine");
                return Ok(());
            }
            DriverState::ShuttingDown => {
                return Err(self.misuse("shutdown re-entered"));
            }
            DriverState::Ready | DriverState::Running => {}
        }

        self.state = DriverState::ShuttingDown;
        self.switch.cancel();
        self.reconciler.submit(PeripheralNeeds::IDLE);

        let result = self.engine.shutdown();
        self.inputs.frames.clear();
        self.state = DriverState::Stopped;

        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::ProtocolMisuse => Err(e),
            Err(e) => {
                tracing::error!(error = %e, "engine shutdown failed");
                Ok(())
            }
        }
    }

    /// Steps 3 to 6. Returns `update`'s result.
    fn run_steps(
        &mut self,
        needs: &PeripheralNeeds,
        surface: &mut dyn DisplaySurface,
        outcome: &mut TickOutcome,
    ) -> HostResult<bool> {
        if needs.video_mode == VideoMode::FileReplay {
            self.engine.request_file_frame()?;
        }

        if let Some(frame) = self.inputs.frames.take_if_present() {
            self.engine.push_video_frame(&frame)?;
            outcome.frame_pushed = true;
        }

        // Readings are taken even when unwanted so a stale one is never delivered later.
        if let Some(orientation) = self.inputs.orientation.take_if_present() {
            if needs.wants_orientation {
                self.engine.push_rotation(orientation)?;
            }
        }
        if let Some(fix) = self.inputs.location.take_if_present() {
            if needs.wants_location {
                self.engine.push_location(fix)?;
            }
        }
        while let Ok(event) = self.inputs.events.try_recv() {
            self.engine.handle_event(&event)?;
        }

        let mut hook = RepaintHook::new(surface, &self.switch);
        let updated = self.engine.update(&mut hook);
        outcome.repaints = hook.repaints();
        let surface_error = hook.into_error();

        let wants_repaint = updated?;
        outcome.updated = true;
        if let Some(e) = surface_error {
            return Err(e.into());
        }
        Ok(wants_repaint)
    }

    fn require_live(&self, what: &str) -> HostResult<()> {
        match self.state {
            DriverState::Ready | DriverState::Running => Ok(()),
            state => Err(self.misuse(&format!("{what} in state {state:?}"))),
        }
    }

    fn misuse(&self, reason: &str) -> HostError {
        tracing::error!(state = ?self.state, %reason, "render loop protocol misuse");
        HostError::misuse(reason)
    }
}

impl<E, R> std::fmt::Debug for RenderLoopDriver<E, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderLoopDriver")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
