//! # Scripted Engine
//!
//! An [`EngineBoundary`] whose needs and repaint requests follow a fixed
//! script of phases. Used by the headless host and by tests.
//!
//! ```text
//! phase 0: 3 ticks  camera + orientation   repaint=false
//! phase 1: 2 ticks  file replay            repaint=true
//! phase 2: forever  idle                   repaint=false
//! ```
//!
//! Every boundary call is recorded in an [`EngineProbe`] that can be cloned
//! out before the engine moves to the render thread.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use lumen_core::{
    EngineCall, EngineError, HostEvent, LocationFix, Orientation, PeripheralNeeds, VideoFrame,
    VideoMode,
};

use crate::boundary::{EngineBoundary, InitParams, RayTraceRepaint};

/// One step of an engine script.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScriptPhase {
    /// Number of `update` calls spent in this phase. The last phase never ends.
    pub ticks: u32,
    /// Needs reported while this phase is active.
    pub needs: PeripheralNeeds,
    /// Value returned from `update`.
    pub repaint: bool,
    /// Ray-trace repaints requested inside each `update`.
    pub ray_trace_steps: u32,
}

impl Default for ScriptPhase {
    fn default() -> Self {
        Self {
            ticks: 1,
            needs: PeripheralNeeds::IDLE,
            repaint: false,
            ray_trace_steps: 0,
        }
    }
}

#[derive(Debug, Default)]
struct Journal {
    calls: Vec<EngineCall>,
    frames: Vec<(u32, u32)>,
    rotations: Vec<Orientation>,
    locations: Vec<LocationFix>,
    events: Vec<HostEvent>,
    repaints_continued: u64,
    init: Option<InitParams>,
}

/// Read-only view of what a [`ScriptedEngine`] has been asked to do.
#[derive(Clone, Debug, Default)]
pub struct EngineProbe {
    journal: Arc<Mutex<Journal>>,
}

impl EngineProbe {
    /// Boundary calls in order.
    #[must_use]
    pub fn calls(&self) -> Vec<EngineCall> {
        self.journal.lock().calls.clone()
    }

    /// Number of times `call` was made.
    #[must_use]
    pub fn count(&self, call: EngineCall) -> usize {
        self.journal.lock().calls.iter().filter(|c| **c == call).count()
    }

    /// Dimensions of every pushed frame.
    #[must_use]
    pub fn frames(&self) -> Vec<(u32, u32)> {
        self.journal.lock().frames.clone()
    }

    /// Orientations received.
    #[must_use]
    pub fn rotations(&self) -> Vec<Orientation> {
        self.journal.lock().rotations.clone()
    }

    /// Location fixes received.
    #[must_use]
    pub fn locations(&self) -> Vec<LocationFix> {
        self.journal.lock().locations.clone()
    }

    /// Host events received.
    #[must_use]
    pub fn events(&self) -> Vec<HostEvent> {
        self.journal.lock().events.clone()
    }

    /// Ray-trace repaints after which the host asked to continue.
    #[must_use]
    pub fn repaints_continued(&self) -> u64 {
        self.journal.lock().repaints_continued
    }

    /// Parameters of the most recent `init`.
    #[must_use]
    pub fn init_params(&self) -> Option<InitParams> {
        self.journal.lock().init.clone()
    }

    fn record(&self, call: EngineCall) {
        self.journal.lock().calls.push(call);
    }
}

/// A boundary implementation driven by a list of [`ScriptPhase`]s.
#[derive(Debug)]
pub struct ScriptedEngine {
    phases: Vec<ScriptPhase>,
    phase: usize,
    ticks_in_phase: u32,
    probe: EngineProbe,
    pending_failures: Vec<(EngineCall, String)>,
}

impl ScriptedEngine {
    /// Creates an engine that walks `phases` in order.
    ///
    /// An empty script behaves like [`ScriptedEngine::idle`].
    #[must_use]
    pub fn new(phases: Vec<ScriptPhase>) -> Self {
        let phases = if phases.is_empty() {
            vec![ScriptPhase::default()]
        } else {
            phases
        };
        Self {
            phases,
            phase: 0,
            ticks_in_phase: 0,
            probe: EngineProbe::default(),
            pending_failures: Vec::new(),
        }
    }

    /// An engine that never needs anything and never asks to repaint.
    #[must_use]
    pub fn idle() -> Self {
        Self::new(Vec::new())
    }

    /// An engine that reports the same needs and repaint flag forever.
    #[must_use]
    pub fn constant(needs: PeripheralNeeds, repaint: bool) -> Self {
        Self::new(vec![ScriptPhase {
            needs,
            repaint,
            ..ScriptPhase::default()
        }])
    }

    /// Returns a probe sharing this engine's journal.
    #[must_use]
    pub fn probe(&self) -> EngineProbe {
        self.probe.clone()
    }

    /// Boundary calls recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<EngineCall> {
        self.probe.calls()
    }

    /// Makes the next `call` fail with `reason`.
    pub fn fail_next(&mut self, call: EngineCall, reason: impl Into<String>) {
        self.pending_failures.push((call, reason.into()));
    }

    /// Index of the active phase.
    #[must_use]
    pub fn phase_index(&self) -> usize {
        self.phase
    }

    fn current(&self) -> &ScriptPhase {
        // `new` guarantees at least one phase and `advance` never passes the last.
        &self.phases[self.phase]
    }

    fn enter(&mut self, call: EngineCall) -> Result<(), EngineError> {
        self.probe.record(call);
        if let Some(pos) = self.pending_failures.iter().position(|(c, _)| *c == call) {
            let (_, reason) = self.pending_failures.remove(pos);
            return Err(EngineError::new(call, reason));
        }
        Ok(())
    }

    fn advance(&mut self) {
        self.ticks_in_phase += 1;
        let is_last = self.phase + 1 >= self.phases.len();
        if !is_last && self.ticks_in_phase >= self.current().ticks {
            self.phase += 1;
            self.ticks_in_phase = 0;
            tracing::debug!(phase = self.phase, "scripted engine entered next phase");
        }
    }
}

impl EngineBoundary for ScriptedEngine {
    fn init(&mut self, params: &InitParams) -> Result<(), EngineError> {
        self.enter(EngineCall::Init)?;
        self.phase = 0;
        self.ticks_in_phase = 0;
        self.probe.journal.lock().init = Some(params.clone());
        Ok(())
    }

    fn resize(&mut self, _width: u32, _height: u32) -> Result<(), EngineError> {
        self.enter(EngineCall::Resize)
    }

    fn update(&mut self, repaint: &mut dyn RayTraceRepaint) -> Result<bool, EngineError> {
        self.enter(EngineCall::Update)?;
        let steps = self.current().ray_trace_steps;
        for _ in 0..steps {
            if !repaint.on_ray_trace_repaint() {
                break;
            }
            self.probe.journal.lock().repaints_continued += 1;
        }
        let wants_repaint = self.current().repaint;
        self.advance();
        Ok(wants_repaint)
    }

    fn video_mode(&self) -> VideoMode {
        self.current().needs.video_mode
    }

    fn video_size_index(&self) -> i32 {
        self.current().needs.video_size_index
    }

    fn wants_orientation(&self) -> bool {
        self.current().needs.wants_orientation
    }

    fn wants_location(&self) -> bool {
        self.current().needs.wants_location
    }

    fn query_peripheral_needs(&self) -> PeripheralNeeds {
        self.probe.record(EngineCall::QueryNeeds);
        self.current().needs
    }

    fn push_video_frame(&mut self, frame: &VideoFrame) -> Result<(), EngineError> {
        self.enter(EngineCall::PushVideoFrame)?;
        self.probe
            .journal
            .lock()
            .frames
            .push((frame.width(), frame.height()));
        Ok(())
    }

    fn request_file_frame(&mut self) -> Result<(), EngineError> {
        self.enter(EngineCall::RequestFileFrame)
    }

    fn push_rotation(&mut self, orientation: Orientation) -> Result<(), EngineError> {
        self.enter(EngineCall::PushRotation)?;
        self.probe.journal.lock().rotations.push(orientation);
        Ok(())
    }

    fn push_location(&mut self, fix: LocationFix) -> Result<(), EngineError> {
        self.enter(EngineCall::PushLocation)?;
        self.probe.journal.lock().locations.push(fix);
        Ok(())
    }

    fn handle_event(&mut self, event: &HostEvent) -> Result<(), EngineError> {
        self.enter(EngineCall::HandleEvent)?;
        self.probe.journal.lock().events.push(event.clone());
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), EngineError> {
        self.enter(EngineCall::Shutdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::NoRepaint;

    fn camera() -> PeripheralNeeds {
        PeripheralNeeds {
            video_mode: VideoMode::PrimaryCamera,
            wants_orientation: true,
            ..PeripheralNeeds::IDLE
        }
    }

    #[test]
    fn test_phases_advance_after_their_ticks() {
        let mut engine = ScriptedEngine::new(vec![
            ScriptPhase {
                ticks: 2,
                needs: camera(),
                ..ScriptPhase::default()
            },
            ScriptPhase {
                repaint: true,
                ..ScriptPhase::default()
            },
        ]);

        assert_eq!(engine.query_peripheral_needs(), camera());
        assert!(!engine.update(&mut NoRepaint).unwrap());
        assert!(!engine.update(&mut NoRepaint).unwrap());
        assert_eq!(engine.phase_index(), 1);
        assert!(engine.query_peripheral_needs().is_idle());
        // The last phase never ends.
        for _ in 0..5 {
            assert!(engine.update(&mut NoRepaint).unwrap());
        }
        assert_eq!(engine.phase_index(), 1);
    }

    #[test]
    fn test_injected_failure_fires_once() {
        let mut engine = ScriptedEngine::idle();
        engine.fail_next(EngineCall::Update, "boom");

        let err = engine.update(&mut NoRepaint).unwrap_err();
        assert_eq!(err.call, EngineCall::Update);
        assert!(engine.update(&mut NoRepaint).is_ok());
        assert_eq!(engine.probe().count(EngineCall::Update), 2);
    }

    #[test]
    fn test_ray_trace_stops_when_host_says_stop() {
        struct StopAfter(u32);
        impl RayTraceRepaint for StopAfter {
            fn on_ray_trace_repaint(&mut self) -> bool {
                self.0 = self.0.saturating_sub(1);
                self.0 > 0
            }
        }

        let mut engine = ScriptedEngine::new(vec![ScriptPhase {
            ray_trace_steps: 10,
            ..ScriptPhase::default()
        }]);
        let mut host = StopAfter(3);
        engine.update(&mut host).unwrap();
        assert_eq!(engine.probe().repaints_continued(), 2);
    }
}
