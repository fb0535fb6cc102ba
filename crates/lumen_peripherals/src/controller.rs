//! # Peripheral Controller
//!
//! Converges the running producers on the engine's needs with the fewest
//! platform commands.
//!
//! ```text
//! needs (every tick) ──> reconcile ──> diff against PeripheralState
//!                                          │
//!                    ┌─────────────────────┼─────────────────────┐
//!                    ▼                     ▼                     ▼
//!             camera (mode, size)     orientation on/off    location on/off
//! ```
//!
//! The three producers are reconciled independently. A refused command
//! leaves the recorded state untouched, so the next tick retries it.

use lumen_core::{PeripheralError, PeripheralNeeds, VideoMode};

use crate::platform::{PeripheralCommand, PeripheralPlatform};

/// A running camera stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CameraState {
    /// Live camera mode.
    pub mode: VideoMode,
    /// Capture size index it was started with.
    pub size_index: i32,
}

/// Producers currently running, as far as the controller knows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PeripheralState {
    /// Running camera, if any.
    pub camera: Option<CameraState>,
    /// Orientation updates active.
    pub orientation: bool,
    /// Location updates active.
    pub location: bool,
}

impl PeripheralState {
    /// State that exactly satisfies `needs`.
    #[must_use]
    pub fn satisfying(needs: &PeripheralNeeds) -> Self {
        Self {
            camera: needs.video_mode.is_live_camera().then_some(CameraState {
                mode: needs.video_mode,
                size_index: needs.video_size_index,
            }),
            orientation: needs.wants_orientation,
            location: needs.wants_location,
        }
    }

    /// Returns whether nothing is running.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.camera.is_none() && !self.orientation && !self.location
    }
}

/// Outcome of one reconcile pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Commands sent to the platform, in order, including refused ones.
    pub issued: Vec<PeripheralCommand>,
    /// Refusals; each leaves its producer in its previous state.
    pub failures: Vec<PeripheralError>,
}

impl ReconcileReport {
    /// Returns whether the pass issued no commands.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.issued.is_empty()
    }
}

/// Anything the render loop can hand its per-tick needs to.
pub trait NeedsReconciler {
    /// Submits this tick's needs. Must not block.
    fn submit(&mut self, needs: PeripheralNeeds);
}

/// Owns the platform and the record of what is running.
#[derive(Debug)]
pub struct PeripheralController<P> {
    platform: P,
    state: PeripheralState,
}

impl<P: PeripheralPlatform> PeripheralController<P> {
    /// Creates a controller with nothing running.
    #[must_use]
    pub fn new(platform: P) -> Self {
        Self {
            platform,
            state: PeripheralState::default(),
        }
    }

    /// What the controller believes is running.
    #[must_use]
    pub fn state(&self) -> PeripheralState {
        self.state
    }

    /// The platform.
    #[must_use]
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Converges running producers on `needs`.
    ///
    /// Issues nothing when the state already matches. A live camera in a
    /// different mode or size is stopped before the new one starts; if that
    /// stop is refused the start is not attempted.
    pub fn reconcile(&mut self, needs: PeripheralNeeds) -> ReconcileReport {
        let target = PeripheralState::satisfying(&needs);
        let mut report = ReconcileReport::default();

        if target.camera != self.state.camera {
            self.reconcile_camera(target.camera, &mut report);
        }

        if target.orientation != self.state.orientation {
            let command = if target.orientation {
                PeripheralCommand::StartOrientation
            } else {
                PeripheralCommand::StopOrientation
            };
            if self.issue(command, &mut report) {
                self.state.orientation = target.orientation;
            }
        }

        if target.location != self.state.location {
            let command = if target.location {
                PeripheralCommand::StartLocation
            } else {
                PeripheralCommand::StopLocation
            };
            if self.issue(command, &mut report) {
                self.state.location = target.location;
            }
        }

        report
    }

    /// Stops every running producer.
    pub fn shutdown_all(&mut self) -> ReconcileReport {
        let report = self.reconcile(PeripheralNeeds::IDLE);
        tracing::info!(
            commands = report.issued.len(),
            failures = report.failures.len(),
            "peripherals stopped"
        );
        report
    }

    fn reconcile_camera(&mut self, target: Option<CameraState>, report: &mut ReconcileReport) {
        if self.state.camera.is_some() {
            if !self.issue(PeripheralCommand::StopCamera, report) {
                return;
            }
            self.state.camera = None;
        }
        if let Some(camera) = target {
            let command = PeripheralCommand::StartCamera {
                mode: camera.mode,
                size_index: camera.size_index,
            };
            if self.issue(command, report) {
                self.state.camera = Some(camera);
            }
        }
    }

    fn issue(&mut self, command: PeripheralCommand, report: &mut ReconcileReport) -> bool {
        report.issued.push(command);
        match self.platform.execute(command) {
            Ok(()) => {
                tracing::debug!(%command, "peripheral command issued");
                true
            }
            Err(e) => {
                tracing::warn!(%command, error = %e, "peripheral unavailable");
                report.failures.push(e);
                false
            }
        }
    }
}

impl<P: PeripheralPlatform> NeedsReconciler for PeripheralController<P> {
    fn submit(&mut self, needs: PeripheralNeeds) {
        let _report = self.reconcile(needs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::RecordingPlatform;
    use lumen_core::Peripheral;

    fn camera(mode: VideoMode, size: i32) -> PeripheralNeeds {
        PeripheralNeeds {
            video_mode: mode,
            video_size_index: size,
            ..PeripheralNeeds::IDLE
        }
    }

    #[test]
    fn test_start_camera_and_orientation() {
        let platform = RecordingPlatform::new();
        let mut controller = PeripheralController::new(platform.clone());

        let report = controller.reconcile(PeripheralNeeds {
            wants_orientation: true,
            ..camera(VideoMode::PrimaryCamera, 0)
        });

        assert_eq!(
            report.issued,
            vec![
                PeripheralCommand::StartCamera {
                    mode: VideoMode::PrimaryCamera,
                    size_index: 0
                },
                PeripheralCommand::StartOrientation,
            ]
        );
        assert!(report.failures.is_empty());
        assert_eq!(platform.commands(), report.issued);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let platform = RecordingPlatform::new();
        let mut controller = PeripheralController::new(platform.clone());
        let needs = PeripheralNeeds {
            wants_location: true,
            ..camera(VideoMode::SecondaryCamera, 2)
        };

        controller.reconcile(needs);
        let before = platform.commands().len();
        for _ in 0..10 {
            assert!(controller.reconcile(needs).is_noop());
        }
        assert_eq!(platform.commands().len(), before);
    }

    #[test]
    fn test_mode_switch_stops_before_start() {
        let platform = RecordingPlatform::new();
        let mut controller = PeripheralController::new(platform.clone());

        controller.reconcile(camera(VideoMode::PrimaryCamera, 0));
        platform.clear();
        controller.reconcile(camera(VideoMode::SecondaryCamera, 0));

        assert_eq!(
            platform.commands(),
            vec![
                PeripheralCommand::StopCamera,
                PeripheralCommand::StartCamera {
                    mode: VideoMode::SecondaryCamera,
                    size_index: 0
                },
            ]
        );
    }

    #[test]
    fn test_size_change_restarts_camera() {
        let platform = RecordingPlatform::new();
        let mut controller = PeripheralController::new(platform.clone());

        controller.reconcile(camera(VideoMode::PrimaryCamera, 0));
        let report = controller.reconcile(camera(VideoMode::PrimaryCamera, 1));
        assert_eq!(report.issued.len(), 2);
        assert_eq!(
            controller.state().camera,
            Some(CameraState {
                mode: VideoMode::PrimaryCamera,
                size_index: 1
            })
        );
    }

    #[test]
    fn test_file_replay_stops_camera() {
        let platform = RecordingPlatform::new();
        let mut controller = PeripheralController::new(platform.clone());

        controller.reconcile(camera(VideoMode::PrimaryCamera, 0));
        let report = controller.reconcile(camera(VideoMode::FileReplay, 0));
        assert_eq!(report.issued, vec![PeripheralCommand::StopCamera]);
        assert!(controller.state().is_idle());
    }

    #[test]
    fn test_denied_camera_degrades_and_retries() {
        let platform = RecordingPlatform::new();
        platform.deny(Peripheral::Camera);
        let mut controller = PeripheralController::new(platform.clone());
        let needs = PeripheralNeeds {
            wants_orientation: true,
            ..camera(VideoMode::PrimaryCamera, 0)
        };

        let report = controller.reconcile(needs);
        assert_eq!(
            report.failures,
            vec![PeripheralError::PermissionDenied {
                peripheral: Peripheral::Camera
            }]
        );
        // The refusal does not stop the rest of the pass.
        assert!(controller.state().orientation);
        assert!(controller.state().camera.is_none());

        // Needs are re-evaluated every tick, so the start is retried.
        platform.allow(Peripheral::Camera);
        let retry = controller.reconcile(needs);
        assert_eq!(retry.issued.len(), 1);
        assert!(controller.state().camera.is_some());
    }

    #[test]
    fn test_shutdown_all_stops_everything() {
        let platform = RecordingPlatform::new();
        let mut controller = PeripheralController::new(platform.clone());
        controller.reconcile(PeripheralNeeds {
            video_mode: VideoMode::PrimaryCamera,
            video_size_index: 0,
            wants_orientation: true,
            wants_location: true,
        });

        let report = controller.shutdown_all();
        assert_eq!(
            report.issued,
            vec![
                PeripheralCommand::StopCamera,
                PeripheralCommand::StopOrientation,
                PeripheralCommand::StopLocation,
            ]
        );
        assert!(controller.state().is_idle());
        assert!(controller.shutdown_all().is_noop());
    }
}
