//! # UI-Affinity Dispatcher
//!
//! Peripheral start/stop must run on the UI thread. The render thread only
//! posts its needs and moves on.
//!
//! ```text
//! render thread                     "lumen-ui" thread
//! ─────────────                     ─────────────────
//! UiSender::submit(needs) ──try_send──> [ bounded FIFO ] ──> controller.reconcile(needs)
//!        (never blocks)                                            │
//!                                   failures <──────────────────────┘
//! ```
//!
//! A full queue drops the post with a warning; the next tick posts fresh
//! needs anyway. State converges at most one tick behind the engine.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;

use lumen_core::{HostError, HostResult, PeripheralError, PeripheralNeeds};

use crate::controller::{NeedsReconciler, PeripheralController, PeripheralState};
use crate::platform::PeripheralPlatform;

/// Name of the dispatcher thread.
pub const UI_THREAD_NAME: &str = "lumen-ui";

/// Capacity of the failure report channel.
const FAILURE_CAPACITY: usize = 64;

/// Work executed on the UI thread.
enum UiCommand {
    Reconcile(PeripheralNeeds),
    Barrier(Sender<()>),
    Shutdown,
}

/// Handle for posting needs to the UI thread. Cheap to clone.
#[derive(Clone, Debug)]
pub struct UiSender {
    sender: Sender<UiCommand>,
}

impl std::fmt::Debug for UiCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reconcile(needs) => f.debug_tuple("Reconcile").field(needs).finish(),
            Self::Barrier(_) => f.write_str("Barrier"),
            Self::Shutdown => f.write_str("Shutdown"),
        }
    }
}

impl UiSender {
    /// Posts needs for reconciliation (non-blocking).
    ///
    /// Returns `false` if the post was dropped.
    #[inline]
    pub fn post_reconcile(&self, needs: PeripheralNeeds) -> bool {
        match self.sender.try_send(UiCommand::Reconcile(needs)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!("ui command queue full, dropping needs update");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::warn!("ui thread gone, dropping needs update");
                false
            }
        }
    }
}

impl NeedsReconciler for UiSender {
    fn submit(&mut self, needs: PeripheralNeeds) {
        self.post_reconcile(needs);
    }
}

/// Owns the UI-affinity thread and the controller running on it.
#[derive(Debug)]
pub struct UiDispatcher {
    sender: Sender<UiCommand>,
    failures: Receiver<PeripheralError>,
    state: Arc<Mutex<PeripheralState>>,
    thread: Option<JoinHandle<()>>,
}

impl UiDispatcher {
    /// Spawns the UI thread with a command queue of `capacity` entries.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Spawn`] if the thread cannot be started.
    pub fn spawn<P>(platform: P, capacity: usize) -> HostResult<Self>
    where
        P: PeripheralPlatform + Send + 'static,
    {
        let (sender, receiver) = bounded(capacity.max(1));
        let (failure_tx, failures) = bounded(FAILURE_CAPACITY);
        let state = Arc::new(Mutex::new(PeripheralState::default()));

        let shared = Arc::clone(&state);
        let thread = thread::Builder::new()
            .name(UI_THREAD_NAME.into())
            .spawn(move || run(PeripheralController::new(platform), &receiver, &failure_tx, &shared))
            .map_err(|source| HostError::Spawn {
                name: UI_THREAD_NAME,
                source,
            })?;

        tracing::debug!(capacity, "ui dispatcher started");
        Ok(Self {
            sender,
            failures,
            state,
            thread: Some(thread),
        })
    }

    /// Creates a sender for the render thread.
    #[must_use]
    pub fn sender(&self) -> UiSender {
        UiSender {
            sender: self.sender.clone(),
        }
    }

    /// Producers running after the last processed command.
    #[must_use]
    pub fn state(&self) -> PeripheralState {
        *self.state.lock()
    }

    /// Drains reported peripheral failures (non-blocking).
    #[must_use]
    pub fn drain_failures(&self) -> Vec<PeripheralError> {
        self.failures.try_iter().collect()
    }

    /// Waits until every command posted before this call has run.
    ///
    /// Returns `false` on timeout or if the UI thread is gone.
    pub fn flush(&self, timeout: Duration) -> bool {
        let (tx, rx) = bounded(1);
        if self.sender.send_timeout(UiCommand::Barrier(tx), timeout).is_err() {
            return false;
        }
        rx.recv_timeout(timeout).is_ok()
    }

    /// Stops every producer and joins the UI thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        // Blocking send: shutdown must not be dropped behind a full queue.
        if self.sender.send(UiCommand::Shutdown).is_err() {
            tracing::warn!("ui thread exited before shutdown");
        }
        if thread.join().is_err() {
            tracing::error!("ui thread panicked");
        }
    }
}

impl Drop for UiDispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run<P: PeripheralPlatform>(
    mut controller: PeripheralController<P>,
    commands: &Receiver<UiCommand>,
    failures: &Sender<PeripheralError>,
    state: &Mutex<PeripheralState>,
) {
    let publish = |controller: &PeripheralController<P>, report: crate::ReconcileReport| {
        *state.lock() = controller.state();
        for failure in report.failures {
            // Reports are advisory; a full channel drops the report, never state.
            let _ = failures.try_send(failure);
        }
    };

    for command in commands {
        match command {
            UiCommand::Reconcile(needs) => {
                let report = controller.reconcile(needs);
                publish(&controller, report);
            }
            UiCommand::Barrier(done) => {
                let _ = done.send(());
            }
            UiCommand::Shutdown => {
                let report = controller.shutdown_all();
                publish(&controller, report);
                break;
            }
        }
    }
    tracing::debug!("ui dispatcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{PeripheralCommand, RecordingPlatform};
    use lumen_core::{Peripheral, VideoMode};

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_posts_run_in_fifo_order() {
        let platform = RecordingPlatform::new();
        let dispatcher = UiDispatcher::spawn(platform.clone(), 16).unwrap();
        let sender = dispatcher.sender();

        let camera = PeripheralNeeds {
            video_mode: VideoMode::PrimaryCamera,
            ..PeripheralNeeds::IDLE
        };
        assert!(sender.post_reconcile(camera));
        assert!(sender.post_reconcile(PeripheralNeeds::IDLE));
        assert!(sender.post_reconcile(PeripheralNeeds {
            wants_location: true,
            ..PeripheralNeeds::IDLE
        }));
        assert!(dispatcher.flush(WAIT));

        assert_eq!(
            platform.commands(),
            vec![
                PeripheralCommand::StartCamera {
                    mode: VideoMode::PrimaryCamera,
                    size_index: 0
                },
                PeripheralCommand::StopCamera,
                PeripheralCommand::StartLocation,
            ]
        );
        assert!(dispatcher.state().location);
    }

    #[test]
    fn test_failures_are_reported_upward() {
        let platform = RecordingPlatform::new();
        platform.deny(Peripheral::Location);
        let dispatcher = UiDispatcher::spawn(platform, 4).unwrap();

        let mut sender = dispatcher.sender();
        sender.submit(PeripheralNeeds {
            wants_location: true,
            ..PeripheralNeeds::IDLE
        });
        assert!(dispatcher.flush(WAIT));

        assert_eq!(
            dispatcher.drain_failures(),
            vec![PeripheralError::PermissionDenied {
                peripheral: Peripheral::Location
            }]
        );
        assert!(!dispatcher.state().location);
    }

    #[test]
    fn test_shutdown_stops_running_producers() {
        let platform = RecordingPlatform::new();
        let dispatcher = UiDispatcher::spawn(platform.clone(), 4).unwrap();
        dispatcher.sender().post_reconcile(PeripheralNeeds {
            wants_orientation: true,
            ..PeripheralNeeds::IDLE
        });
        dispatcher.shutdown();

        assert_eq!(
            platform.commands(),
            vec![
                PeripheralCommand::StartOrientation,
                PeripheralCommand::StopOrientation
            ]
        );
    }

    #[test]
    fn test_post_after_shutdown_is_dropped() {
        let dispatcher = UiDispatcher::spawn(RecordingPlatform::new(), 4).unwrap();
        let sender = dispatcher.sender();
        dispatcher.shutdown();
        assert!(!sender.post_reconcile(PeripheralNeeds::IDLE));
    }
}
