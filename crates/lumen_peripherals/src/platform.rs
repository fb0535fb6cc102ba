//! Platform side of the peripherals: the producers the controller starts and stops.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use lumen_core::{Peripheral, PeripheralError, VideoMode};

/// A start or stop command sent to the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PeripheralCommand {
    /// Start the camera in `mode` at capture size `size_index`.
    StartCamera {
        /// Live camera mode.
        mode: VideoMode,
        /// Capture size index.
        size_index: i32,
    },
    /// Stop the camera.
    StopCamera,
    /// Start orientation updates.
    StartOrientation,
    /// Stop orientation updates.
    StopOrientation,
    /// Start location updates.
    StartLocation,
    /// Stop location updates.
    StopLocation,
}

impl PeripheralCommand {
    /// The peripheral this command addresses.
    #[must_use]
    pub const fn peripheral(self) -> Peripheral {
        match self {
            Self::StartCamera { .. } | Self::StopCamera => Peripheral::Camera,
            Self::StartOrientation | Self::StopOrientation => Peripheral::Orientation,
            Self::StartLocation | Self::StopLocation => Peripheral::Location,
        }
    }
}

impl fmt::Display for PeripheralCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartCamera { mode, size_index } => {
                write!(f, "start camera {mode:?} size {size_index}")
            }
            Self::StopCamera => f.write_str("stop camera"),
            Self::StartOrientation => f.write_str("start orientation"),
            Self::StopOrientation => f.write_str("stop orientation"),
            Self::StartLocation => f.write_str("start location"),
            Self::StopLocation => f.write_str("stop location"),
        }
    }
}

/// Start/stop effects on the device's producers.
///
/// Called only from the UI-affinity thread. Every call is fire-and-forget:
/// producers deliver data through their own slots, not through return values.
pub trait PeripheralPlatform {
    /// Starts the camera stream.
    ///
    /// # Errors
    ///
    /// Returns [`PeripheralError`] if the camera is denied or absent.
    fn start_camera(&mut self, mode: VideoMode, size_index: i32) -> Result<(), PeripheralError>;

    /// Stops the camera stream.
    ///
    /// # Errors
    ///
    /// Returns [`PeripheralError`] on platform failure.
    fn stop_camera(&mut self) -> Result<(), PeripheralError>;

    /// Starts orientation updates.
    ///
    /// # Errors
    ///
    /// Returns [`PeripheralError`] if the sensor is denied or absent.
    fn start_orientation(&mut self) -> Result<(), PeripheralError>;

    /// Stops orientation updates.
    ///
    /// # Errors
    ///
    /// Returns [`PeripheralError`] on platform failure.
    fn stop_orientation(&mut self) -> Result<(), PeripheralError>;

    /// Starts location updates.
    ///
    /// # Errors
    ///
    /// Returns [`PeripheralError`] if location is denied or absent.
    fn start_location(&mut self) -> Result<(), PeripheralError>;

    /// Stops location updates.
    ///
    /// # Errors
    ///
    /// Returns [`PeripheralError`] on platform failure.
    fn stop_location(&mut self) -> Result<(), PeripheralError>;

    /// Dispatches `command` to the matching method.
    ///
    /// # Errors
    ///
    /// Returns whatever the matching method returns.
    fn execute(&mut self, command: PeripheralCommand) -> Result<(), PeripheralError> {
        match command {
            PeripheralCommand::StartCamera { mode, size_index } => {
                self.start_camera(mode, size_index)
            }
            PeripheralCommand::StopCamera => self.stop_camera(),
            PeripheralCommand::StartOrientation => self.start_orientation(),
            PeripheralCommand::StopOrientation => self.stop_orientation(),
            PeripheralCommand::StartLocation => self.start_location(),
            PeripheralCommand::StopLocation => self.stop_location(),
        }
    }
}

#[derive(Debug, Default)]
struct RecorderState {
    commands: Vec<PeripheralCommand>,
    denied: Vec<Peripheral>,
}

/// Platform that records every command and performs nothing.
///
/// Peripherals can be marked denied to exercise the degradation path. Clones
/// share the same record.
#[derive(Clone, Debug, Default)]
pub struct RecordingPlatform {
    state: Arc<Mutex<RecorderState>>,
}

impl RecordingPlatform {
    /// Creates a platform where every peripheral is available.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every start of `peripheral` fail with `PermissionDenied`.
    pub fn deny(&self, peripheral: Peripheral) {
        let mut state = self.state.lock();
        if !state.denied.contains(&peripheral) {
            state.denied.push(peripheral);
        }
    }

    /// Lifts a previous [`deny`](Self::deny).
    pub fn allow(&self, peripheral: Peripheral) {
        self.state.lock().denied.retain(|p| *p != peripheral);
    }

    /// Commands received so far, including refused ones.
    #[must_use]
    pub fn commands(&self) -> Vec<PeripheralCommand> {
        self.state.lock().commands.clone()
    }

    /// Forgets recorded commands.
    pub fn clear(&self) {
        self.state.lock().commands.clear();
    }

    fn record(&self, command: PeripheralCommand) -> Result<(), PeripheralError> {
        let mut state = self.state.lock();
        state.commands.push(command);
        let peripheral = command.peripheral();
        let is_start = matches!(
            command,
            PeripheralCommand::StartCamera { .. }
                | PeripheralCommand::StartOrientation
                | PeripheralCommand::StartLocation
        );
        if is_start && state.denied.contains(&peripheral) {
            return Err(PeripheralError::PermissionDenied { peripheral });
        }
        Ok(())
    }
}

impl PeripheralPlatform for RecordingPlatform {
    fn start_camera(&mut self, mode: VideoMode, size_index: i32) -> Result<(), PeripheralError> {
        self.record(PeripheralCommand::StartCamera { mode, size_index })
    }

    fn stop_camera(&mut self) -> Result<(), PeripheralError> {
        self.record(PeripheralCommand::StopCamera)
    }

    fn start_orientation(&mut self) -> Result<(), PeripheralError> {
        self.record(PeripheralCommand::StartOrientation)
    }

    fn stop_orientation(&mut self) -> Result<(), PeripheralError> {
        self.record(PeripheralCommand::StopOrientation)
    }

    fn start_location(&mut self) -> Result<(), PeripheralError> {
        self.record(PeripheralCommand::StartLocation)
    }

    fn stop_location(&mut self) -> Result<(), PeripheralError> {
        self.record(PeripheralCommand::StopLocation)
    }
}
