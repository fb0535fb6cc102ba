//! # Lumen Peripherals
//!
//! Keeps the camera and sensors running exactly when the engine wants them.
//!
//! - [`PeripheralController`]: minimal start/stop diff against recorded state
//! - [`UiDispatcher`]: runs the controller on the UI-affinity thread
//! - [`PeripheralPlatform`]: the device-side effects
//!
//! Failures never abort a pass. They are reported upward and retried on the
//! next tick because needs are re-evaluated every tick.

#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod controller;
pub mod dispatcher;
pub mod platform;

pub use controller::{
    CameraState, NeedsReconciler, PeripheralController, PeripheralState, ReconcileReport,
};
pub use dispatcher::{UiDispatcher, UiSender, UI_THREAD_NAME};
pub use platform::{PeripheralCommand, PeripheralPlatform, RecordingPlatform};
