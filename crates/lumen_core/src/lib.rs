//! # Lumen Core
//!
//! Shared vocabulary for the Lumen surface host:
//! - [`FrameSlot`]: the newest-wins hand-off between a capture producer and
//!   the render thread
//! - frame, sensor, peripheral-needs and host-event types
//! - the error kinds every layer reports through
//!
//! ## Architecture Rules
//!
//! 1. **One frame in flight** - a producer overwrites, it never queues
//! 2. **No blocking** - neither side of a slot ever waits on the other
//! 3. **No singletons** - every flag is owned by the component that needs it

#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod event;
pub mod frame;
pub mod needs;
pub mod sensor;
pub mod sync;

pub use error::{
    EngineCall, EngineError, ErrorKind, FrameError, HostError, HostResult, PeripheralError,
    SetupError, SurfaceError,
};
pub use event::{HostEvent, PointerButton};
pub use frame::{FrameData, PixelFormat, Plane, VideoFrame};
pub use needs::{Peripheral, PeripheralNeeds, VideoMode};
pub use sensor::{LocationFix, Orientation};
pub use sync::FrameSlot;
