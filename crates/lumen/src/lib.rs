//! # Lumen
//!
//! Frame orchestration and cross-thread synchronization for hosting a
//! native rendering engine.
//!
//! ## Architecture
//!
//! ```text
//!   camera / sensors            UI thread                 render thread
//!  ┌────────────────┐    ┌────────────────────┐    ┌──────────────────────────┐
//!  │ producer threads│   │ UiDispatcher        │   │ RenderLoopDriver          │
//!  │   write(frame) ─┼──>│ FrameSlot ──────────┼──>│  1 needs  2 submit ───────┼──┐
//!  │   redraw()     ─┼──>│                     │   │  3 file   4 frame         │  │
//!  └────────────────┘    │ controller.reconcile│<──┼──5 input  6 update        │  │
//!          ▲             └─────────┬──────────┘   │  7 reschedule?            │  │
//!          │   start/stop          │               └──────────────────────────┘  │
//!          └───────────────────────┘<─────────────── needs (async, FIFO) ────────┘
//! ```
//!
//! ## Architecture Rules
//!
//! 1. **Render thread owns the engine** - created, called and shut down there
//! 2. **UI thread owns the peripherals** - the render thread only posts
//! 3. **Latest frame wins** - producers overwrite, never queue
//! 4. **Tick when dirty** - live camera modes tick on frame arrival only

#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod driver;
pub mod host;
pub mod inputs;
pub mod logging;
pub mod render_thread;
pub mod stats;
pub mod synthetic;

pub use config::{HostConfig, DEFAULT_CONFIG_PATH};
pub use driver::{DriverConfig, DriverState, RenderLoopDriver, TickOutcome};
pub use host::{prepare_assets, Host};
pub use inputs::{input_channels, DriverInputs, ProducerHandles};
pub use render_thread::{RedrawRequester, RenderThread, SurfaceChannel, SurfaceEvent};
pub use stats::TickStats;
pub use synthetic::{PlatformContext, SyntheticPlatform};
