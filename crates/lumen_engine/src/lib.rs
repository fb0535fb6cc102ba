//! # Lumen Engine
//!
//! The host's side of the native engine boundary.
//!
//! ```text
//! RenderLoopDriver ──> GuardedEngine<E> ──> E: EngineBoundary
//!                                              │ update()
//!                          RepaintHook <───────┘ on_ray_trace_repaint()
//!                              │
//!                              └──> DisplaySurface: paint, swap
//! ```
//!
//! ## Architecture Rules
//!
//! 1. **Render thread only** - the guard binds the engine to the thread that
//!    called `init`
//! 2. **No locks across `update`** - the repaint hook re-enters on the same
//!    stack
//! 3. **Return-driven cancellation** - the repaint return value is the only
//!    stop signal the engine sees

#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod boundary;
pub mod guard;
pub mod repaint;
pub mod scripted;
pub mod surface;

pub use boundary::{EngineBoundary, InitParams, NoRepaint, RayTraceRepaint};
pub use guard::{EngineHandle, GuardedEngine};
pub use repaint::{RayTraceSwitch, RepaintHook};
pub use scripted::{EngineProbe, ScriptPhase, ScriptedEngine};
pub use surface::{DisplaySurface, HeadlessSurface};
