//! # Cross-Thread Hand-Off
//!
//! Producers (camera callback, sensor threads) run at their own rate. The
//! render thread consumes at most one item per tick.
//!
//! ```text
//! Producer:  write(f1)  write(f2)  write(f3)
//!                                       │
//! Slot:      [f1] ──> [f2] ──> [f3] ────┤   (older items are overwritten)
//!                                       ▼
//! Render:                         take_if_present() -> f3
//!                                 take_if_present() -> None
//! ```
//!
//! Latest wins. A slow renderer sees dropped frames, never stale ones.

mod frame_slot;

pub use frame_slot::FrameSlot;
