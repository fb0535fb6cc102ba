//! # Producer Inputs
//!
//! Everything producers hand to the render thread:
//!
//! ```text
//! camera thread       ──write──> FrameSlot<VideoFrame>   ─┐
//! orientation thread  ──write──> FrameSlot<Orientation>  ─┤
//! location thread     ──write──> FrameSlot<LocationFix>  ─┼──> RenderLoopDriver (one tick)
//! UI thread           ──try_send──> [ HostEvent FIFO ]   ─┘
//! ```
//!
//! Slots keep only the newest reading. Events are queued because input must
//! not be coalesced, but the queue is bounded and drops on overflow.

use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use lumen_core::{FrameSlot, HostEvent, LocationFix, Orientation, VideoFrame};

/// Producer-side handles. Cheap to clone.
#[derive(Clone, Debug)]
pub struct ProducerHandles {
    /// Camera frames.
    pub frames: Arc<FrameSlot<VideoFrame>>,
    /// Orientation readings.
    pub orientation: Arc<FrameSlot<Orientation>>,
    /// Location fixes.
    pub location: Arc<FrameSlot<LocationFix>>,
    events: Sender<HostEvent>,
}

impl ProducerHandles {
    /// Queues a host event for the next tick (non-blocking).
    ///
    /// Returns `false` if the queue is full or the driver is gone.
    pub fn post_event(&self, event: HostEvent) -> bool {
        match self.events.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                tracing::warn!(?event, "host event queue full, dropping event");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Render-side ends of the producer inputs.
#[derive(Debug)]
pub struct DriverInputs {
    pub(crate) frames: Arc<FrameSlot<VideoFrame>>,
    pub(crate) orientation: Arc<FrameSlot<Orientation>>,
    pub(crate) location: Arc<FrameSlot<LocationFix>>,
    pub(crate) events: Receiver<HostEvent>,
}

impl DriverInputs {
    /// Returns whether a camera frame is waiting.
    #[must_use]
    pub fn frame_pending(&self) -> bool {
        !self.frames.is_consumed()
    }
}

/// Creates connected producer and driver ends.
#[must_use]
pub fn input_channels(event_capacity: usize) -> (ProducerHandles, DriverInputs) {
    let frames = Arc::new(FrameSlot::new());
    let orientation = Arc::new(FrameSlot::new());
    let location = Arc::new(FrameSlot::new());
    let (tx, rx) = bounded(event_capacity.max(1));
    (
        ProducerHandles {
            frames: Arc::clone(&frames),
            orientation: Arc::clone(&orientation),
            location: Arc::clone(&location),
            events: tx,
        },
        DriverInputs {
            frames,
            orientation,
            location,
            events: rx,
        },
    )
}
