//! # Render Thread
//!
//! The only thread that touches the engine or the display surface.
//!
//! ```text
//! UI thread ──SurfaceEvent──┐
//! producers ──redraw()──────┼──> [ bounded channel ] ──> render thread
//! self-schedule ────────────┘                               │
//!                                                           ├─ Created   -> driver.on_surface_created
//!                                                           ├─ Changed   -> driver.on_resize, tick due
//!                                                           ├─ Redraw    -> tick due
//!                                                           └─ Destroyed -> driver.shutdown
//! ```
//!
//! Pending events are drained before each tick, so lifecycle changes are
//! never starved by a self-scheduling engine. Redraw requests coalesce
//! through one atomic flag: while a request is queued, further requests are
//! no-ops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use parking_lot::Mutex;

use lumen_core::{HostError, HostResult};
use lumen_engine::{DisplaySurface, EngineBoundary, RayTraceSwitch};
use lumen_peripherals::NeedsReconciler;

use crate::driver::{DriverConfig, DriverState, RenderLoopDriver};
use crate::inputs::DriverInputs;
use crate::stats::TickStats;

/// Name of the render thread.
pub const RENDER_THREAD_NAME: &str = "lumen-render";

/// Surface lifecycle and redraw notifications.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// The surface exists; initialize the engine.
    Created {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
    /// The surface size changed.
    Changed {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
    /// Something new is worth a tick.
    RedrawRequested,
    /// The surface is gone; shut the engine down.
    Destroyed,
}

#[derive(Debug)]
enum Message {
    Surface(SurfaceEvent),
    Exit,
}

/// Coalescing redraw trigger. Cheap to clone.
#[derive(Clone, Debug)]
pub struct RedrawRequester {
    pending: Arc<AtomicBool>,
    sender: Sender<Message>,
}

impl RedrawRequester {
    /// Requests one tick. Returns `false` if a request was already pending
    /// or the render thread is gone.
    pub fn request(&self) -> bool {
        if self.pending.swap(true, Ordering::AcqRel) {
            return false;
        }
        match self.sender.try_send(Message::Surface(SurfaceEvent::RedrawRequested)) {
            Ok(()) => true,
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => {
                self.pending.store(false, Ordering::Release);
                false
            }
        }
    }

    /// Returns whether a request is queued and not yet seen.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

/// The surface event channel, created before the render thread so producers
/// can hold a [`RedrawRequester`] from the start.
#[derive(Debug)]
pub struct SurfaceChannel {
    sender: Sender<Message>,
    receiver: Receiver<Message>,
    pending: Arc<AtomicBool>,
}

impl SurfaceChannel {
    /// Creates a channel holding up to `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));
        Self {
            sender,
            receiver,
            pending: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Creates a redraw trigger.
    #[must_use]
    pub fn redraw_requester(&self) -> RedrawRequester {
        RedrawRequester {
            pending: Arc::clone(&self.pending),
            sender: self.sender.clone(),
        }
    }
}

/// Handle to the running render thread.
#[derive(Debug)]
pub struct RenderThread {
    sender: Sender<Message>,
    redraw: RedrawRequester,
    switch: RayTraceSwitch,
    state: Arc<Mutex<DriverState>>,
    stats: Arc<Mutex<TickStats>>,
    thread: Option<JoinHandle<HostResult<()>>>,
}

impl RenderThread {
    /// Spawns the render thread.
    ///
    /// `make_engine` and `make_surface` run on the new thread, so the engine
    /// and the surface's context never exist anywhere else.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Spawn`] if the thread cannot be started.
    pub fn spawn<E, S, R, FE, FS>(
        channel: SurfaceChannel,
        make_engine: FE,
        make_surface: FS,
        reconciler: R,
        inputs: DriverInputs,
        config: DriverConfig,
    ) -> HostResult<Self>
    where
        E: EngineBoundary + 'static,
        S: DisplaySurface + 'static,
        R: NeedsReconciler + Send + 'static,
        FE: FnOnce() -> E + Send + 'static,
        FS: FnOnce() -> S + Send + 'static,
    {
        let redraw = channel.redraw_requester();
        let switch = RayTraceSwitch::new();
        let state = Arc::new(Mutex::new(DriverState::Uninitialized));
        let stats = Arc::new(Mutex::new(TickStats::new()));
        let sender = channel.sender.clone();

        let loop_ctx = LoopContext {
            receiver: channel.receiver,
            redraw: redraw.clone(),
            switch: switch.clone(),
            state: Arc::clone(&state),
            stats: Arc::clone(&stats),
        };
        let thread = thread::Builder::new()
            .name(RENDER_THREAD_NAME.into())
            .spawn(move || {
                let mut driver = RenderLoopDriver::new(make_engine(), reconciler, inputs, config)
                    .with_ray_trace_switch(loop_ctx.switch.clone());
                let mut surface = make_surface();
                let result = loop_ctx.run(&mut driver, &mut surface);
                if let Err(e) = &result {
                    tracing::error!(error = %e, "render thread stopped on fatal error");
                    // Leave nothing running behind a dead render loop.
                    if let Err(e) = driver.shutdown() {
                        tracing::error!(error = %e, "shutdown after fatal error failed");
                    }
                }
                *loop_ctx.state.lock() = driver.state();
                result
            })
            .map_err(|source| HostError::Spawn {
                name: RENDER_THREAD_NAME,
                source,
            })?;

        Ok(Self {
            sender,
            redraw,
            switch,
            state,
            stats,
            thread: Some(thread),
        })
    }

    /// Posts a surface event. Blocks only if the channel is full.
    ///
    /// Returns `false` if the render thread has exited.
    pub fn post(&self, event: SurfaceEvent) -> bool {
        if event == SurfaceEvent::RedrawRequested {
            return self.redraw.request() || self.redraw.is_pending();
        }
        if event == SurfaceEvent::Destroyed {
            // Unblock an in-progress trace before the event is even queued.
            self.switch.cancel();
        }
        self.sender.send(Message::Surface(event)).is_ok()
    }

    /// Creates a redraw trigger for producers.
    #[must_use]
    pub fn redraw_requester(&self) -> RedrawRequester {
        self.redraw.clone()
    }

    /// Driver state after the last processed event.
    #[must_use]
    pub fn state(&self) -> DriverState {
        *self.state.lock()
    }

    /// Tick statistics after the last tick.
    #[must_use]
    pub fn stats(&self) -> TickStats {
        *self.stats.lock()
    }

    /// Returns whether the thread has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Shuts the engine down and joins the thread.
    ///
    /// # Errors
    ///
    /// Returns the fatal error that stopped the thread, if any.
    pub fn stop(mut self) -> HostResult<TickStats> {
        self.join()?;
        Ok(self.stats())
    }

    fn join(&mut self) -> HostResult<()> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        self.switch.cancel();
        // Either send fails only if the thread already exited.
        let _ = self.sender.send(Message::Surface(SurfaceEvent::Destroyed));
        let _ = self.sender.send(Message::Exit);
        match thread.join() {
            Ok(result) => result,
            Err(_) => Err(HostError::misuse("render thread panicked")),
        }
    }
}

impl Drop for RenderThread {
    fn drop(&mut self) {
        if let Err(e) = self.join() {
            tracing::error!(error = %e, "render thread ended with error");
        }
    }
}

struct LoopContext {
    receiver: Receiver<Message>,
    redraw: RedrawRequester,
    switch: RayTraceSwitch,
    state: Arc<Mutex<DriverState>>,
    stats: Arc<Mutex<TickStats>>,
}

impl LoopContext {
    fn run<E, R, S>(&self, driver: &mut RenderLoopDriver<E, R>, surface: &mut S) -> HostResult<()>
    where
        E: EngineBoundary,
        R: NeedsReconciler,
        S: DisplaySurface,
    {
        let mut tick_due = false;
        loop {
            let message = if tick_due {
                match self.receiver.try_recv() {
                    Ok(message) => Some(message),
                    Err(TryRecvError::Empty) => None,
                    Err(TryRecvError::Disconnected) => Some(Message::Exit),
                }
            } else {
                Some(self.receiver.recv().unwrap_or(Message::Exit))
            };

            match message {
                None => {
                    let outcome = driver.tick(surface)?;
                    *self.stats.lock() = driver.stats();
                    tick_due = outcome.reschedule;
                }
                Some(Message::Surface(event)) => {
                    tick_due |= self.handle(driver, event)?;
                }
                Some(Message::Exit) => {
                    driver.shutdown()?;
                    *self.state.lock() = driver.state();
                    return Ok(());
                }
            }
            *self.state.lock() = driver.state();
        }
    }

    /// Applies one event. Returns whether a tick is now due.
    fn handle<E, R>(&self, driver: &mut RenderLoopDriver<E, R>, event: SurfaceEvent) -> HostResult<bool>
    where
        E: EngineBoundary,
        R: NeedsReconciler,
    {
        let live = matches!(driver.state(), DriverState::Ready | DriverState::Running);
        match event {
            SurfaceEvent::Created { width, height } => {
                driver.on_surface_created(width, height)?;
                Ok(true)
            }
            SurfaceEvent::Changed { width, height } => {
                driver.on_resize(width, height)?;
                Ok(true)
            }
            SurfaceEvent::RedrawRequested => {
                // Cleared before the tick so a frame written during it re-arms a redraw.
                self.redraw.pending.store(false, Ordering::Release);
                Ok(live)
            }
            SurfaceEvent::Destroyed => {
                driver.shutdown()?;
                Ok(false)
            }
        }
    }
}
