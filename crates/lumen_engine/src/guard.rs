//! # Call-Protocol Guard
//!
//! Wraps an [`EngineBoundary`] and rejects calls that break its protocol:
//!
//! ```text
//!            init                 shutdown
//! Uninit ───────────> Live ───────────────> Shut
//!                      ▲                     │
//!                      └─────── init ────────┘   (surface re-created)
//! ```
//!
//! Anything but `init` outside `Live`, a second `init` while `Live`, or any
//! call from a thread other than the one that called `init` is
//! [`HostError::ProtocolMisuse`]. Misuse means a synchronization bug in the
//! host, so it is logged at error level and returned, never swallowed.

use std::path::PathBuf;
use std::thread::{self, ThreadId};

use lumen_core::{
    EngineCall, HostError, HostEvent, HostResult, LocationFix, Orientation, PeripheralNeeds,
    VideoFrame,
};

use crate::boundary::{EngineBoundary, InitParams, RayTraceRepaint};

/// Identifies the running engine instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineHandle {
    /// Increments on every successful `init`.
    pub generation: u64,
    /// Asset root passed to `init`.
    pub asset_root: PathBuf,
}

#[derive(Debug)]
enum Lifecycle {
    Uninit,
    Live { handle: EngineHandle, owner: ThreadId },
    Shut,
}

/// An engine wrapped with call-order and thread-affinity checks.
#[derive(Debug)]
pub struct GuardedEngine<E> {
    engine: E,
    lifecycle: Lifecycle,
    generation: u64,
}

impl<E: EngineBoundary> GuardedEngine<E> {
    /// Wraps an uninitialized engine.
    #[must_use]
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            lifecycle: Lifecycle::Uninit,
            generation: 0,
        }
    }

    /// Returns the live engine handle, if initialized and not shut down.
    #[must_use]
    pub fn handle(&self) -> Option<&EngineHandle> {
        match &self.lifecycle {
            Lifecycle::Live { handle, .. } => Some(handle),
            _ => None,
        }
    }

    /// Returns whether `init` succeeded and `shutdown` has not been called.
    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Live { .. })
    }

    /// Returns the wrapped engine.
    #[must_use]
    pub fn inner(&self) -> &E {
        &self.engine
    }

    /// Unwraps the engine.
    #[must_use]
    pub fn into_inner(self) -> E {
        self.engine
    }

    /// Initializes the engine and binds it to the calling thread.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::ProtocolMisuse`] if the engine is already live,
    /// or [`HostError::EngineCall`] if the engine fails to start.
    pub fn init(&mut self, params: &InitParams) -> HostResult<EngineHandle> {
        if let Lifecycle::Live { handle, .. } = &self.lifecycle {
            return Err(misuse(format!(
                "init called while engine generation {} is live",
                handle.generation
            )));
        }
        self.engine.init(params)?;

        self.generation += 1;
        let handle = EngineHandle {
            generation: self.generation,
            asset_root: params.asset_root.clone(),
        };
        tracing::info!(
            generation = handle.generation,
            width = params.width,
            height = params.height,
            dpi = params.dots_per_inch,
            asset_root = %params.asset_root.display(),
            "engine initialized"
        );
        self.lifecycle = Lifecycle::Live {
            handle: handle.clone(),
            owner: thread::current().id(),
        };
        Ok(handle)
    }

    /// Forwards `resize`.
    ///
    /// # Errors
    ///
    /// Returns misuse or the engine's failure.
    pub fn resize(&mut self, width: u32, height: u32) -> HostResult<()> {
        self.check(EngineCall::Resize)?;
        Ok(self.engine.resize(width, height)?)
    }

    /// Forwards `update` with the host's repaint callback.
    ///
    /// # Errors
    ///
    /// Returns misuse or the engine's failure.
    pub fn update(&mut self, repaint: &mut dyn RayTraceRepaint) -> HostResult<bool> {
        self.check(EngineCall::Update)?;
        Ok(self.engine.update(repaint)?)
    }

    /// Reads the needs snapshot.
    ///
    /// # Errors
    ///
    /// Returns misuse only; the getters cannot fail.
    pub fn query_peripheral_needs(&self) -> HostResult<PeripheralNeeds> {
        self.check(EngineCall::QueryNeeds)?;
        Ok(self.engine.query_peripheral_needs())
    }

    /// Forwards `push_video_frame`.
    ///
    /// # Errors
    ///
    /// Returns misuse or the engine's failure.
    pub fn push_video_frame(&mut self, frame: &VideoFrame) -> HostResult<()> {
        self.check(EngineCall::PushVideoFrame)?;
        Ok(self.engine.push_video_frame(frame)?)
    }

    /// Forwards `request_file_frame`.
    ///
    /// # Errors
    ///
    /// Returns misuse or the engine's failure.
    pub fn request_file_frame(&mut self) -> HostResult<()> {
        self.check(EngineCall::RequestFileFrame)?;
        Ok(self.engine.request_file_frame()?)
    }

    /// Forwards `push_rotation`.
    ///
    /// # Errors
    ///
    /// Returns misuse or the engine's failure.
    pub fn push_rotation(&mut self, orientation: Orientation) -> HostResult<()> {
        self.check(EngineCall::PushRotation)?;
        Ok(self.engine.push_rotation(orientation)?)
    }

    /// Forwards `push_location`.
    ///
    /// # Errors
    ///
    /// Returns misuse or the engine's failure.
    pub fn push_location(&mut self, fix: LocationFix) -> HostResult<()> {
        self.check(EngineCall::PushLocation)?;
        Ok(self.engine.push_location(fix)?)
    }

    /// Forwards `handle_event`.
    ///
    /// # Errors
    ///
    /// Returns misuse or the engine's failure.
    pub fn handle_event(&mut self, event: &HostEvent) -> HostResult<()> {
        self.check(EngineCall::HandleEvent)?;
        Ok(self.engine.handle_event(event)?)
    }

    /// Shuts the engine down. The guard is `Shut` afterwards even if the
    /// engine reports a failure.
    ///
    /// # Errors
    ///
    /// Returns misuse or the engine's failure.
    pub fn shutdown(&mut self) -> HostResult<()> {
        self.check(EngineCall::Shutdown)?;
        let result = self.engine.shutdown();
        self.lifecycle = Lifecycle::Shut;
        tracing::info!(generation = self.generation, "engine shut down");
        Ok(result?)
    }

    fn check(&self, call: EngineCall) -> HostResult<()> {
        match &self.lifecycle {
            Lifecycle::Uninit => Err(misuse(format!("`{call}` called before init"))),
            Lifecycle::Shut => Err(misuse(format!("`{call}` called after shutdown"))),
            Lifecycle::Live { owner, .. } => {
                let caller = thread::current().id();
                if caller == *owner {
                    Ok(())
                } else {
                    Err(misuse(format!(
                        "`{call}` called from {caller:?}, engine is bound to {owner:?}"
                    )))
                }
            }
        }
    }
}

fn misuse(reason: String) -> HostError {
    tracing::error!(%reason, "engine protocol misuse");
    HostError::ProtocolMisuse(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::NoRepaint;
    use crate::scripted::ScriptedEngine;
    use lumen_core::ErrorKind;

    fn params() -> InitParams {
        InitParams {
            width: 640,
            height: 480,
            dots_per_inch: 320,
            asset_root: PathBuf::from("/tmp/lumen-assets"),
        }
    }

    #[test]
    fn test_calls_before_init_are_misuse() {
        let mut engine = GuardedEngine::new(ScriptedEngine::idle());
        let err = engine.update(&mut NoRepaint).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolMisuse);
        assert!(engine.query_peripheral_needs().is_err());
        assert!(engine.inner().calls().is_empty());
    }

    #[test]
    fn test_double_init_is_misuse() {
        let mut engine = GuardedEngine::new(ScriptedEngine::idle());
        let handle = engine.init(&params()).unwrap();
        assert_eq!(handle.generation, 1);

        let err = engine.init(&params()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolMisuse);
    }

    #[test]
    fn test_calls_after_shutdown_are_misuse() {
        let mut engine = GuardedEngine::new(ScriptedEngine::idle());
        engine.init(&params()).unwrap();
        engine.shutdown().unwrap();

        assert!(!engine.is_live());
        let err = engine.resize(10, 10).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolMisuse);
        assert_eq!(
            engine.inner().calls(),
            vec![EngineCall::Init, EngineCall::Shutdown]
        );
    }

    #[test]
    fn test_reinit_after_shutdown_bumps_generation() {
        let mut engine = GuardedEngine::new(ScriptedEngine::idle());
        engine.init(&params()).unwrap();
        engine.shutdown().unwrap();

        let handle = engine.init(&params()).unwrap();
        assert_eq!(handle.generation, 2);
        assert_eq!(handle.asset_root, params().asset_root);
    }

    #[test]
    fn test_call_from_other_thread_is_misuse() {
        let mut engine = GuardedEngine::new(ScriptedEngine::idle());
        engine.init(&params()).unwrap();

        let err = std::thread::spawn(move || engine.update(&mut NoRepaint).unwrap_err())
            .join()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::ProtocolMisuse);
    }

    #[test]
    fn test_failed_init_stays_uninitialized() {
        let mut scripted = ScriptedEngine::idle();
        scripted.fail_next(EngineCall::Init, "no context");
        let mut engine = GuardedEngine::new(scripted);

        let err = engine.init(&params()).unwrap_err();
        assert!(err.is_fatal());
        assert!(engine.handle().is_none());
        assert!(engine.init(&params()).is_ok());
    }
}
