//! # Host Assembly
//!
//! Wires the layers together in startup order:
//!
//! ```text
//! 1. extract assets            (fatal on failure; engine never starts)
//! 2. producer inputs + surface channel
//! 3. platform + UI dispatcher  ("lumen-ui")
//! 4. render thread             ("lumen-render"), then Created
//! ```
//!
//! Teardown runs in reverse: the render thread shuts the engine down and
//! posts all-off needs, then the UI thread stops what is still running.

use lumen_core::{HostEvent, HostResult, PeripheralError};
use lumen_engine::{DisplaySurface, EngineBoundary};
use lumen_peripherals::{PeripheralPlatform, PeripheralState, UiDispatcher};
use lumen_setup::{extract, DirectorySource, ExtractionReport, ManifestSource};

use crate::config::{AssetsConfig, HostConfig};
use crate::driver::{DriverConfig, DriverState};
use crate::inputs::{input_channels, ProducerHandles};
use crate::render_thread::{RenderThread, SurfaceChannel, SurfaceEvent};
use crate::stats::TickStats;
use crate::synthetic::PlatformContext;

/// Extracts the configured asset folder.
///
/// # Errors
///
/// Returns [`lumen_core::HostError::Setup`] on any extraction failure.
pub fn prepare_assets(config: &AssetsConfig) -> HostResult<ExtractionReport> {
    let report = match &config.manifest {
        Some(manifest) => {
            let source = ManifestSource::load(&config.bundle_root, manifest)?;
            extract(&source, &config.folder, &config.destination_root)?
        }
        None => {
            let source = DirectorySource::new(&config.bundle_root);
            extract(&source, &config.folder, &config.destination_root)?
        }
    };
    Ok(report)
}

/// A running host: render thread, UI thread and producers.
#[derive(Debug)]
pub struct Host {
    render: RenderThread,
    ui: UiDispatcher,
    producers: ProducerHandles,
    extraction: ExtractionReport,
}

impl Host {
    /// Extracts assets and starts every thread.
    ///
    /// `make_platform` receives the producer handles and redraw trigger the
    /// platform's producers feed.
    ///
    /// # Errors
    ///
    /// Returns the setup failure or a thread spawn failure.
    pub fn start<E, S, P, FE, FS, FP>(
        config: &HostConfig,
        make_engine: FE,
        make_surface: FS,
        make_platform: FP,
    ) -> HostResult<Self>
    where
        E: EngineBoundary + 'static,
        S: DisplaySurface + 'static,
        P: PeripheralPlatform + Send + 'static,
        FE: FnOnce() -> E + Send + 'static,
        FS: FnOnce() -> S + Send + 'static,
        FP: FnOnce(PlatformContext) -> P,
    {
        config.validate()?;
        let extraction = prepare_assets(&config.assets)?;

        let (producers, inputs) = input_channels(config.channels.host_events);
        let channel = SurfaceChannel::new(config.channels.surface_events);
        let platform = make_platform(PlatformContext {
            producers: producers.clone(),
            redraw: channel.redraw_requester(),
        });
        let ui = UiDispatcher::spawn(platform, config.channels.ui_commands)?;

        let render = RenderThread::spawn(
            channel,
            make_engine,
            make_surface,
            ui.sender(),
            inputs,
            DriverConfig {
                asset_root: extraction.root.clone(),
                dots_per_inch: config.surface.dots_per_inch,
            },
        )?;
        render.post(SurfaceEvent::Created {
            width: config.surface.width,
            height: config.surface.height,
        });

        tracing::info!(
            asset_root = %extraction.root.display(),
            width = config.surface.width,
            height = config.surface.height,
            "host started"
        );
        Ok(Self {
            render,
            ui,
            producers,
            extraction,
        })
    }

    /// Result of the startup extraction.
    #[must_use]
    pub fn extraction(&self) -> &ExtractionReport {
        &self.extraction
    }

    /// Producer-side slots and event queue.
    #[must_use]
    pub fn producers(&self) -> &ProducerHandles {
        &self.producers
    }

    /// Forwards a surface lifecycle event.
    pub fn post_surface_event(&self, event: SurfaceEvent) -> bool {
        self.render.post(event)
    }

    /// Queues an input event and wakes the render thread.
    pub fn post_event(&self, event: HostEvent) -> bool {
        let queued = self.producers.post_event(event);
        if queued {
            self.render.redraw_requester().request();
        }
        queued
    }

    /// Render loop state after the last processed event.
    #[must_use]
    pub fn render_state(&self) -> DriverState {
        self.render.state()
    }

    /// Producers running after the last processed UI command.
    #[must_use]
    pub fn peripheral_state(&self) -> PeripheralState {
        self.ui.state()
    }

    /// Peripheral refusals reported since the last call.
    #[must_use]
    pub fn drain_peripheral_failures(&self) -> Vec<PeripheralError> {
        self.ui.drain_failures()
    }

    /// Tick statistics so far.
    #[must_use]
    pub fn stats(&self) -> TickStats {
        self.render.stats()
    }

    /// Waits until the UI thread has run every command posted so far.
    pub fn flush_ui(&self, timeout: std::time::Duration) -> bool {
        self.ui.flush(timeout)
    }

    /// Shuts down the engine, stops every producer and joins both threads.
    ///
    /// # Errors
    ///
    /// Returns the fatal error that stopped the render thread, if any.
    pub fn stop(self) -> HostResult<TickStats> {
        let Self { render, ui, .. } = self;
        let result = render.stop();
        ui.shutdown();
        if let Ok(stats) = &result {
            tracing::info!(%stats, "host stopped");
        }
        result
    }
}
