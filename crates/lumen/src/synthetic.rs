//! # Synthetic Peripherals
//!
//! A [`PeripheralPlatform`] whose producers are plain threads generating
//! test data, for hosts without a camera or sensors.
//!
//! ```text
//! start_camera      ──> "lumen-camera"       YUV 4:2:0 gradient at camera_fps
//!                                              └─ slot.write; redraw if slot was empty
//! start_orientation ──> "lumen-orientation"  slow spin around the vertical axis, 50 Hz
//! start_location    ──> "lumen-location"     fixed position, 1 Hz
//! ```
//!
//! Stopping a producer disconnects its stop channel and joins the thread.

use std::f32::consts::TAU;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};

use lumen_core::{
    HostEvent, LocationFix, Orientation, Peripheral, PeripheralError, Plane, VideoFrame, VideoMode,
};
use lumen_peripherals::PeripheralPlatform;

use crate::config::SyntheticConfig;
use crate::inputs::ProducerHandles;
use crate::render_thread::RedrawRequester;

/// Capture sizes indexed by `video_size_index`.
pub const CAMERA_SIZES: [(u32, u32); 3] = [(320, 240), (640, 480), (1280, 720)];

const ORIENTATION_PERIOD: Duration = Duration::from_millis(20);
const LOCATION_PERIOD: Duration = Duration::from_secs(1);

/// Handles a platform needs to feed the render thread.
#[derive(Clone, Debug)]
pub struct PlatformContext {
    /// Slots and the host event queue.
    pub producers: ProducerHandles,
    /// Wakes the render thread when a frame lands in an empty slot.
    pub redraw: RedrawRequester,
}

/// A periodic producer thread.
#[derive(Debug)]
struct Producer {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Producer {
    fn spawn<F>(name: &str, period: Duration, mut step: F) -> std::io::Result<Self>
    where
        F: FnMut(u64) + Send + 'static,
    {
        let (stop, stopped) = bounded::<()>(0);
        let handle = thread::Builder::new().name(name.into()).spawn(move || {
            let mut n = 0u64;
            loop {
                step(n);
                n += 1;
                match stopped.recv_timeout(period) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        })?;
        Ok(Self {
            stop: Some(stop),
            handle: Some(handle),
        })
    }
}

impl Drop for Producer {
    fn drop(&mut self) {
        drop(self.stop.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("producer thread panicked");
            }
        }
    }
}

/// Thread-backed camera, orientation and location producers.
#[derive(Debug)]
pub struct SyntheticPlatform {
    ctx: PlatformContext,
    config: SyntheticConfig,
    camera: Option<Producer>,
    orientation: Option<Producer>,
    location: Option<Producer>,
}

impl SyntheticPlatform {
    /// Creates a platform with nothing running.
    #[must_use]
    pub fn new(ctx: PlatformContext, config: SyntheticConfig) -> Self {
        Self {
            ctx,
            config,
            camera: None,
            orientation: None,
            location: None,
        }
    }

    /// Returns whether the camera thread is running.
    #[must_use]
    pub fn camera_running(&self) -> bool {
        self.camera.is_some()
    }
}

fn spawn_failed(peripheral: Peripheral, e: &std::io::Error) -> PeripheralError {
    PeripheralError::Failed {
        peripheral,
        reason: e.to_string(),
    }
}

/// Builds a 4:2:0 frame with a moving diagonal gradient.
///
/// # Errors
///
/// Returns [`lumen_core::FrameError`] only for zero dimensions.
#[allow(clippy::cast_possible_truncation)]
pub fn gradient_frame(width: u32, height: u32, phase: u64) -> Result<VideoFrame, lumen_core::FrameError> {
    let (cw, ch) = (width.div_ceil(2), height.div_ceil(2));
    let shift = phase.to_le_bytes()[0];
    let y: Vec<u8> = (0..height)
        .flat_map(|row| (0..width).map(move |col| (row.wrapping_add(col) as u8).wrapping_add(shift)))
        .collect();
    let chroma = vec![128u8; (cw * ch) as usize];
    VideoFrame::planar(
        width,
        height,
        Plane::new(y, 1, width),
        Plane::new(chroma.clone(), 1, cw),
        Plane::new(chroma, 1, cw),
    )
}

impl PeripheralPlatform for SyntheticPlatform {
    fn start_camera(&mut self, mode: VideoMode, size_index: i32) -> Result<(), PeripheralError> {
        if self.config.deny_camera {
            return Err(PeripheralError::PermissionDenied {
                peripheral: Peripheral::Camera,
            });
        }
        let max_index = CAMERA_SIZES.len() - 1;
        let index = usize::try_from(size_index).unwrap_or(0).min(max_index);
        let (width, height) = CAMERA_SIZES[index];

        self.camera = None;
        let producers = self.ctx.producers.clone();
        let redraw = self.ctx.redraw.clone();
        let period = Duration::from_secs(1) / self.config.camera_fps.max(1);
        let camera = Producer::spawn("lumen-camera", period, move |n| {
            match gradient_frame(width, height, n) {
                Ok(frame) => {
                    // An overwrite means a wake-up is already pending.
                    if !producers.frames.write(frame) {
                        redraw.request();
                    }
                }
                Err(e) => tracing::error!(error = %e, "synthetic frame rejected"),
            }
        })
        .map_err(|e| spawn_failed(Peripheral::Camera, &e))?;
        self.camera = Some(camera);

        self.ctx.producers.post_event(HostEvent::CameraSize {
            size_index: i32::try_from(index).unwrap_or(i32::MAX),
            size_index_max: i32::try_from(max_index).unwrap_or(i32::MAX),
            width,
            height,
        });
        tracing::info!(?mode, width, height, "synthetic camera started");
        Ok(())
    }

    fn stop_camera(&mut self) -> Result<(), PeripheralError> {
        if self.camera.take().is_some() {
            tracing::info!("synthetic camera stopped");
        }
        Ok(())
    }

    fn start_orientation(&mut self) -> Result<(), PeripheralError> {
        let slot = self.ctx.producers.orientation.clone();
        let producer = Producer::spawn("lumen-orientation", ORIENTATION_PERIOD, move |n| {
            let step = u16::try_from(n % 500).unwrap_or(0);
            let angle = f32::from(step) / 500.0 * TAU;
            slot.write(Orientation::around_y(angle));
        })
        .map_err(|e| spawn_failed(Peripheral::Orientation, &e))?;
        self.orientation = Some(producer);
        Ok(())
    }

    fn stop_orientation(&mut self) -> Result<(), PeripheralError> {
        self.orientation = None;
        Ok(())
    }

    fn start_location(&mut self) -> Result<(), PeripheralError> {
        if self.config.deny_location {
            return Err(PeripheralError::PermissionDenied {
                peripheral: Peripheral::Location,
            });
        }
        let slot = self.ctx.producers.location.clone();
        let producer = Producer::spawn("lumen-location", LOCATION_PERIOD, move |_| {
            slot.write(LocationFix {
                latitude_deg: 46.947_974,
                longitude_deg: 7.447_447,
                altitude_m: 542.0,
                accuracy_m: 5.0,
            });
        })
        .map_err(|e| spawn_failed(Peripheral::Location, &e))?;
        self.location = Some(producer);
        Ok(())
    }

    fn stop_location(&mut self) -> Result<(), PeripheralError> {
        self.location = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::input_channels;
    use crate::render_thread::SurfaceChannel;
    use lumen_core::FrameData;

    fn context() -> (PlatformContext, crate::inputs::DriverInputs, SurfaceChannel) {
        let (producers, inputs) = input_channels(8);
        let channel = SurfaceChannel::new(8);
        let ctx = PlatformContext {
            producers,
            redraw: channel.redraw_requester(),
        };
        (ctx, inputs, channel)
    }

    #[test]
    fn test_gradient_frame_is_planar() {
        let frame = gradient_frame(640, 480, 3).unwrap();
        let FrameData::Planar { y, u, .. } = frame.data() else {
            panic!("expected planar frame");
        };
        assert_eq!(y.data().len(), 640 * 480);
        assert_eq!(u.data().len(), 320 * 240);
        assert_eq!(y.sample(1, 1), Some(5));
    }

    #[test]
    fn test_camera_delivers_frames_and_size_report() {
        let (ctx, inputs, _channel) = context();
        let redraw = ctx.redraw.clone();
        let mut platform = SyntheticPlatform::new(
            ctx,
            SyntheticConfig {
                camera_fps: 100,
                ..SyntheticConfig::default()
            },
        );

        platform.start_camera(VideoMode::PrimaryCamera, 1).unwrap();
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        let frame = loop {
            if let Some(frame) = inputs.frames.take_if_present() {
                break frame;
            }
            assert!(std::time::Instant::now() < deadline, "no frame produced");
            thread::sleep(Duration::from_millis(5));
        };
        platform.stop_camera().unwrap();

        assert_eq!((frame.width(), frame.height()), (640, 480));
        assert!(redraw.is_pending());
        assert_eq!(
            inputs.events.try_recv().ok(),
            Some(HostEvent::CameraSize {
                size_index: 1,
                size_index_max: 2,
                width: 640,
                height: 480
            })
        );
        assert!(!platform.camera_running());
    }

    #[test]
    fn test_denied_peripherals() {
        let (ctx, _inputs, _channel) = context();
        let mut platform = SyntheticPlatform::new(
            ctx,
            SyntheticConfig {
                deny_camera: true,
                deny_location: true,
                ..SyntheticConfig::default()
            },
        );
        assert!(matches!(
            platform.start_camera(VideoMode::PrimaryCamera, 0),
            Err(PeripheralError::PermissionDenied { .. })
        ));
        assert!(platform.start_location().is_err());
        assert!(platform.start_orientation().is_ok());
        platform.stop_orientation().unwrap();
    }
}
