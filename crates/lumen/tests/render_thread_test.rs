//! Render thread tests: event handling, self-scheduling and redraw wake-ups
//! with a real `lumen-render` thread.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use lumen::{input_channels, DriverConfig, DriverState, RenderThread, SurfaceChannel, SurfaceEvent};
use lumen_core::{EngineCall, ErrorKind, PeripheralNeeds, VideoFrame, VideoMode};
use lumen_engine::{EngineProbe, HeadlessSurface, ScriptedEngine};
use lumen_peripherals::{PeripheralController, RecordingPlatform};

const TIMEOUT: Duration = Duration::from_secs(5);

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

fn spawn(engine: ScriptedEngine) -> (RenderThread, EngineProbe, lumen::ProducerHandles, RecordingPlatform) {
    let probe = engine.probe();
    let platform = RecordingPlatform::new();
    let (producers, inputs) = input_channels(16);
    let render = RenderThread::spawn(
        SurfaceChannel::new(16),
        move || engine,
        || {
            let mut surface = HeadlessSurface::new();
            surface.make_current();
            surface
        },
        PeripheralController::new(platform.clone()),
        inputs,
        DriverConfig {
            asset_root: PathBuf::from("/tmp/lumen_render_test/data"),
            dots_per_inch: 160,
        },
    )
    .unwrap();
    (render, probe, producers, platform)
}

#[test]
fn test_redraw_requests_coalesce() {
    let channel = SurfaceChannel::new(4);
    let redraw = channel.redraw_requester();
    let other = channel.redraw_requester();

    assert!(redraw.request());
    assert!(!redraw.request());
    assert!(!other.request());
    assert!(other.is_pending());
}

#[test]
fn test_self_scheduling_engine_keeps_ticking() {
    let (render, probe, _producers, _platform) =
        spawn(ScriptedEngine::constant(PeripheralNeeds::IDLE, true));

    assert!(render.post(SurfaceEvent::Created {
        width: 640,
        height: 480
    }));
    assert!(wait_until(|| render.stats().ticks >= 50));
    assert!(render.stats().self_scheduled >= 49);

    // Lifecycle events are not starved by the self-scheduled ticks.
    assert!(render.post(SurfaceEvent::Changed {
        width: 800,
        height: 600
    }));
    assert!(wait_until(|| probe.count(EngineCall::Resize) == 1));

    let stats = render.stop().unwrap();
    assert!(stats.ticks >= 50);
    assert_eq!(probe.count(EngineCall::Shutdown), 1);
}

#[test]
fn test_live_camera_ticks_only_on_frame_arrival() {
    let needs = PeripheralNeeds {
        video_mode: VideoMode::PrimaryCamera,
        video_size_index: 1,
        ..PeripheralNeeds::IDLE
    };
    let (render, probe, producers, platform) = spawn(ScriptedEngine::constant(needs, false));
    let redraw = render.redraw_requester();

    render.post(SurfaceEvent::Created {
        width: 640,
        height: 480,
    });
    assert!(wait_until(|| render.stats().ticks == 1));
    thread::sleep(Duration::from_millis(50));
    assert_eq!(render.stats().ticks, 1, "no tick without a frame");
    assert!(!platform.commands().is_empty(), "camera start posted on first tick");

    for n in 0..5u32 {
        producers
            .frames
            .write(VideoFrame::packed(640, 480, vec![0u8; 640 * 480]).unwrap());
        redraw.request();
        assert!(wait_until(|| probe.frames().len() == n as usize + 1));
    }

    let stats = render.stop().unwrap();
    assert_eq!(stats.frames_pushed, 5);
    assert_eq!(stats.self_scheduled, 0);
}

#[test]
fn test_destroyed_then_recreated_surface() {
    let (render, probe, _producers, platform) = spawn(ScriptedEngine::idle());

    render.post(SurfaceEvent::Created {
        width: 640,
        height: 480,
    });
    assert!(wait_until(|| render.stats().ticks == 1));

    render.post(SurfaceEvent::Destroyed);
    assert!(wait_until(|| render.state() == DriverState::Stopped));
    assert_eq!(probe.count(EngineCall::Shutdown), 1);

    // Redraws while no engine is live are ignored.
    render.post(SurfaceEvent::RedrawRequested);
    thread::sleep(Duration::from_millis(20));
    assert_eq!(render.stats().ticks, 1);

    render.post(SurfaceEvent::Created {
        width: 1280,
        height: 720,
    });
    assert!(wait_until(|| render.stats().ticks == 2));
    assert_eq!(probe.count(EngineCall::Init), 2);
    assert_eq!(probe.init_params().map(|p| (p.width, p.height)), Some((1280, 720)));

    render.stop().unwrap();
    assert!(platform.commands().is_empty(), "idle engine never needs a peripheral");
}

#[test]
fn test_init_failure_stops_thread() {
    let mut engine = ScriptedEngine::idle();
    engine.fail_next(EngineCall::Init, "no context");
    let (render, probe, _producers, _platform) = spawn(engine);

    render.post(SurfaceEvent::Created {
        width: 640,
        height: 480,
    });
    assert!(wait_until(|| render.is_finished()));

    let err = render.stop().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EngineCallFailure);
    assert!(err.is_fatal());
    assert_eq!(probe.count(EngineCall::Update), 0);
}
