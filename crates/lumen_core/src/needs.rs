//! Peripheral needs reported by the engine once per tick.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Video source the engine wants this tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoMode {
    /// No video at all.
    #[default]
    None,
    /// Back-facing (main) camera.
    PrimaryCamera,
    /// Front-facing (secondary) camera.
    SecondaryCamera,
    /// Frames pulled on demand from a stored video file.
    FileReplay,
}

impl VideoMode {
    /// Maps the engine's raw video-type code (`0..=3`).
    #[must_use]
    pub const fn from_raw(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::PrimaryCamera),
            2 => Some(Self::SecondaryCamera),
            3 => Some(Self::FileReplay),
            _ => None,
        }
    }

    /// Returns whether frames come from a live camera callback.
    #[inline]
    #[must_use]
    pub const fn is_live_camera(self) -> bool {
        matches!(self, Self::PrimaryCamera | Self::SecondaryCamera)
    }

    /// Returns whether the render loop re-ticks itself in this mode.
    ///
    /// Live camera modes are re-ticked by frame arrival instead.
    #[inline]
    #[must_use]
    pub const fn self_schedules(self) -> bool {
        matches!(self, Self::None | Self::FileReplay)
    }
}

/// One of the asynchronous producers the controller manages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Peripheral {
    /// Camera capture stream.
    Camera,
    /// Rotation / orientation sensor.
    Orientation,
    /// Location sensor.
    Location,
}

impl fmt::Display for Peripheral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Camera => "camera",
            Self::Orientation => "orientation sensor",
            Self::Location => "location sensor",
        })
    }
}

/// Snapshot of what the engine needs from the peripherals.
///
/// Recomputed every tick, never persisted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PeripheralNeeds {
    /// Requested video source.
    pub video_mode: VideoMode,
    /// Index into the platform's list of capture sizes.
    pub video_size_index: i32,
    /// Whether orientation updates are wanted.
    pub wants_orientation: bool,
    /// Whether location updates are wanted.
    pub wants_location: bool,
}

impl PeripheralNeeds {
    /// Needs with every peripheral off.
    pub const IDLE: Self = Self {
        video_mode: VideoMode::None,
        video_size_index: 0,
        wants_orientation: false,
        wants_location: false,
    };

    /// Returns whether nothing is wanted.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        !self.video_mode.is_live_camera() && !self.wants_orientation && !self.wants_location
    }
}
