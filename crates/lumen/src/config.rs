//! # Host Configuration
//!
//! Loaded from `lumen.toml`. Every field has a default, so an empty or
//! missing file gives a runnable headless host. Unknown keys are rejected.
//!
//! ```toml
//! [assets]
//! bundle_root = "bundle"
//! destination_root = "/var/lib/lumen"
//! folder = "data"
//! # manifest = "bundle/assets.toml"
//!
//! [surface]
//! width = 640
//! height = 480
//! dots_per_inch = 160
//!
//! [channels]
//! ui_commands = 64
//! surface_events = 64
//! host_events = 256
//!
//! [logging]
//! filter = "info,lumen=debug"
//!
//! [synthetic]
//! camera_fps = 30
//! deny_camera = false
//! deny_location = false
//!
//! [run]
//! seconds = 3
//!
//! [[engine.script]]
//! ticks = 60
//! needs = { video_mode = "PrimaryCamera", wants_orientation = true }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use lumen_core::{HostError, HostResult, PeripheralNeeds, VideoMode};
use lumen_engine::ScriptPhase;

/// Default configuration file name.
pub const DEFAULT_CONFIG_PATH: &str = "lumen.toml";

/// Asset extraction settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssetsConfig {
    /// Read-only bundle directory.
    pub bundle_root: PathBuf,
    /// Writable directory the folder is extracted into.
    pub destination_root: PathBuf,
    /// Folder inside the bundle to extract; plain relative names only.
    pub folder: PathBuf,
    /// Optional TOML manifest listing the bundle's files.
    pub manifest: Option<PathBuf>,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            bundle_root: PathBuf::from("bundle"),
            destination_root: std::env::temp_dir().join("lumen"),
            folder: PathBuf::from("data"),
            manifest: None,
        }
    }
}

/// Initial surface geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SurfaceConfig {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Display density.
    pub dots_per_inch: u32,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            dots_per_inch: 160,
        }
    }
}

/// Bounded channel capacities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChannelConfig {
    /// Render thread to UI thread needs posts.
    pub ui_commands: usize,
    /// Surface lifecycle and redraw events to the render thread.
    pub surface_events: usize,
    /// Host input events to the render thread.
    pub host_events: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            ui_commands: 64,
            surface_events: 64,
            host_events: 256,
        }
    }
}

/// Log output settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing` filter directive, used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".into(),
        }
    }
}

/// Behaviour of the synthetic camera and sensors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyntheticConfig {
    /// Camera frame rate.
    pub camera_fps: u32,
    /// Refuse camera starts (permission denied).
    pub deny_camera: bool,
    /// Refuse location starts (permission denied).
    pub deny_location: bool,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            camera_fps: 30,
            deny_camera: false,
            deny_location: false,
        }
    }
}

/// Scripted engine settings for the headless binary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Phases the scripted engine walks through.
    pub script: Vec<ScriptPhase>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            script: demo_script(),
        }
    }
}

/// Run length for the headless binary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Seconds to run before shutting down.
    pub seconds: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { seconds: 3 }
    }
}

/// Complete host configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    /// `[assets]`
    pub assets: AssetsConfig,
    /// `[surface]`
    pub surface: SurfaceConfig,
    /// `[channels]`
    pub channels: ChannelConfig,
    /// `[logging]`
    pub logging: LoggingConfig,
    /// `[synthetic]`
    pub synthetic: SyntheticConfig,
    /// `[engine]`
    pub engine: EngineConfig,
    /// `[run]`
    pub run: RunConfig,
}

impl HostConfig {
    /// Parses and validates TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::InvalidConfig`] on a parse or validation failure.
    pub fn from_toml_str(text: &str) -> HostResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| HostError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`, falling back to defaults if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::InvalidConfig`] if the file exists but cannot be
    /// read, parsed or validated.
    pub fn load(path: &Path) -> HostResult<Self> {
        match fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(HostError::InvalidConfig(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> HostResult<()> {
        let invalid = |field: &str, why: &str| Err(HostError::InvalidConfig(format!("{field} {why}")));

        if self.surface.width == 0 || self.surface.height == 0 {
            return invalid("surface.width/height", "must be non-zero");
        }
        if self.surface.dots_per_inch == 0 {
            return invalid("surface.dots_per_inch", "must be non-zero");
        }
        if self.channels.ui_commands == 0
            || self.channels.surface_events == 0
            || self.channels.host_events == 0
        {
            return invalid("channels.*", "capacities must be non-zero");
        }
        if !(1..=240).contains(&self.synthetic.camera_fps) {
            return invalid("synthetic.camera_fps", "must be within 1..=240");
        }
        if !lumen_setup::is_plain_relative(&self.assets.folder) {
            return invalid(
                "assets.folder",
                "must be a non-empty relative path without `.` or `..`",
            );
        }
        Ok(())
    }
}

/// Camera with orientation, then file replay, then idle.
fn demo_script() -> Vec<ScriptPhase> {
    vec![
        ScriptPhase {
            ticks: 90,
            needs: PeripheralNeeds {
                video_mode: VideoMode::PrimaryCamera,
                video_size_index: 1,
                wants_orientation: true,
                wants_location: true,
            },
            repaint: false,
            ray_trace_steps: 0,
        },
        ScriptPhase {
            ticks: 30,
            needs: PeripheralNeeds {
                video_mode: VideoMode::FileReplay,
                ..PeripheralNeeds::IDLE
            },
            repaint: true,
            ray_trace_steps: 4,
        },
        ScriptPhase::default(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::ErrorKind;

    #[test]
    fn test_empty_text_gives_defaults() {
        let config = HostConfig::from_toml_str("").unwrap();
        assert_eq!(config, HostConfig::default());
        assert_eq!(config.engine.script.len(), 3);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = HostConfig::from_toml_str(
            r#"
            [surface]
            width = 1280

            [synthetic]
            deny_camera = true

            [[engine.script]]
            ticks = 5
            needs = { video_mode = "SecondaryCamera", video_size_index = 2 }
            "#,
        )
        .unwrap();

        assert_eq!(config.surface.width, 1280);
        assert_eq!(config.surface.height, 480);
        assert!(config.synthetic.deny_camera);
        assert_eq!(config.synthetic.camera_fps, 30);
        assert_eq!(config.engine.script.len(), 1);
        assert_eq!(
            config.engine.script[0].needs.video_mode,
            VideoMode::SecondaryCamera
        );
        assert!(!config.engine.script[0].repaint);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = HostConfig::from_toml_str("[surface]\ndepth = 3\n").unwrap_err();
        assert!(matches!(err, HostError::InvalidConfig(_)));
    }

    #[test]
    fn test_zero_sizes_rejected() {
        assert!(HostConfig::from_toml_str("[surface]\nwidth = 0\n").is_err());
        assert!(HostConfig::from_toml_str("[channels]\nhost_events = 0\n").is_err());
        assert!(HostConfig::from_toml_str("[synthetic]\ncamera_fps = 0\n").is_err());
    }

    #[test]
    fn test_asset_folder_must_stay_below_destination() {
        for folder in ["", "..", "../victim", "data/../..", "./data", "/var/lib"] {
            let text = format!("[assets]\nfolder = \"{folder}\"\n");
            let err = HostConfig::from_toml_str(&text).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidConfig, "folder {folder:?}");
        }
        assert!(HostConfig::from_toml_str("[assets]\nfolder = \"data/models\"\n").is_ok());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("lumen_config_that_does_not_exist.toml");
        let config = HostConfig::load(&path).unwrap();
        assert_eq!(config.surface, SurfaceConfig::default());
    }
}
