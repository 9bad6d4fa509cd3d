use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::control::Mixer;
use crate::gesture::{DistanceRange, BRIGHTNESS_RANGE, VOLUME_HYSTERESIS, VOLUME_RANGE};

const DEFAULT_DEVICE: &str = "/dev/video0";
const DEFAULT_WIDTH: u32 = 1280;
const DEFAULT_HEIGHT: u32 = 720;
const DEFAULT_FPS: u32 = 30;
const DEFAULT_DETECTOR: &str = "tract";
const DEFAULT_MODEL_PATH: &str = "models/hand_landmark.onnx";
const DEFAULT_MIN_CONFIDENCE: f32 = 0.7;
const DEFAULT_WINDOW_TITLE: &str = crate::display::WINDOW_TITLE;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct GestureConfigFile {
    camera: Option<CameraConfigFile>,
    detector: Option<DetectorConfigFile>,
    brightness: Option<BrightnessConfigFile>,
    volume: Option<VolumeConfigFile>,
    display: Option<DisplayConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CameraConfigFile {
    device: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
    mirror: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    min_confidence: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct BrightnessConfigFile {
    near: Option<f64>,
    far: Option<f64>,
    backend: Option<String>,
    device: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct VolumeConfigFile {
    near: Option<f64>,
    far: Option<f64>,
    hysteresis: Option<f64>,
    backend: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DisplayConfigFile {
    enabled: Option<bool>,
    title: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GestureConfig {
    pub camera: CameraSettings,
    pub detector: DetectorSettings,
    pub brightness: BrightnessSettings,
    pub volume: VolumeSettings,
    pub display: DisplaySettings,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
    /// Flip frames left-to-right before detection.
    pub mirror: bool,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: String,
    pub model_path: PathBuf,
    pub min_confidence: f32,
}

#[derive(Debug, Clone)]
pub struct BrightnessSettings {
    pub range: DistanceRange,
    pub backend: BrightnessBackend,
    /// Specific backlight directory; discovered under /sys/class/backlight when unset.
    pub device: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct VolumeSettings {
    pub range: DistanceRange,
    pub hysteresis: f64,
    pub backend: VolumeBackend,
}

#[derive(Debug, Clone)]
pub struct DisplaySettings {
    pub enabled: bool,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrightnessBackend {
    Sysfs,
    DryRun,
}

impl FromStr for BrightnessBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sysfs" | "backlight" => Ok(BrightnessBackend::Sysfs),
            "dry-run" | "dry_run" | "log" => Ok(BrightnessBackend::DryRun),
            other => Err(anyhow!(
                "unknown brightness backend '{}' (expected sysfs or dry-run)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeBackend {
    Mixer(Mixer),
    DryRun,
}

impl FromStr for VolumeBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dry-run" | "dry_run" | "log" => Ok(VolumeBackend::DryRun),
            other => other.parse::<Mixer>().map(VolumeBackend::Mixer).map_err(|_| {
                anyhow!(
                    "unknown volume backend '{}' (expected pactl, amixer or dry-run)",
                    other
                )
            }),
        }
    }
}

impl GestureConfig {
    /// Load from the file named by `GESTURECTL_CONFIG` (if any), then apply env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("GESTURECTL_CONFIG").ok().map(PathBuf::from);
        Self::load_from(config_path.as_deref())
    }

    /// Load from an explicit file (or defaults), then apply env overrides.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: GestureConfigFile) -> Result<Self> {
        let camera_file = file.camera.unwrap_or_default();
        let camera = CameraSettings {
            device: camera_file
                .device
                .unwrap_or_else(|| DEFAULT_DEVICE.to_string()),
            width: camera_file.width.unwrap_or(DEFAULT_WIDTH),
            height: camera_file.height.unwrap_or(DEFAULT_HEIGHT),
            target_fps: camera_file.target_fps.unwrap_or(DEFAULT_FPS),
            mirror: camera_file.mirror.unwrap_or(true),
        };

        let detector_file = file.detector.unwrap_or_default();
        let detector = DetectorSettings {
            backend: detector_file
                .backend
                .unwrap_or_else(|| DEFAULT_DETECTOR.to_string()),
            model_path: detector_file
                .model_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            min_confidence: detector_file
                .min_confidence
                .unwrap_or(DEFAULT_MIN_CONFIDENCE),
        };

        let brightness_file = file.brightness.unwrap_or_default();
        let brightness = BrightnessSettings {
            range: DistanceRange::new(
                brightness_file.near.unwrap_or(BRIGHTNESS_RANGE.near),
                brightness_file.far.unwrap_or(BRIGHTNESS_RANGE.far),
            ),
            backend: match brightness_file.backend {
                Some(name) => name.parse()?,
                None => BrightnessBackend::Sysfs,
            },
            device: brightness_file.device,
        };

        let volume_file = file.volume.unwrap_or_default();
        let volume = VolumeSettings {
            range: DistanceRange::new(
                volume_file.near.unwrap_or(VOLUME_RANGE.near),
                volume_file.far.unwrap_or(VOLUME_RANGE.far),
            ),
            hysteresis: volume_file.hysteresis.unwrap_or(VOLUME_HYSTERESIS),
            backend: match volume_file.backend {
                Some(name) => name.parse()?,
                None => VolumeBackend::Mixer(Mixer::Pactl),
            },
        };

        let display_file = file.display.unwrap_or_default();
        let display = DisplaySettings {
            enabled: display_file.enabled.unwrap_or(true),
            title: display_file
                .title
                .unwrap_or_else(|| DEFAULT_WINDOW_TITLE.to_string()),
        };

        Ok(Self {
            camera,
            detector,
            brightness,
            volume,
            display,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(device) = non_empty_env("GESTURECTL_DEVICE") {
            self.camera.device = device;
        }
        if let Some(backend) = non_empty_env("GESTURECTL_DETECTOR") {
            self.detector.backend = backend;
        }
        if let Some(model) = non_empty_env("GESTURECTL_MODEL") {
            self.detector.model_path = PathBuf::from(model);
        }
        if let Some(confidence) = non_empty_env("GESTURECTL_MIN_CONFIDENCE") {
            self.detector.min_confidence = confidence
                .parse()
                .map_err(|_| anyhow!("GESTURECTL_MIN_CONFIDENCE must be a number"))?;
        }
        if let Some(backend) = non_empty_env("GESTURECTL_BRIGHTNESS_BACKEND") {
            self.brightness.backend = backend.parse()?;
        }
        if let Some(backend) = non_empty_env("GESTURECTL_VOLUME_BACKEND") {
            self.volume.backend = backend.parse()?;
        }
        if let Some(band) = non_empty_env("GESTURECTL_HYSTERESIS") {
            self.volume.hysteresis = band
                .parse()
                .map_err(|_| anyhow!("GESTURECTL_HYSTERESIS must be a number"))?;
        }
        Ok(())
    }

    /// Check ranges and limits. Called by the loaders and again after CLI overrides.
    pub fn validate(&self) -> Result<()> {
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera width and height must be greater than zero"));
        }
        if self.camera.device.trim().is_empty() {
            return Err(anyhow!("camera device must not be empty"));
        }
        validate_range("brightness", &self.brightness.range)?;
        validate_range("volume", &self.volume.range)?;
        if !(0.0..1.0).contains(&self.volume.hysteresis) {
            return Err(anyhow!(
                "volume hysteresis must be in [0, 1), got {}",
                self.volume.hysteresis
            ));
        }
        if !(0.0..=1.0).contains(&self.detector.min_confidence) {
            return Err(anyhow!(
                "detector min_confidence must be in [0, 1], got {}",
                self.detector.min_confidence
            ));
        }
        Ok(())
    }
}

fn validate_range(name: &str, range: &DistanceRange) -> Result<()> {
    if !range.near.is_finite() || !range.far.is_finite() || range.near < 0.0 {
        return Err(anyhow!("{} range must be finite and non-negative", name));
    }
    if range.near >= range.far {
        return Err(anyhow!(
            "{} range near ({}) must be below far ({})",
            name,
            range.near,
            range.far
        ));
    }
    Ok(())
}

fn read_config_file(path: &Path) -> Result<GestureConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}
