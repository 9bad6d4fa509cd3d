//! gesturectl - hand gesture brightness and volume control
//!
//! This binary:
//! 1. Captures frames from a webcam (or a synthetic `stub://` source)
//! 2. Detects hand landmarks on each mirrored frame
//! 3. Maps the left-hand pinch to display brightness and the right-hand pinch
//!    to master volume
//! 4. Shows the annotated preview until `q` (window) or Ctrl-C (headless)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gesture_control::config::{BrightnessBackend, GestureConfig, VolumeBackend};
use gesture_control::control::{
    BrightnessControl, DryRun, MixerVolume, SysfsBacklight, VolumeControl, DEFAULT_BACKLIGHT_ROOT,
};
use gesture_control::detect::{BackendRegistry, DetectorBackend, StubBackend};
use gesture_control::display::{DisplaySink, HeadlessDisplay};
use gesture_control::ingest::{V4l2Config, V4l2Source};
use gesture_control::{ControlLoop, GestureMapper};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file (.toml or .json).
    #[arg(long, env = "GESTURECTL_CONFIG")]
    config: Option<PathBuf>,
    /// Camera device path, or stub://<name> for synthetic frames.
    #[arg(long)]
    device: Option<String>,
    /// Detector backend name (tract, stub).
    #[arg(long)]
    detector: Option<String>,
    /// ONNX hand landmark model for the tract backend.
    #[arg(long)]
    model: Option<PathBuf>,
    /// Log brightness and volume changes without touching the system.
    #[arg(long)]
    dry_run: bool,
    /// Run without a preview window (stop with Ctrl-C).
    #[arg(long)]
    headless: bool,
    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,
}

impl Args {
    fn apply(&self, cfg: &mut GestureConfig) {
        if let Some(device) = &self.device {
            cfg.camera.device = device.clone();
        }
        if let Some(detector) = &self.detector {
            cfg.detector.backend = detector.clone();
        }
        if let Some(model) = &self.model {
            cfg.detector.model_path = model.clone();
        }
        if self.dry_run {
            cfg.brightness.backend = BrightnessBackend::DryRun;
            cfg.volume.backend = VolumeBackend::DryRun;
        }
        if self.headless {
            cfg.display.enabled = false;
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = GestureConfig::load_from(args.config.as_deref())?;
    args.apply(&mut cfg);
    cfg.validate()?;

    let mut source = V4l2Source::new(V4l2Config {
        device: cfg.camera.device.clone(),
        target_fps: cfg.camera.target_fps,
        width: cfg.camera.width,
        height: cfg.camera.height,
    })?;
    source.connect()?;

    let detector = build_detector(&cfg)?;
    let brightness = build_brightness(&cfg)?;
    let volume = build_volume(&cfg);

    let quit = Arc::new(AtomicBool::new(false));
    {
        let quit = quit.clone();
        ctrlc::set_handler(move || quit.store(true, Ordering::SeqCst))
            .context("failed to install Ctrl-C handler")?;
    }
    let display = build_display(&cfg, quit)?;

    let mapper = GestureMapper::new(cfg.brightness.range, cfg.volume.range);
    let report = ControlLoop::new(Box::new(source), detector, brightness, volume, display)
        .with_mapper(mapper)
        .with_hysteresis(cfg.volume.hysteresis)
        .with_mirror(cfg.camera.mirror)
        .with_max_frames(args.max_frames)
        .run();

    log::info!(
        "stopped ({:?}): frames={} hands={} skipped={} brightness_updates={} volume_updates={} errors={} source_stalls={}",
        report.stop_reason,
        report.frames,
        report.hands_seen,
        report.hands_skipped,
        report.brightness_updates,
        report.volume_updates,
        report.recoverable_errors,
        report.source_stalls
    );
    Ok(())
}

fn build_detector(cfg: &GestureConfig) -> Result<Box<dyn DetectorBackend>> {
    let min_confidence = cfg.detector.min_confidence;
    let mut registry = BackendRegistry::new();

    #[cfg(feature = "backend-tract")]
    {
        let model_path = cfg.detector.model_path.clone();
        registry.register("tract", move || {
            let backend = gesture_control::detect::TractBackend::new(&model_path)?
                .with_min_confidence(min_confidence);
            Ok(Box::new(backend))
        });
    }
    #[cfg(not(feature = "backend-tract"))]
    {
        if cfg.detector.backend == "tract" {
            anyhow::bail!(
                "built without the backend-tract feature, so model {} cannot be used; \
                 run with --detector stub --device stub://demo, or rebuild with \
                 --features backend-tract",
                cfg.detector.model_path.display()
            );
        }
    }

    registry.register("stub", move || {
        Ok(Box::new(
            StubBackend::new().with_min_confidence(min_confidence),
        ))
    });

    registry.build(&cfg.detector.backend)
}

fn build_brightness(cfg: &GestureConfig) -> Result<Box<dyn BrightnessControl>> {
    match cfg.brightness.backend {
        BrightnessBackend::DryRun => Ok(Box::new(DryRun::new())),
        BrightnessBackend::Sysfs => {
            let backlight = match &cfg.brightness.device {
                Some(device) => SysfsBacklight::open(device)?,
                None => SysfsBacklight::discover(DEFAULT_BACKLIGHT_ROOT)?,
            };
            Ok(Box::new(backlight))
        }
    }
}

fn build_volume(cfg: &GestureConfig) -> Box<dyn VolumeControl> {
    match cfg.volume.backend {
        VolumeBackend::DryRun => Box::new(DryRun::new()),
        VolumeBackend::Mixer(mixer) => Box::new(MixerVolume::new(mixer)),
    }
}

fn build_display(cfg: &GestureConfig, quit: Arc<AtomicBool>) -> Result<Box<dyn DisplaySink>> {
    if !cfg.display.enabled {
        log::info!("running headless; press Ctrl-C to stop");
        return Ok(Box::new(HeadlessDisplay::new(quit)));
    }

    #[cfg(feature = "display-minifb")]
    {
        let window = gesture_control::display::WindowDisplay::open(
            &cfg.display.title,
            cfg.camera.width,
            cfg.camera.height,
            quit,
        )?;
        log::info!("preview window open; press q to stop");
        Ok(Box::new(window))
    }
    #[cfg(not(feature = "display-minifb"))]
    {
        log::warn!("built without display-minifb; running headless, press Ctrl-C to stop");
        Ok(Box::new(HeadlessDisplay::new(quit)))
    }
}
