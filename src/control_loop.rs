//! The capture → detect → map → control loop.
//!
//! One blocking iteration per frame: acquire, mirror, detect, dispatch each
//! usable hand to the brightness or volume sink, annotate, show, poll for quit.
//! A failed frame read ends the loop; everything else that goes wrong inside an
//! iteration is logged and the iteration completes.
//!
//! The capture device and the display are released exactly once when the loop
//! terminates, or when the loop is dropped.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::control::{volume_percent, BrightnessControl, VolumeControl};
use crate::detect::{DetectorBackend, HandObservation};
use crate::display::{annotate_hand, DisplaySink};
use crate::gesture::{ControlCommand, GestureMapper, VolumeState, VOLUME_HYSTERESIS};
use crate::ingest::FrameSource;

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Why the loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The display reported a quit request (`q`, window closed, Ctrl-C).
    QuitRequested,
    /// The frame source failed.
    FrameUnavailable,
    /// The configured frame limit was reached.
    FrameLimit,
}

/// Loop state after an iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Terminating(StopReason),
}

/// Counters collected while the loop runs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoopReport {
    pub frames: u64,
    pub hands_seen: u64,
    /// Hands without both thumb and index tips.
    pub hands_skipped: u64,
    pub brightness_updates: u64,
    pub volume_updates: u64,
    /// Detector, sink and display errors that did not stop the loop.
    pub recoverable_errors: u64,
    /// Times the frame source went from healthy to unhealthy.
    pub source_stalls: u64,
    pub stop_reason: Option<StopReason>,
}

pub struct ControlLoop {
    source: Box<dyn FrameSource>,
    detector: Box<dyn DetectorBackend>,
    brightness: Box<dyn BrightnessControl>,
    volume: Box<dyn VolumeControl>,
    display: Box<dyn DisplaySink>,
    mapper: GestureMapper,
    hysteresis: f64,
    mirror: bool,
    max_frames: Option<u64>,
    volume_state: VolumeState,
    report: LoopReport,
    last_health_log: Instant,
    source_healthy: bool,
    released: bool,
}

impl ControlLoop {
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn DetectorBackend>,
        brightness: Box<dyn BrightnessControl>,
        volume: Box<dyn VolumeControl>,
        display: Box<dyn DisplaySink>,
    ) -> Self {
        Self {
            source,
            detector,
            brightness,
            volume,
            display,
            mapper: GestureMapper::default(),
            hysteresis: VOLUME_HYSTERESIS,
            mirror: true,
            max_frames: None,
            volume_state: VolumeState::new(),
            report: LoopReport::default(),
            last_health_log: Instant::now(),
            source_healthy: true,
            released: false,
        }
    }

    pub fn with_mapper(mut self, mapper: GestureMapper) -> Self {
        self.mapper = mapper;
        self
    }

    /// Minimum volume change before a new level is applied.
    pub fn with_hysteresis(mut self, band: f64) -> Self {
        self.hysteresis = band;
        self
    }

    /// Mirror frames horizontally before detection (default on).
    pub fn with_mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    /// Stop after this many frames.
    pub fn with_max_frames(mut self, max_frames: Option<u64>) -> Self {
        self.max_frames = max_frames;
        self
    }

    pub fn report(&self) -> &LoopReport {
        &self.report
    }

    pub fn volume_state(&self) -> VolumeState {
        self.volume_state
    }

    /// Run one iteration.
    pub fn step(&mut self) -> LoopState {
        let mut frame = match self.source.next_frame() {
            Ok(frame) => frame,
            Err(e) => {
                log::error!("failed to capture frame from {}: {:#}", self.source.describe(), e);
                return LoopState::Terminating(StopReason::FrameUnavailable);
            }
        };
        self.report.frames += 1;
        self.check_source_health();

        if self.mirror {
            frame.mirror_horizontal();
        }

        let hands = match self.detector.detect(&frame) {
            Ok(hands) => hands,
            Err(e) => {
                log::warn!("hand detection failed on frame {}: {:#}", frame.sequence, e);
                self.report.recoverable_errors += 1;
                Vec::new()
            }
        };

        for hand in &hands {
            self.report.hands_seen += 1;
            if let Err(e) = self.apply_hand(hand) {
                log::warn!("{} hand gesture not applied: {:#}", hand.handedness, e);
                self.report.recoverable_errors += 1;
            }
            annotate_hand(&mut frame, hand);
        }

        if let Err(e) = self.display.show(&frame) {
            log::warn!("failed to show frame {}: {:#}", frame.sequence, e);
            self.report.recoverable_errors += 1;
        }

        self.log_health();

        if self.display.quit_requested() {
            log::info!("quit requested");
            return LoopState::Terminating(StopReason::QuitRequested);
        }
        if self.max_frames.is_some_and(|max| self.report.frames >= max) {
            log::info!("frame limit of {} reached", self.report.frames);
            return LoopState::Terminating(StopReason::FrameLimit);
        }
        LoopState::Running
    }

    /// Iterate until the loop terminates, then release resources.
    pub fn run(mut self) -> LoopReport {
        log::info!(
            "control loop running: source={} detector={} brightness={} volume={}",
            self.source.describe(),
            self.detector.name(),
            self.brightness.name(),
            self.volume.name()
        );
        let reason = loop {
            if let LoopState::Terminating(reason) = self.step() {
                break reason;
            }
        };
        self.report.stop_reason = Some(reason);
        self.shutdown();
        std::mem::take(&mut self.report)
    }

    fn apply_hand(&mut self, hand: &HandObservation) -> Result<()> {
        let command = match self.mapper.command_for(hand) {
            Ok(command) => command,
            Err(reason) => {
                log::debug!("skipping {} hand: {:?}", hand.handedness, reason);
                self.report.hands_skipped += 1;
                return Ok(());
            }
        };

        match command {
            ControlCommand::Brightness(percent) => {
                self.brightness
                    .set_brightness(percent)
                    .with_context(|| format!("{} brightness", self.brightness.name()))?;
                self.report.brightness_updates += 1;
                log::info!("brightness set to {}%", percent);
            }
            ControlCommand::Volume(level) => {
                let Some(next) = self.volume_state.advance(level, self.hysteresis) else {
                    return Ok(());
                };
                self.volume
                    .set_volume(level)
                    .with_context(|| format!("{} volume", self.volume.name()))?;
                self.volume_state = next;
                self.report.volume_updates += 1;
                log::info!("volume set to {}%", volume_percent(level));
            }
        }
        Ok(())
    }

    fn check_source_health(&mut self) {
        let healthy = self.source.is_healthy();
        if healthy == self.source_healthy {
            return;
        }
        self.source_healthy = healthy;
        if healthy {
            log::info!("{} recovered", self.source.describe());
        } else {
            log::warn!("{} reports unhealthy", self.source.describe());
            self.report.source_stalls += 1;
        }
    }

    fn log_health(&mut self) {
        if self.last_health_log.elapsed() < HEALTH_LOG_INTERVAL {
            return;
        }
        log::info!(
            "health: source={} frames={} hands={} brightness_updates={} volume_updates={} errors={}",
            if self.source_healthy { "ok" } else { "stalled" },
            self.report.frames,
            self.report.hands_seen,
            self.report.brightness_updates,
            self.report.volume_updates,
            self.report.recoverable_errors
        );
        self.last_health_log = Instant::now();
    }

    fn shutdown(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.source.release();
        self.display.close();
    }
}

impl Drop for ControlLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}
