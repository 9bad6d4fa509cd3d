use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use gesture_control::control::{BrightnessControl, VolumeControl};
use gesture_control::detect::{DetectorBackend, StubBackend, INDEX_FINGER_TIP, THUMB_TIP};
use gesture_control::display::{DisplaySink, HeadlessDisplay};
use gesture_control::ingest::{FrameSource, V4l2Config, V4l2Source};
use gesture_control::{
    ControlLoop, Frame, HandObservation, Handedness, LoopState, Point, Rgb, StopReason,
};

/// Source that yields `frames` frames and then fails.
struct ScriptedSource {
    remaining: u64,
    sequence: u64,
    released: Arc<Mutex<bool>>,
}

impl FrameSource for ScriptedSource {
    fn describe(&self) -> String {
        "scripted".to_string()
    }

    fn next_frame(&mut self) -> Result<Frame> {
        if self.remaining == 0 {
            return Err(anyhow!("end of script"));
        }
        self.remaining -= 1;
        self.sequence += 1;
        Frame::filled(320, 240, Rgb(10, 10, 10), self.sequence)
    }

    fn release(&mut self) {
        *self.released.lock().unwrap() = true;
    }
}

#[derive(Clone, Default)]
struct Recorder {
    brightness: Arc<Mutex<Vec<u8>>>,
    volume: Arc<Mutex<Vec<f64>>>,
}

impl BrightnessControl for Recorder {
    fn name(&self) -> &'static str {
        "recorder"
    }

    fn set_brightness(&mut self, percent: u8) -> Result<()> {
        self.brightness.lock().unwrap().push(percent);
        Ok(())
    }
}

impl VolumeControl for Recorder {
    fn name(&self) -> &'static str {
        "recorder"
    }

    fn set_volume(&mut self, level: f64) -> Result<()> {
        self.volume.lock().unwrap().push(level);
        Ok(())
    }
}

/// Volume sink that fails the first call.
struct FlakyVolume {
    calls: Arc<Mutex<Vec<f64>>>,
}

impl VolumeControl for FlakyVolume {
    fn name(&self) -> &'static str {
        "flaky"
    }

    fn set_volume(&mut self, level: f64) -> Result<()> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(level);
        if calls.len() == 1 {
            return Err(anyhow!("mixer unavailable"));
        }
        Ok(())
    }
}

/// Display that asks to quit after `quit_after` frames.
struct CountingDisplay {
    shown: u64,
    quit_after: Option<u64>,
    closed: Arc<Mutex<bool>>,
}

impl DisplaySink for CountingDisplay {
    fn show(&mut self, _frame: &Frame) -> Result<()> {
        self.shown += 1;
        Ok(())
    }

    fn quit_requested(&mut self) -> bool {
        self.quit_after.is_some_and(|n| self.shown >= n)
    }

    fn close(&mut self) {
        *self.closed.lock().unwrap() = true;
    }
}

struct FailingDetector;

impl DetectorBackend for FailingDetector {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<HandObservation>> {
        Err(anyhow!("model exploded"))
    }
}

fn pinch(side: Handedness, distance: f64) -> HandObservation {
    HandObservation::new(side, 0.9)
        .with_landmark(THUMB_TIP, Point::new(100.0, 100.0))
        .with_landmark(INDEX_FINGER_TIP, Point::new(100.0, 100.0 + distance))
}

struct Harness {
    recorder: Recorder,
    released: Arc<Mutex<bool>>,
    closed: Arc<Mutex<bool>>,
}

fn build(
    frames: u64,
    detector: Box<dyn DetectorBackend>,
    quit_after: Option<u64>,
) -> (ControlLoop, Harness) {
    let released = Arc::new(Mutex::new(false));
    let closed = Arc::new(Mutex::new(false));
    let recorder = Recorder::default();
    let control_loop = ControlLoop::new(
        Box::new(ScriptedSource {
            remaining: frames,
            sequence: 0,
            released: released.clone(),
        }),
        detector,
        Box::new(recorder.clone()),
        Box::new(recorder.clone()),
        Box::new(CountingDisplay {
            shown: 0,
            quit_after,
            closed: closed.clone(),
        }),
    );
    (
        control_loop,
        Harness {
            recorder,
            released,
            closed,
        },
    )
}

#[test]
fn dispatches_by_hand_side() {
    let detector = StubBackend::scripted(vec![
        vec![pinch(Handedness::Left, 150.0)],
        vec![pinch(Handedness::Right, 150.0)],
        vec![pinch(Handedness::Left, 30.0), pinch(Handedness::Right, 300.0)],
    ]);
    let (control_loop, harness) = build(3, Box::new(detector), None);

    let report = control_loop.run();

    assert_eq!(report.stop_reason, Some(StopReason::FrameUnavailable));
    assert_eq!(report.frames, 3);
    assert_eq!(report.hands_seen, 4);
    assert_eq!(*harness.recorder.brightness.lock().unwrap(), vec![63, 0]);
    assert_eq!(*harness.recorder.volume.lock().unwrap(), vec![0.71, 1.0]);
    assert!(*harness.released.lock().unwrap());
    assert!(*harness.closed.lock().unwrap());
}

#[test]
fn volume_jitter_is_suppressed() {
    // 0.50, 0.54 (hold), 0.56 (apply), 0.52 (hold), 0.50 (apply)
    let distances = [115.0, 121.8, 125.2, 118.4, 115.0];
    let script = distances
        .iter()
        .map(|d| vec![pinch(Handedness::Right, *d)])
        .collect();
    let (control_loop, harness) = build(5, Box::new(StubBackend::scripted(script)), None);

    let report = control_loop.run();

    assert_eq!(*harness.recorder.volume.lock().unwrap(), vec![0.5, 0.56, 0.5]);
    assert_eq!(report.volume_updates, 3);
}

#[test]
fn brightness_is_applied_every_frame() {
    let script = (0..4).map(|_| vec![pinch(Handedness::Left, 150.0)]).collect();
    let (control_loop, harness) = build(4, Box::new(StubBackend::scripted(script)), None);

    control_loop.run();

    assert_eq!(*harness.recorder.brightness.lock().unwrap(), vec![63; 4]);
}

#[test]
fn missing_index_tip_does_not_stop_the_loop() {
    let partial = HandObservation::new(Handedness::Right, 0.9)
        .with_landmark(THUMB_TIP, Point::new(100.0, 100.0));
    let detector = StubBackend::scripted(vec![
        vec![partial],
        vec![pinch(Handedness::Right, 200.0)],
    ]);
    let (mut control_loop, harness) = build(2, Box::new(detector), None);

    assert_eq!(control_loop.step(), LoopState::Running);
    assert_eq!(control_loop.report().hands_skipped, 1);
    assert!(harness.recorder.volume.lock().unwrap().is_empty());

    assert_eq!(control_loop.step(), LoopState::Running);
    assert_eq!(*harness.recorder.volume.lock().unwrap(), vec![1.0]);

    assert_eq!(
        control_loop.step(),
        LoopState::Terminating(StopReason::FrameUnavailable)
    );
    assert_eq!(control_loop.report().recoverable_errors, 0);
}

#[test]
fn quit_key_terminates_and_releases() {
    let (control_loop, harness) = build(100, Box::new(StubBackend::scripted(vec![])), Some(2));

    let report = control_loop.run();

    assert_eq!(report.stop_reason, Some(StopReason::QuitRequested));
    assert_eq!(report.frames, 2);
    assert!(*harness.released.lock().unwrap());
    assert!(*harness.closed.lock().unwrap());
}

#[test]
fn detector_errors_are_recoverable() {
    let (control_loop, _harness) = build(3, Box::new(FailingDetector), None);

    let report = control_loop.run();

    assert_eq!(report.frames, 3);
    assert_eq!(report.recoverable_errors, 3);
    assert_eq!(report.stop_reason, Some(StopReason::FrameUnavailable));
}

#[test]
fn failed_volume_update_is_retried_next_frame() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let script = (0..2).map(|_| vec![pinch(Handedness::Right, 150.0)]).collect();
    let control_loop = ControlLoop::new(
        Box::new(ScriptedSource {
            remaining: 2,
            sequence: 0,
            released: Arc::new(Mutex::new(false)),
        }),
        Box::new(StubBackend::scripted(script)),
        Box::new(Recorder::default()),
        Box::new(FlakyVolume {
            calls: calls.clone(),
        }),
        Box::new(HeadlessDisplay::default()),
    );

    let report = control_loop.run();

    // The failed level was not remembered, so the same level is applied again.
    assert_eq!(*calls.lock().unwrap(), vec![0.71, 0.71]);
    assert_eq!(report.volume_updates, 1);
    assert_eq!(report.recoverable_errors, 1);
}

#[test]
fn dropping_the_loop_releases_resources() {
    let (mut control_loop, harness) = build(5, Box::new(StubBackend::scripted(vec![])), None);
    assert_eq!(control_loop.step(), LoopState::Running);
    drop(control_loop);
    assert!(*harness.released.lock().unwrap());
    assert!(*harness.closed.lock().unwrap());
}

#[test]
fn synthetic_camera_with_sweep_detector() -> Result<()> {
    let mut source = V4l2Source::new(V4l2Config {
        device: "stub://sweep".to_string(),
        target_fps: 30,
        width: 640,
        height: 360,
    })?;
    source.connect()?;
    let recorder = Recorder::default();

    let report = ControlLoop::new(
        Box::new(source),
        Box::new(StubBackend::new()),
        Box::new(recorder.clone()),
        Box::new(recorder.clone()),
        Box::new(HeadlessDisplay::default()),
    )
    .with_max_frames(Some(200))
    .run();

    assert_eq!(report.stop_reason, Some(StopReason::FrameLimit));
    assert_eq!(report.frames, 200);
    // First 100 frames are the left hand, the next 100 the right hand.
    assert_eq!(recorder.brightness.lock().unwrap().len(), 100);
    let brightness = recorder.brightness.lock().unwrap();
    assert_eq!(brightness.iter().max(), Some(&100));
    assert_eq!(brightness.first(), Some(&0));
    let volume = recorder.volume.lock().unwrap();
    assert!(!volume.is_empty());
    assert!(volume.len() < 100);
    Ok(())
}

const RED: Rgb = Rgb(255, 0, 0);
const BLACK: Rgb = Rgb(0, 0, 0);

/// Source of 4x2 black frames with a red pixel in the top-left corner.
/// `health` gives `is_healthy` after each frame, in order.
struct MarkedSource {
    sequence: u64,
    health: Vec<bool>,
}

impl MarkedSource {
    fn new(health: Vec<bool>) -> Self {
        Self {
            sequence: 0,
            health,
        }
    }
}

impl FrameSource for MarkedSource {
    fn describe(&self) -> String {
        "marked".to_string()
    }

    fn next_frame(&mut self) -> Result<Frame> {
        if self.sequence as usize >= self.health.len() {
            return Err(anyhow!("end of script"));
        }
        self.sequence += 1;
        let mut frame = Frame::filled(4, 2, BLACK, self.sequence)?;
        frame.put_pixel(0, 0, RED);
        Ok(frame)
    }

    fn is_healthy(&self) -> bool {
        match self.sequence {
            0 => true,
            n => self.health[n as usize - 1],
        }
    }
}

/// Detector that records the top row corners of each frame it is given.
struct CornerRecorder {
    seen: Arc<Mutex<Vec<(Option<Rgb>, Option<Rgb>)>>>,
}

impl DetectorBackend for CornerRecorder {
    fn name(&self) -> &'static str {
        "corners"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<HandObservation>> {
        self.seen
            .lock()
            .unwrap()
            .push((frame.pixel(0, 0), frame.pixel(frame.width - 1, 0)));
        Ok(Vec::new())
    }
}

fn corners_seen(mirror: Option<bool>) -> Vec<(Option<Rgb>, Option<Rgb>)> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut control_loop = ControlLoop::new(
        Box::new(MarkedSource::new(vec![true])),
        Box::new(CornerRecorder { seen: seen.clone() }),
        Box::new(Recorder::default()),
        Box::new(Recorder::default()),
        Box::new(HeadlessDisplay::default()),
    );
    if let Some(mirror) = mirror {
        control_loop = control_loop.with_mirror(mirror);
    }
    control_loop.run();
    let corners = seen.lock().unwrap().clone();
    corners
}

#[test]
fn frames_are_mirrored_before_detection() {
    assert_eq!(corners_seen(None), vec![(Some(BLACK), Some(RED))]);
    assert_eq!(corners_seen(Some(true)), vec![(Some(BLACK), Some(RED))]);
}

#[test]
fn mirroring_can_be_disabled() {
    assert_eq!(corners_seen(Some(false)), vec![(Some(RED), Some(BLACK))]);
}

#[test]
fn source_stalls_are_counted_once_per_outage() {
    let health = vec![true, false, false, true, false];
    let report = ControlLoop::new(
        Box::new(MarkedSource::new(health)),
        Box::new(StubBackend::scripted(vec![])),
        Box::new(Recorder::default()),
        Box::new(Recorder::default()),
        Box::new(HeadlessDisplay::default()),
    )
    .run();

    assert_eq!(report.frames, 5);
    assert_eq!(report.source_stalls, 2);
    assert_eq!(report.stop_reason, Some(StopReason::FrameUnavailable));
}
