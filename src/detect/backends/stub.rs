use std::collections::VecDeque;

use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{HandObservation, Handedness, Point, INDEX_FINGER_TIP, THUMB_TIP};
use crate::frame::Frame;

const STUB_CONFIDENCE: f32 = 0.9;
const SWEEP_MAX_PX: f64 = 250.0;
const SWEEP_STEP_PX: f64 = 5.0;

/// Stub backend for testing and demos.
///
/// In sweep mode it reports a single hand whose pinch opens and closes across
/// 0..250 px, switching sides after every full open/close cycle. In scripted
/// mode it replays a fixed list of per-frame results and then reports no hands.
pub struct StubBackend {
    mode: StubMode,
    min_confidence: f32,
}

enum StubMode {
    Sweep { frame_count: u64 },
    Scripted(VecDeque<Vec<HandObservation>>),
}

impl StubBackend {
    pub fn new() -> Self {
        Self {
            mode: StubMode::Sweep { frame_count: 0 },
            min_confidence: 0.0,
        }
    }

    pub fn scripted(frames: Vec<Vec<HandObservation>>) -> Self {
        Self {
            mode: StubMode::Scripted(frames.into()),
            min_confidence: 0.0,
        }
    }

    /// Drop hands below `min_confidence`, as a real detector would.
    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    fn sweep_hand(frame_count: u64, frame: &Frame) -> HandObservation {
        let steps_per_leg = (SWEEP_MAX_PX / SWEEP_STEP_PX) as u64;
        let cycle = steps_per_leg * 2;
        let phase = frame_count % cycle;
        let step = if phase < steps_per_leg {
            phase
        } else {
            cycle - phase
        };
        let distance = step as f64 * SWEEP_STEP_PX;

        let handedness = if (frame_count / cycle) % 2 == 0 {
            Handedness::Left
        } else {
            Handedness::Right
        };

        let cx = frame.width as f64 / 2.0;
        let cy = frame.height as f64 / 3.0;
        HandObservation::new(handedness, STUB_CONFIDENCE)
            .with_landmark(0, Point::new(cx, cy + SWEEP_MAX_PX + 60.0))
            .with_landmark(THUMB_TIP, Point::new(cx, cy))
            .with_landmark(INDEX_FINGER_TIP, Point::new(cx, cy + distance))
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<HandObservation>> {
        let hands = match &mut self.mode {
            StubMode::Sweep { frame_count } => {
                let hand = Self::sweep_hand(*frame_count, frame);
                *frame_count += 1;
                vec![hand]
            }
            StubMode::Scripted(script) => script.pop_front().unwrap_or_default(),
        };
        let min_confidence = self.min_confidence;
        Ok(hands
            .into_iter()
            .filter(|hand| hand.confidence >= min_confidence)
            .collect())
    }
}
