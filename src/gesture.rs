//! Gesture mapping.
//!
//! Turns the thumb/index pinch distance of a detected hand into a control
//! command: the left hand drives display brightness, the right hand drives
//! audio volume. Distances are mapped with clamped linear interpolation over a
//! configurable pixel range.
//!
//! Volume updates pass through a hysteresis band (`VolumeState`) so landmark
//! jitter does not cause a stream of tiny volume changes. Brightness has no
//! such band.

use crate::detect::{HandObservation, Handedness};

/// Absorbs float error when comparing a rounded volume delta against the band.
const BAND_EPSILON: f64 = 1e-9;

/// Pinch distance range (in pixels) mapped onto a control's full scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistanceRange {
    /// Distance at (and below) which the control is at its minimum.
    pub near: f64,
    /// Distance at (and above) which the control is at its maximum.
    pub far: f64,
}

impl DistanceRange {
    pub const fn new(near: f64, far: f64) -> Self {
        Self { near, far }
    }

    /// Position of `distance` within the range, clamped to 0..=1.
    pub fn fraction(&self, distance: f64) -> f64 {
        interpolate(distance, self.near, self.far, 0.0, 1.0)
    }
}

/// Default pinch range for brightness.
pub const BRIGHTNESS_RANGE: DistanceRange = DistanceRange::new(30.0, 220.0);

/// Default pinch range for volume.
pub const VOLUME_RANGE: DistanceRange = DistanceRange::new(30.0, 200.0);

/// Default minimum volume change before a new level is applied.
pub const VOLUME_HYSTERESIS: f64 = 0.05;

/// Piecewise-linear interpolation of `x` from `[x0, x1]` onto `[y0, y1]`.
///
/// Inputs outside `[x0, x1]` clamp to the nearest endpoint.
pub fn interpolate(x: f64, x0: f64, x1: f64, y0: f64, y1: f64) -> f64 {
    if x <= x0 {
        return y0;
    }
    if x >= x1 {
        return y1;
    }
    y0 + (x - x0) * (y1 - y0) / (x1 - x0)
}

/// Brightness percentage for a pinch distance, truncated to an integer.
pub fn brightness_percent(distance: f64, range: &DistanceRange) -> u8 {
    let value = interpolate(distance, range.near, range.far, 0.0, 100.0);
    value.clamp(0.0, 100.0) as u8
}

/// Volume scalar for a pinch distance, rounded to two decimals.
pub fn volume_level(distance: f64, range: &DistanceRange) -> f64 {
    let value = range.fraction(distance);
    (value * 100.0).round() / 100.0
}

/// Last volume level that was successfully applied.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VolumeState {
    last_applied: Option<f64>,
}

impl VolumeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_applied(&self) -> Option<f64> {
        self.last_applied
    }

    /// Decide whether `level` should be applied.
    ///
    /// Returns the state to adopt once `level` has been applied, or `None` when
    /// the change stays within `band` of the last applied level.
    ///
    /// The band is inclusive: a change of exactly `band` (0.50 to 0.55) is held,
    /// whatever float noise the two rounded levels carry.
    pub fn advance(self, level: f64, band: f64) -> Option<VolumeState> {
        let apply = match self.last_applied {
            None => true,
            Some(last) => (level - last).abs() > band + BAND_EPSILON,
        };
        apply.then_some(VolumeState {
            last_applied: Some(level),
        })
    }
}

/// Control action derived from one hand.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ControlCommand {
    /// Set display brightness to this percentage.
    Brightness(u8),
    /// Request master volume at this level (before hysteresis).
    Volume(f64),
}

/// Why a hand produced no command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    MissingThumbTip,
    MissingIndexTip,
}

/// Stateless mapping from hand observations to control commands.
#[derive(Clone, Debug, PartialEq)]
pub struct GestureMapper {
    pub brightness_range: DistanceRange,
    pub volume_range: DistanceRange,
}

impl Default for GestureMapper {
    fn default() -> Self {
        Self {
            brightness_range: BRIGHTNESS_RANGE,
            volume_range: VOLUME_RANGE,
        }
    }
}

impl GestureMapper {
    pub fn new(brightness_range: DistanceRange, volume_range: DistanceRange) -> Self {
        Self {
            brightness_range,
            volume_range,
        }
    }

    /// Command for a hand, or the reason the hand cannot be used.
    pub fn command_for(&self, hand: &HandObservation) -> Result<ControlCommand, SkipReason> {
        let thumb = hand
            .landmark(crate::detect::THUMB_TIP)
            .ok_or(SkipReason::MissingThumbTip)?;
        let index = hand
            .landmark(crate::detect::INDEX_FINGER_TIP)
            .ok_or(SkipReason::MissingIndexTip)?;
        let distance = thumb.distance(&index);

        Ok(match hand.handedness {
            Handedness::Left => {
                ControlCommand::Brightness(brightness_percent(distance, &self.brightness_range))
            }
            Handedness::Right => {
                ControlCommand::Volume(volume_level(distance, &self.volume_range))
            }
        })
    }
}
