//! gesture-control
//!
//! Webcam hand-gesture controller: the pinch distance between thumb tip and
//! index finger tip of the left hand sets display brightness, the same pinch on
//! the right hand sets master audio volume.
//!
//! # Module Structure
//!
//! - `frame`: RGB frames and pixel access
//! - `ingest`: frame sources (V4L2 cameras, synthetic `stub://`)
//! - `detect`: hand landmark detector backends and the hand data model
//! - `gesture`: pinch distance → brightness / volume mapping, volume hysteresis
//! - `control`: OS brightness and volume sinks
//! - `display`: preview window / headless display and frame annotation
//! - `control_loop`: the single-threaded capture/control loop
//! - `config`: file + environment configuration

pub mod config;
pub mod control;
pub mod control_loop;
pub mod detect;
pub mod display;
pub mod frame;
pub mod gesture;
pub mod ingest;

pub use control_loop::{ControlLoop, LoopReport, LoopState, StopReason};
pub use detect::{HandObservation, Handedness, Point};
pub use frame::{Frame, Rgb};
pub use gesture::{
    brightness_percent, volume_level, ControlCommand, DistanceRange, GestureMapper, VolumeState,
};
