use anyhow::Result;

use crate::detect::result::HandObservation;
use crate::frame::Frame;

/// Hand landmark detector backend.
///
/// Backends receive the already-mirrored frame and return every hand they found
/// whose confidence meets their configured minimum. Landmark coordinates are in
/// the pixel space of the frame that was passed in.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<HandObservation>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<B: DetectorBackend + ?Sized> DetectorBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<HandObservation>> {
        (**self).detect(frame)
    }

    fn warm_up(&mut self) -> Result<()> {
        (**self).warm_up()
    }
}
