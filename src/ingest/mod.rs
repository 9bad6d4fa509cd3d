//! Frame ingestion sources.
//!
//! - USB/V4L2 cameras (feature: ingest-v4l2)
//! - Synthetic `stub://` source (always available, used by tests and demos)
//!
//! All sources produce RGB24 `Frame`s at (or near) the requested resolution.
//! Device pixel formats are normalized to RGB24 at capture time.

#[cfg_attr(not(feature = "ingest-v4l2"), allow(dead_code))]
mod normalize;
pub mod v4l2;

use anyhow::Result;

use crate::frame::Frame;

pub use v4l2::{V4l2Config, V4l2Source, V4l2Stats};

/// A blocking source of frames.
pub trait FrameSource {
    /// Short description for logs (device path or URL).
    fn describe(&self) -> String;

    /// Block until the next frame is available.
    ///
    /// An error means the source can no longer deliver frames.
    fn next_frame(&mut self) -> Result<Frame>;

    /// False while the source is stalled or has reported an error.
    fn is_healthy(&self) -> bool {
        true
    }

    /// Release the underlying device. Further `next_frame` calls fail.
    fn release(&mut self) {}
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn next_frame(&mut self) -> Result<Frame> {
        (**self).next_frame()
    }

    fn is_healthy(&self) -> bool {
        (**self).is_healthy()
    }

    fn release(&mut self) {
        (**self).release()
    }
}
