//! Preview display.
//!
//! The display shows each annotated frame and tells the control loop when the
//! user asked to quit. `HeadlessDisplay` is used when no window is wanted and
//! quits on Ctrl-C; `WindowDisplay` (feature: display-minifb) opens a window and
//! quits on `q` or when the window is closed.

mod overlay;
#[cfg(feature = "display-minifb")]
mod window;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;

use crate::frame::Frame;

pub use overlay::{annotate_hand, hand_color};
#[cfg(feature = "display-minifb")]
pub use window::WindowDisplay;

pub const WINDOW_TITLE: &str = "Hand Gesture Control";

/// Shows frames and reports quit requests.
pub trait DisplaySink {
    /// Render a frame.
    fn show(&mut self, frame: &Frame) -> Result<()>;

    /// True once the user asked to stop.
    fn quit_requested(&mut self) -> bool;

    /// Close any windows. Called once when the loop terminates.
    fn close(&mut self) {}
}

impl<D: DisplaySink + ?Sized> DisplaySink for Box<D> {
    fn show(&mut self, frame: &Frame) -> Result<()> {
        (**self).show(frame)
    }

    fn quit_requested(&mut self) -> bool {
        (**self).quit_requested()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Display without a window. Quits when the shared flag is raised.
#[derive(Debug, Clone, Default)]
pub struct HeadlessDisplay {
    quit: Arc<AtomicBool>,
    frames_shown: u64,
}

impl HeadlessDisplay {
    pub fn new(quit: Arc<AtomicBool>) -> Self {
        Self {
            quit,
            frames_shown: 0,
        }
    }

    /// Flag that stops the loop when set (wired to Ctrl-C by the binary).
    pub fn quit_flag(&self) -> Arc<AtomicBool> {
        self.quit.clone()
    }

    pub fn frames_shown(&self) -> u64 {
        self.frames_shown
    }
}

impl DisplaySink for HeadlessDisplay {
    fn show(&mut self, _frame: &Frame) -> Result<()> {
        self.frames_shown += 1;
        Ok(())
    }

    fn quit_requested(&mut self) -> bool {
        self.quit.load(Ordering::SeqCst)
    }
}
