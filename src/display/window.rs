#![cfg(feature = "display-minifb")]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use minifb::{Key, Window, WindowOptions};

use super::DisplaySink;
use crate::frame::Frame;

/// Preview window backed by minifb (software framebuffer, no GPU).
pub struct WindowDisplay {
    window: Option<Window>,
    buffer: Vec<u32>,
    width: usize,
    height: usize,
    quit: Arc<AtomicBool>,
}

impl WindowDisplay {
    /// Open the window. `quit` is also honoured, so Ctrl-C stops a windowed run.
    pub fn open(title: &str, width: u32, height: u32, quit: Arc<AtomicBool>) -> Result<Self> {
        let (width, height) = (width as usize, height as usize);
        let window = Window::new(title, width, height, WindowOptions::default())
            .map_err(|e| anyhow!("failed to open window: {}", e))?;
        Ok(Self {
            window: Some(window),
            buffer: vec![0; width * height],
            width,
            height,
            quit,
        })
    }
}

impl DisplaySink for WindowDisplay {
    fn show(&mut self, frame: &Frame) -> Result<()> {
        let Some(window) = self.window.as_mut() else {
            return Err(anyhow!("window already closed"));
        };
        let (w, h) = (frame.width as usize, frame.height as usize);
        if w != self.width || h != self.height {
            self.width = w;
            self.height = h;
            self.buffer = vec![0; w * h];
        }
        for (dst, px) in self.buffer.iter_mut().zip(frame.as_rgb().chunks_exact(3)) {
            *dst = (u32::from(px[0]) << 16) | (u32::from(px[1]) << 8) | u32::from(px[2]);
        }
        window
            .update_with_buffer(&self.buffer, w, h)
            .map_err(|e| anyhow!("failed to update window: {}", e))
    }

    fn quit_requested(&mut self) -> bool {
        if self.quit.load(Ordering::SeqCst) {
            return true;
        }
        match &self.window {
            Some(window) => !window.is_open() || window.is_key_down(Key::Q),
            None => true,
        }
    }

    fn close(&mut self) {
        if self.window.take().is_some() {
            log::info!("preview window closed");
        }
    }
}
