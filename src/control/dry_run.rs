use anyhow::Result;

use super::{volume_percent, BrightnessControl, VolumeControl};

/// Sink that only logs what it would have done.
#[derive(Debug, Default)]
pub struct DryRun {
    pub brightness: Option<u8>,
    pub volume: Option<f64>,
}

impl DryRun {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BrightnessControl for DryRun {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    fn set_brightness(&mut self, percent: u8) -> Result<()> {
        log::debug!("dry-run: brightness {}%", percent);
        self.brightness = Some(percent);
        Ok(())
    }
}

impl VolumeControl for DryRun {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    fn set_volume(&mut self, level: f64) -> Result<()> {
        log::debug!("dry-run: volume {}%", volume_percent(level));
        self.volume = Some(level);
        Ok(())
    }
}
