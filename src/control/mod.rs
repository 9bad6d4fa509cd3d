//! OS control sinks.
//!
//! - `BrightnessControl`: display brightness as an integer percentage.
//! - `VolumeControl`: master volume as a scalar in 0.0..=1.0.
//!
//! Backends:
//! - `SysfsBacklight`: Linux `/sys/class/backlight` devices
//! - `MixerVolume`: `pactl` (PulseAudio/PipeWire) or `amixer` (ALSA)
//! - `DryRun`: logs the requested value and touches nothing

mod backlight;
mod dry_run;
mod mixer;

use anyhow::Result;

pub use backlight::{SysfsBacklight, DEFAULT_BACKLIGHT_ROOT};
pub use dry_run::DryRun;
pub use mixer::{Mixer, MixerVolume};

/// Sets display brightness.
pub trait BrightnessControl {
    fn name(&self) -> &'static str;

    /// Apply a brightness percentage (0..=100).
    fn set_brightness(&mut self, percent: u8) -> Result<()>;
}

/// Sets master audio volume.
pub trait VolumeControl {
    fn name(&self) -> &'static str;

    /// Apply a master volume level (0.0..=1.0).
    fn set_volume(&mut self, level: f64) -> Result<()>;
}

impl<C: BrightnessControl + ?Sized> BrightnessControl for Box<C> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn set_brightness(&mut self, percent: u8) -> Result<()> {
        (**self).set_brightness(percent)
    }
}

impl<C: VolumeControl + ?Sized> VolumeControl for Box<C> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn set_volume(&mut self, level: f64) -> Result<()> {
        (**self).set_volume(level)
    }
}

/// Volume level as a whole percentage, the unit mixers expect.
pub(crate) fn volume_percent(level: f64) -> u8 {
    (level.clamp(0.0, 1.0) * 100.0).round() as u8
}
