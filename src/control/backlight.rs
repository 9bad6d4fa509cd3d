use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use super::BrightnessControl;

pub const DEFAULT_BACKLIGHT_ROOT: &str = "/sys/class/backlight";

/// Brightness through a Linux sysfs backlight device.
///
/// Writes `percent * max_brightness / 100` to `<device>/brightness`. The
/// process needs write access to that file (udev rule or `video` group).
#[derive(Debug)]
pub struct SysfsBacklight {
    device: PathBuf,
    max_brightness: u32,
}

impl SysfsBacklight {
    /// Open a specific backlight device directory.
    pub fn open<P: AsRef<Path>>(device: P) -> Result<Self> {
        let device = device.as_ref().to_path_buf();
        let max_path = device.join("max_brightness");
        let raw = fs::read_to_string(&max_path)
            .with_context(|| format!("failed to read {}", max_path.display()))?;
        let max_brightness: u32 = raw
            .trim()
            .parse()
            .map_err(|_| anyhow!("invalid max_brightness in {}: {:?}", max_path.display(), raw))?;
        if max_brightness == 0 {
            return Err(anyhow!("{} reports max_brightness 0", device.display()));
        }
        log::info!(
            "backlight: using {} (max_brightness={})",
            device.display(),
            max_brightness
        );
        Ok(Self {
            device,
            max_brightness,
        })
    }

    /// Open the first backlight device (by name) under `root`.
    pub fn discover<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        let mut devices: Vec<PathBuf> = fs::read_dir(root)
            .with_context(|| format!("failed to list {}", root.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.join("max_brightness").exists())
            .collect();
        devices.sort();
        let device = devices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("no backlight devices under {}", root.display()))?;
        Self::open(device)
    }

    pub fn device(&self) -> &Path {
        &self.device
    }

    fn raw_value(&self, percent: u8) -> u32 {
        let percent = u64::from(percent.min(100));
        (percent * u64::from(self.max_brightness) / 100) as u32
    }
}

impl BrightnessControl for SysfsBacklight {
    fn name(&self) -> &'static str {
        "sysfs"
    }

    fn set_brightness(&mut self, percent: u8) -> Result<()> {
        let path = self.device.join("brightness");
        let value = self.raw_value(percent);
        fs::write(&path, value.to_string())
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}
