use std::process::Command;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};

use super::{volume_percent, VolumeControl};

/// Command-line mixer used to set the master volume.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mixer {
    /// PulseAudio / PipeWire (`pactl set-sink-volume @DEFAULT_SINK@ N%`).
    Pactl,
    /// ALSA (`amixer -q sset Master N%`).
    Amixer,
}

impl Mixer {
    pub fn program(&self) -> &'static str {
        match self {
            Mixer::Pactl => "pactl",
            Mixer::Amixer => "amixer",
        }
    }

    /// Arguments that set the master volume to `level`.
    pub fn args(&self, level: f64) -> Vec<String> {
        let percent = format!("{}%", volume_percent(level));
        match self {
            Mixer::Pactl => vec![
                "set-sink-volume".to_string(),
                "@DEFAULT_SINK@".to_string(),
                percent,
            ],
            Mixer::Amixer => vec![
                "-q".to_string(),
                "sset".to_string(),
                "Master".to_string(),
                percent,
            ],
        }
    }
}

impl FromStr for Mixer {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pactl" | "pulse" | "pipewire" => Ok(Mixer::Pactl),
            "amixer" | "alsa" => Ok(Mixer::Amixer),
            other => Err(anyhow!("unknown mixer '{}' (expected pactl or amixer)", other)),
        }
    }
}

/// Master volume through an external mixer command.
#[derive(Debug)]
pub struct MixerVolume {
    mixer: Mixer,
}

impl MixerVolume {
    pub fn new(mixer: Mixer) -> Self {
        Self { mixer }
    }

    pub fn mixer(&self) -> Mixer {
        self.mixer
    }
}

impl VolumeControl for MixerVolume {
    fn name(&self) -> &'static str {
        self.mixer.program()
    }

    fn set_volume(&mut self, level: f64) -> Result<()> {
        let program = self.mixer.program();
        let args = self.mixer.args(level);
        let output = Command::new(program)
            .args(&args)
            .output()
            .with_context(|| format!("failed to run {}", program))?;
        if !output.status.success() {
            return Err(anyhow!(
                "{} {} failed ({}): {}",
                program,
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(())
    }
}
