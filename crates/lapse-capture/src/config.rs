//! Capture configuration.
//!
//! Loaded from YAML, every field optional:
//!
//! ```yaml
//! source: ffmpeg        # or `synthetic`
//! area: { x: 0, y: 0, width: 1920, height: 1080 }
//! resolution: { width: 960, height: 540 }   # default: half the area
//! framerate: 30
//! display: ":0.0"
//! ffmpeg: /usr/bin/ffmpeg
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{CaptureError, CaptureResult};

/// Which [`CaptureSource`](crate::CaptureSource) to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// x11grab through an ffmpeg child process.
    #[default]
    Ffmpeg,
    /// Generated test pattern.
    Synthetic,
}

/// Screen rectangle to grab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureArea {
    /// Left edge in screen pixels.
    pub x: i32,
    /// Top edge in screen pixels.
    pub y: i32,
    /// Width in screen pixels.
    pub width: u32,
    /// Height in screen pixels.
    pub height: u32,
}

impl Default for CaptureArea {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            width: 1920,
            height: 1080,
        }
    }
}

/// Output frame size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Capture settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Source implementation.
    pub source: SourceKind,
    /// Screen area to grab.
    pub area: CaptureArea,
    /// Scaled output size; half the area when unset.
    pub resolution: Option<Resolution>,
    /// Frames per second requested from the grabber.
    pub framerate: u32,
    /// X display to grab from.
    pub display: String,
    /// ffmpeg executable.
    pub ffmpeg: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Ffmpeg,
            area: CaptureArea::default(),
            resolution: None,
            framerate: 30,
            display: ":0.0".into(),
            ffmpeg: "ffmpeg".into(),
        }
    }
}

impl CaptureConfig {
    /// Reads a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> CaptureResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&text)
    }

    /// Parses and validates YAML text.
    pub fn from_yaml_str(yaml: &str) -> CaptureResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes to YAML.
    pub fn to_yaml(&self) -> CaptureResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Size of the frames delivered by the source.
    pub fn output_resolution(&self) -> (u32, u32) {
        match self.resolution {
            Some(r) => (r.width, r.height),
            None => ((self.area.width / 2).max(1), (self.area.height / 2).max(1)),
        }
    }

    /// Checks that every size and rate is non-zero.
    pub fn validate(&self) -> CaptureResult<()> {
        if self.area.width == 0 || self.area.height == 0 {
            return Err(CaptureError::config(format!(
                "capture area {}x{} is empty",
                self.area.width, self.area.height
            )));
        }
        let (w, h) = self.output_resolution();
        if w == 0 || h == 0 {
            return Err(CaptureError::config(format!("output resolution {w}x{h} is empty")));
        }
        if self.framerate == 0 {
            return Err(CaptureError::config("framerate must be > 0"));
        }
        if self.source == SourceKind::Ffmpeg && self.ffmpeg.trim().is_empty() {
            return Err(CaptureError::config("ffmpeg path is empty"));
        }
        Ok(())
    }
}
