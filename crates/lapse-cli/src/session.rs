//! Session settings: YAML file merged with command-line overrides.
//!
//! ```yaml
//! capture:
//!   source: ffmpeg
//!   area: { x: 0, y: 0, width: 1920, height: 1080 }
//!   framerate: 30
//! delay_frames: 30
//! diff: directional
//! gray_diff: false
//! max_fps: 60
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};
use lapse_capture::{CaptureArea, CaptureConfig, Resolution, SourceKind};
use lapse_graph::{DiffMode, PresetOptions};
use serde::{Deserialize, Serialize};

/// Diff operator selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    /// `255 - (delayed - live)` per channel
    #[default]
    Directional,
    /// `|live - delayed|` per channel
    Absolute,
}

impl From<DiffKind> for DiffMode {
    fn from(kind: DiffKind) -> Self {
        match kind {
            DiffKind::Directional => DiffMode::Directional,
            DiffKind::Absolute => DiffMode::Absolute,
        }
    }
}

/// Contents of a `--config` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionFile {
    pub capture: CaptureConfig,
    pub delay_frames: usize,
    pub diff: DiffKind,
    pub gray_diff: bool,
    pub max_fps: Option<u32>,
}

impl Default for SessionFile {
    fn default() -> Self {
        let preset = PresetOptions::default();
        Self {
            capture: CaptureConfig::default(),
            delay_frames: preset.delay_frames,
            diff: DiffKind::default(),
            gray_diff: preset.gray_diff,
            max_fps: None,
        }
    }
}

impl SessionFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("Failed to read: {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("Invalid session file: {}", path.display()))
    }
}

/// Session flags shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct SessionArgs {
    /// Session file (YAML)
    #[arg(short, long)]
    pub config: Option<std::path::PathBuf>,

    /// Use the generated test pattern instead of screen capture
    #[arg(long)]
    pub synthetic: bool,

    /// Captured screen area, WIDTHxHEIGHT+X+Y
    #[arg(long, value_parser = parse_area)]
    pub area: Option<CaptureArea>,

    /// Sampled frame size, WIDTHxHEIGHT (default: half the area)
    #[arg(long, value_parser = parse_size)]
    pub size: Option<Resolution>,

    /// Capture frame rate
    #[arg(long)]
    pub fps: Option<u32>,

    /// X11 display to capture
    #[arg(long)]
    pub display: Option<String>,

    /// Delay in frames
    #[arg(short, long)]
    pub delay: Option<usize>,

    /// Diff operator
    #[arg(long, value_enum)]
    pub diff: Option<DiffKind>,

    /// Diff the gray versions of both panels
    #[arg(long)]
    pub gray_diff: bool,

    /// Frame rate cap for the sampling loop
    #[arg(long)]
    pub max_fps: Option<u32>,
}

/// Fully resolved session.
#[derive(Debug, Clone)]
pub struct Session {
    pub capture: CaptureConfig,
    pub preset: PresetOptions,
    pub workers: usize,
    pub max_fps: Option<u32>,
}

impl Session {
    /// Loads the session file, if any, and applies flag overrides.
    pub fn resolve(args: &SessionArgs, workers: usize) -> Result<Self> {
        let file = match &args.config {
            Some(path) => SessionFile::load(path)?,
            None => SessionFile::default(),
        };
        Self::merge(file, args, workers)
    }

    pub fn merge(file: SessionFile, args: &SessionArgs, workers: usize) -> Result<Self> {
        let mut capture = file.capture;
        if args.synthetic {
            capture.source = SourceKind::Synthetic;
        }
        if let Some(area) = args.area {
            capture.area = area;
        }
        if let Some(size) = args.size {
            capture.resolution = Some(size);
        }
        if let Some(fps) = args.fps {
            capture.framerate = fps;
        }
        if let Some(display) = &args.display {
            capture.display = display.clone();
        }
        capture.validate().context("Invalid capture settings")?;

        let preset = PresetOptions {
            delay_frames: args.delay.unwrap_or(file.delay_frames),
            diff: args.diff.unwrap_or(file.diff).into(),
            gray_diff: args.gray_diff || file.gray_diff,
        };

        Ok(Self {
            capture,
            preset,
            workers,
            max_fps: args.max_fps.or(file.max_fps),
        })
    }
}

/// Parses `WIDTHxHEIGHT`.
pub fn parse_size(s: &str) -> Result<Resolution> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .with_context(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let width: u32 = w.trim().parse().with_context(|| format!("bad width '{w}'"))?;
    let height: u32 = h.trim().parse().with_context(|| format!("bad height '{h}'"))?;
    if width == 0 || height == 0 {
        bail!("size {width}x{height} is empty");
    }
    Ok(Resolution { width, height })
}

/// Parses `WIDTHxHEIGHT+X+Y`; the offset is optional.
pub fn parse_area(s: &str) -> Result<CaptureArea> {
    let (size, offset) = match s.split_once('+') {
        Some((size, offset)) => (size, Some(offset)),
        None => (s, None),
    };
    let Resolution { width, height } = parse_size(size)?;
    let (x, y) = match offset {
        Some(offset) => {
            let (x, y) = offset
                .split_once('+')
                .with_context(|| format!("expected +X+Y offset, got '+{offset}'"))?;
            let x: i32 = x.trim().parse().with_context(|| format!("bad x offset '{x}'"))?;
            let y: i32 = y.trim().parse().with_context(|| format!("bad y offset '{y}'"))?;
            (x, y)
        }
        None => (0, 0),
    };
    Ok(CaptureArea { x, y, width, height })
}
