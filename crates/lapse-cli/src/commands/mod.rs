//! CLI command implementations

pub mod headless;
pub mod info;
#[cfg(feature = "viewer")]
pub mod view;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use lapse_capture::{CaptureDevice, open_source};
use lapse_core::PixelBuffer;

use crate::session::Session;

/// Opens the capture source of `session` wrapped in a device.
pub fn open_device(session: &Session) -> Result<CaptureDevice> {
    let source = open_source(&session.capture).context("Failed to open capture source")?;
    Ok(CaptureDevice::new(source))
}

/// Writes an RGBA8 buffer as PNG.
pub fn save_png(path: &Path, buffer: &PixelBuffer) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create: {}", path.display()))?;
    let (width, height) = buffer.dimensions();

    let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_compression(png::Compression::default());

    let mut writer = encoder
        .write_header()
        .with_context(|| format!("Failed to save: {}", path.display()))?;
    writer
        .write_image_data(&buffer.to_bytes())
        .with_context(|| format!("Failed to save: {}", path.display()))?;
    Ok(())
}

/// Format a pixel rate for display
pub fn format_rate(pixels_per_sec: f64) -> String {
    if pixels_per_sec >= 1e9 {
        format!("{:.2} Gpx/s", pixels_per_sec / 1e9)
    } else if pixels_per_sec >= 1e6 {
        format!("{:.2} Mpx/s", pixels_per_sec / 1e6)
    } else if pixels_per_sec >= 1e3 {
        format!("{:.2} Kpx/s", pixels_per_sec / 1e3)
    } else {
        format!("{:.0} px/s", pixels_per_sec)
    }
}
