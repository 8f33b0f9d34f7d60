//! Per-pixel values flowing through the sampling graph.
//!
//! A [`Sample`] is one pixel in flight: up to four `f32` channels plus a
//! [`SampleFormat`] tag saying how many of them are meaningful. Channel
//! values stay in the 0..=255 range of the 8-bit buffers they came from;
//! nothing is normalized.
//!
//! # Conversion to and from storage
//!
//! Widening ([`Sample::from_rgba8`]) is exact. Narrowing
//! ([`Sample::to_rgba8`]) truncates toward zero, so `215.9` becomes `215`.
//! Values outside `0..=255` saturate and NaN becomes zero (the semantics
//! of Rust's float to integer cast).
//!
//! ```rust
//! use lapse_core::{Sample, SampleFormat};
//!
//! let px = Sample::from_rgba8([10, 20, 30, 255]);
//! assert_eq!(px.format, SampleFormat::Rgba);
//!
//! let out = Sample::rgba(215.9, -4.0, 300.0, 255.0);
//! assert_eq!(out.to_rgba8(), [215, 0, 255, 255]);
//! ```

use std::fmt;

use crate::{Error, Result};

/// Maximum number of channels a [`Sample`] can carry.
pub const MAX_CHANNELS: usize = 4;

/// Channel layout of a [`Sample`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SampleFormat {
    /// Red, green, blue, alpha.
    #[default]
    Rgba,
    /// Single intensity channel.
    Gray,
}

impl SampleFormat {
    /// Number of meaningful channels for this format.
    #[inline]
    pub const fn channels(self) -> usize {
        match self {
            Self::Rgba => 4,
            Self::Gray => 1,
        }
    }

    /// Lowercase name used in messages.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rgba => "rgba",
            Self::Gray => "gray",
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One pixel value tagged with its channel layout.
///
/// Unused trailing channels are carried along but carry no meaning; check
/// [`format`](Self::format) before reading anything past channel 0.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sample {
    /// Channel storage, only the first `format.channels()` entries are valid.
    pub data: [f32; MAX_CHANNELS],
    /// Channel layout.
    pub format: SampleFormat,
}

impl Sample {
    /// Creates an RGBA sample.
    #[inline]
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self {
            data: [r, g, b, a],
            format: SampleFormat::Rgba,
        }
    }

    /// Creates a single-channel sample.
    #[inline]
    pub const fn gray(v: f32) -> Self {
        Self {
            data: [v, 0.0, 0.0, 0.0],
            format: SampleFormat::Gray,
        }
    }

    /// Creates a zeroed sample of the given format.
    #[inline]
    pub const fn zeroed(format: SampleFormat) -> Self {
        Self {
            data: [0.0; MAX_CHANNELS],
            format,
        }
    }

    /// Builds a sample from the first `format.channels()` values of `values`.
    ///
    /// # Panics
    ///
    /// Panics if `values` is shorter than the channel count.
    pub fn from_channels(format: SampleFormat, values: &[f32]) -> Self {
        let n = format.channels();
        let mut data = [0.0; MAX_CHANNELS];
        data[..n].copy_from_slice(&values[..n]);
        Self { data, format }
    }

    /// Widens one 8-bit RGBA pixel.
    #[inline]
    pub fn from_rgba8(px: [u8; 4]) -> Self {
        Self::rgba(px[0] as f32, px[1] as f32, px[2] as f32, px[3] as f32)
    }

    /// Narrows to 8-bit RGBA, truncating toward zero.
    ///
    /// Only meaningful for [`SampleFormat::Rgba`]; callers check the format
    /// first (see [`expect_format`](Self::expect_format)).
    #[inline]
    pub fn to_rgba8(&self) -> [u8; 4] {
        [
            self.data[0] as u8,
            self.data[1] as u8,
            self.data[2] as u8,
            self.data[3] as u8,
        ]
    }

    /// Number of meaningful channels.
    #[inline]
    pub const fn channel_count(&self) -> usize {
        self.format.channels()
    }

    /// The meaningful channels as a slice.
    #[inline]
    pub fn channels(&self) -> &[f32] {
        &self.data[..self.format.channels()]
    }

    /// Mutable access to the meaningful channels.
    #[inline]
    pub fn channels_mut(&mut self) -> &mut [f32] {
        let n = self.format.channels();
        &mut self.data[..n]
    }

    /// Fails with [`Error::FormatMismatch`] unless this sample has `format`.
    #[inline]
    pub fn expect_format(&self, format: SampleFormat, context: &str) -> Result<()> {
        if self.format != format {
            return Err(Error::format_mismatch(context, format, self.format));
        }
        Ok(())
    }
}
