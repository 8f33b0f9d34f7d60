//! # lapse-capture
//!
//! Frame sources that refill the buffer read by a graph's import node.
//!
//! - [`CaptureSource`] - start/stop lifecycle plus a blocking whole-frame read
//! - [`FfmpegCapture`] - x11grab through an ffmpeg child process
//! - [`SyntheticSource`] - deterministic generated frames
//! - [`CaptureDevice`] - a source bound to a shared [`PixelBuffer`](lapse_core::PixelBuffer)
//! - [`CaptureConfig`] - YAML configuration
//!
//! # Example
//!
//! ```rust
//! use lapse_capture::{CaptureDevice, SyntheticSource};
//!
//! let source = SyntheticSource::new(32, 16)?;
//! let mut device = CaptureDevice::new(Box::new(source));
//! device.start()?;
//! assert!(device.update_frame()?);
//! assert_eq!(device.buffer().dimensions(), (32, 16));
//! # Ok::<(), lapse_capture::CaptureError>(())
//! ```

#![warn(missing_docs)]

pub mod config;
mod device;
mod error;
mod ffmpeg;
mod synthetic;

pub use config::{CaptureArea, CaptureConfig, Resolution, SourceKind};
pub use device::CaptureDevice;
pub use error::{CaptureError, CaptureResult};
pub use ffmpeg::FfmpegCapture;
pub use synthetic::SyntheticSource;

/// A producer of raw RGBA8 frames.
pub trait CaptureSource: Send {
    /// Begins producing frames. Starting a running source does nothing.
    fn start(&mut self) -> CaptureResult<()>;

    /// Stops producing frames and releases OS resources.
    fn stop(&mut self) -> CaptureResult<()>;

    /// Blocks until the next frame is available and copies it into `dst`,
    /// which must hold exactly `width * height * 4` bytes.
    fn read_frame(&mut self, dst: &mut [u8]) -> CaptureResult<()>;

    /// `(width, height)` of produced frames.
    fn resolution(&self) -> (u32, u32);

    /// Short name for logs.
    fn name(&self) -> &str;
}

/// Opens the source selected by `config.source`.
pub fn open_source(config: &CaptureConfig) -> CaptureResult<Box<dyn CaptureSource>> {
    config.validate()?;
    Ok(match config.source {
        SourceKind::Ffmpeg => Box::new(FfmpegCapture::new(config.clone())?),
        SourceKind::Synthetic => {
            let (w, h) = config.output_resolution();
            Box::new(SyntheticSource::new(w, h)?)
        }
    })
}
