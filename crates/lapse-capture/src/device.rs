//! Capture device: a source bound to the shared import buffer.

use std::sync::Arc;

use lapse_core::PixelBuffer;
use tracing::{info, trace, warn};

use crate::{CaptureResult, CaptureSource};

/// Owns a [`CaptureSource`] and refreshes a shared RGBA8 buffer from it.
///
/// The buffer is the one bound to the graph's import node. Call
/// [`update_frame`](Self::update_frame) between frames, never while the
/// graph is being sampled.
pub struct CaptureDevice {
    source: Box<dyn CaptureSource>,
    buffer: Arc<PixelBuffer>,
    scratch: Vec<u8>,
    active: bool,
    frames: u64,
}

impl CaptureDevice {
    /// Wraps `source`, allocating a zeroed buffer of its resolution.
    pub fn new(source: Box<dyn CaptureSource>) -> Self {
        let (w, h) = source.resolution();
        let buffer = Arc::new(PixelBuffer::rgba8(w, h));
        let scratch = vec![0u8; buffer.byte_len()];
        Self {
            source,
            buffer,
            scratch,
            active: false,
            frames: 0,
        }
    }

    /// Shared frame buffer.
    pub fn buffer(&self) -> Arc<PixelBuffer> {
        self.buffer.clone()
    }

    /// `(width, height)` of captured frames.
    pub fn resolution(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    /// Name of the underlying source.
    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// True between [`start`](Self::start) and [`stop`](Self::stop).
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Frames loaded into the buffer so far.
    pub fn frames_captured(&self) -> u64 {
        self.frames
    }

    /// Starts the source.
    pub fn start(&mut self) -> CaptureResult<()> {
        if self.active {
            return Ok(());
        }
        self.source.start()?;
        self.active = true;
        info!(source = self.source.name(), resolution = ?self.resolution(), "capture started");
        Ok(())
    }

    /// Stops the source. Stopping an inactive device does nothing.
    pub fn stop(&mut self) -> CaptureResult<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        self.source.stop()?;
        info!(source = self.source.name(), frames = self.frames, "capture stopped");
        Ok(())
    }

    /// Reads the next frame into the shared buffer.
    ///
    /// Returns `false` without touching the buffer while inactive. On error
    /// the buffer keeps the previous frame.
    pub fn update_frame(&mut self) -> CaptureResult<bool> {
        if !self.active {
            return Ok(false);
        }
        self.source.read_frame(&mut self.scratch)?;
        self.buffer.load_bytes(&self.scratch)?;
        self.frames += 1;
        trace!(frame = self.frames, "capture frame loaded");
        Ok(true)
    }
}

impl Drop for CaptureDevice {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!(error = %e, "failed to stop capture on drop");
        }
    }
}

impl std::fmt::Debug for CaptureDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureDevice")
            .field("source", &self.source.name())
            .field("resolution", &self.resolution())
            .field("active", &self.active)
            .field("frames", &self.frames)
            .finish()
    }
}
