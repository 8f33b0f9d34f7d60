//! Deterministic generated frames for headless runs, benches and tests.
//!
//! The pattern is a diagonal gradient with a bright vertical bar that moves
//! two columns per frame, so consecutive frames differ and the delayed and
//! diff panels have something to show.

use tracing::debug;

use crate::{CaptureError, CaptureResult, CaptureSource};

/// Test pattern source.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    width: u32,
    height: u32,
    frame: u64,
    running: bool,
}

impl SyntheticSource {
    /// Creates a stopped source producing `width` x `height` frames.
    pub fn new(width: u32, height: u32) -> CaptureResult<Self> {
        if width == 0 || height == 0 {
            return Err(CaptureError::config(format!("synthetic size {width}x{height} is empty")));
        }
        Ok(Self {
            width,
            height,
            frame: 0,
            running: false,
        })
    }

    /// Frames produced so far.
    pub fn frame_index(&self) -> u64 {
        self.frame
    }

    /// Pixel of frame `frame` at (x, y).
    pub fn pixel(&self, frame: u64, x: u32, y: u32) -> [u8; 4] {
        let bar = (frame.wrapping_mul(2) % self.width as u64) as u32;
        if x.abs_diff(bar) < 2 {
            return [255, 255, 255, 255];
        }
        let t = frame as u32;
        [
            (x.wrapping_add(t) & 0xff) as u8,
            (y.wrapping_add(t / 2) & 0xff) as u8,
            (x.wrapping_add(y) & 0xff) as u8,
            255,
        ]
    }
}

impl CaptureSource for SyntheticSource {
    fn start(&mut self) -> CaptureResult<()> {
        self.running = true;
        debug!(width = self.width, height = self.height, "synthetic source started");
        Ok(())
    }

    fn stop(&mut self) -> CaptureResult<()> {
        self.running = false;
        Ok(())
    }

    fn read_frame(&mut self, dst: &mut [u8]) -> CaptureResult<()> {
        if !self.running {
            return Err(CaptureError::NotStarted);
        }
        let expected = self.width as usize * self.height as usize * 4;
        if dst.len() != expected {
            return Err(CaptureError::FrameSize {
                expected,
                got: dst.len(),
            });
        }
        let w = self.width as usize;
        for (i, px) in dst.chunks_exact_mut(4).enumerate() {
            let (x, y) = ((i % w) as u32, (i / w) as u32);
            px.copy_from_slice(&self.pixel(self.frame, x, y));
        }
        self.frame += 1;
        Ok(())
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}
