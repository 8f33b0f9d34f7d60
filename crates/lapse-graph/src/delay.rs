//! Circular multi-frame history backing a delay node.
//!
//! The ring holds `frame_count = delay + 1` whole-frame slots. While a frame
//! is sampled, each pixel writes its fresh value into slot `current` and
//! reads slot `(current + 1) % frame_count`, which still holds the value
//! written `delay` frames ago. [`DelayRing::advance`] moves `current` on by
//! one after the frame is complete.
//!
//! ```text
//! delay = 2, frame_count = 3
//!
//! frame t   : write slot 0, read slot 1
//! frame t+1 : write slot 1, read slot 2
//! frame t+2 : write slot 2, read slot 0  <- value from frame t
//! ```
//!
//! Cells are `f32` bit patterns in atomics with relaxed ordering. Workers
//! sampling disjoint pixels touch disjoint cells, so the hot path needs no
//! locks. Storage starts zeroed: until `delay` frames have been written the
//! ring returns zero samples.

use std::sync::atomic::{AtomicU32, Ordering};

use lapse_core::{Error, Result, Sample, SampleFormat};

/// Per-pixel frame history for one delay node.
pub struct DelayRing {
    cells: Box<[AtomicU32]>,
    width: u32,
    height: u32,
    pixel_size: usize,
    frame_count: usize,
    current: usize,
    format: SampleFormat,
}

impl DelayRing {
    /// Allocates a zeroed ring for a `width` x `height` frame of `format`
    /// samples, delaying by `delay` frames.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] for a zero-area frame or when the
    /// storage size overflows.
    pub fn new(width: u32, height: u32, format: SampleFormat, delay: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::invalid_dimensions(width, height, "delay source has zero area"));
        }
        let pixel_size = format.channels();
        let frame_count = delay
            .checked_add(1)
            .ok_or_else(|| Error::invalid_dimensions(width, height, "delay too large"))?;
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(frame_count))
            .and_then(|v| v.checked_mul(pixel_size))
            .ok_or_else(|| Error::invalid_dimensions(width, height, "delay storage overflows"))?;

        let cells = (0..len).map(|_| AtomicU32::new(0)).collect();
        Ok(Self {
            cells,
            width,
            height,
            pixel_size,
            frame_count,
            current: 0,
            format,
        })
    }

    #[inline]
    fn offset(&self, x: u32, y: u32, slot: usize) -> usize {
        let frame = self.width as usize * self.height as usize * self.pixel_size;
        let pixel = (x as usize + y as usize * self.width as usize) * self.pixel_size;
        slot * frame + pixel
    }

    /// Stores `fresh` for (x, y) in the current slot and returns the value
    /// stored there `delay` frames ago.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FormatMismatch`] if `fresh` does not have the format
    /// the ring was built for, and [`Error::InvalidDimensions`] if (x, y)
    /// lies outside the ring. Nothing is written in either case.
    pub fn exchange(&self, x: u32, y: u32, fresh: &Sample) -> Result<Sample> {
        fresh.expect_format(self.format, "delay")?;
        if x >= self.width || y >= self.height {
            return Err(Error::invalid_dimensions(
                self.width,
                self.height,
                format!("pixel ({x}, {y}) out of bounds"),
            ));
        }

        let write = self.offset(x, y, self.current);
        for (cell, v) in self.cells[write..write + self.pixel_size].iter().zip(fresh.channels()) {
            cell.store(v.to_bits(), Ordering::Relaxed);
        }

        let read_slot = (self.current + 1) % self.frame_count;
        let read = self.offset(x, y, read_slot);
        let mut out = Sample::zeroed(self.format);
        for (o, cell) in out.channels_mut().iter_mut().zip(&self.cells[read..read + self.pixel_size]) {
            *o = f32::from_bits(cell.load(Ordering::Relaxed));
        }
        Ok(out)
    }

    /// Moves to the next slot. Called once per completed frame.
    #[inline]
    pub fn advance(&mut self) {
        self.current = (self.current + 1) % self.frame_count;
    }

    /// Slot written during the current frame.
    #[inline]
    pub fn position(&self) -> usize {
        self.current
    }

    /// Number of slots (`delay + 1`).
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Delay in frames.
    #[inline]
    pub fn delay(&self) -> usize {
        self.frame_count - 1
    }

    /// Format locked in at construction.
    #[inline]
    pub fn format(&self) -> SampleFormat {
        self.format
    }

    /// `(width, height)` of one slot.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(v: f32) -> Sample {
        Sample::gray(v)
    }

    #[test]
    fn test_exchange_out_of_bounds_leaves_ring_alone() {
        let mut ring = DelayRing::new(4, 4, SampleFormat::Gray, 1).unwrap();
        ring.exchange(0, 1, &gray(0.5)).unwrap();
        // (4, 0) would alias (0, 1) if the row were allowed to wrap
        let err = ring.exchange(4, 0, &gray(0.9)).unwrap_err();
        assert!(err.is_construction_error());
        assert!(ring.exchange(0, 4, &gray(0.9)).is_err());
        ring.advance();
        assert_eq!(ring.exchange(0, 1, &gray(0.1)).unwrap(), gray(0.5));
    }

    #[test]
    fn test_sizes() {
        let ring = DelayRing::new(4, 3, SampleFormat::Rgba, 30).unwrap();
        assert_eq!(ring.frame_count(), 31);
        assert_eq!(ring.delay(), 30);
        assert_eq!(ring.cells.len(), 4 * 3 * 31 * 4);
        assert_eq!(ring.position(), 0);
    }

    #[test]
    fn test_zero_area_rejected() {
        assert!(DelayRing::new(0, 5, SampleFormat::Gray, 1).is_err());
    }

    #[test]
    fn test_returns_value_from_k_frames_ago() {
        let mut ring = DelayRing::new(1, 1, SampleFormat::Gray, 2).unwrap();
        let mut seen = Vec::new();
        for t in 0..6 {
            seen.push(ring.exchange(0, 0, &gray(t as f32 + 1.0)).unwrap().data[0]);
            ring.advance();
        }
        assert_eq!(seen, vec![0.0, 0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_zero_delay_passes_through() {
        let mut ring = DelayRing::new(2, 1, SampleFormat::Gray, 0).unwrap();
        assert_eq!(ring.exchange(1, 0, &gray(7.0)).unwrap().data[0], 7.0);
        ring.advance();
        assert_eq!(ring.position(), 0);
    }

    #[test]
    fn test_pixels_are_independent() {
        let ring = DelayRing::new(2, 2, SampleFormat::Rgba, 0).unwrap();
        ring.exchange(0, 1, &Sample::rgba(1.0, 2.0, 3.0, 4.0)).unwrap();
        ring.exchange(1, 1, &Sample::rgba(5.0, 6.0, 7.0, 8.0)).unwrap();
        let out = ring.exchange(0, 1, &Sample::rgba(1.0, 2.0, 3.0, 4.0)).unwrap();
        assert_eq!(out.data, [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_format_checked() {
        let ring = DelayRing::new(1, 1, SampleFormat::Rgba, 1).unwrap();
        let err = ring.exchange(0, 0, &gray(1.0)).unwrap_err();
        assert!(err.is_format_error());
    }
}
