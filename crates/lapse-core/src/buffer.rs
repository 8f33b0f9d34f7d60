//! Shared 8-bit frame buffers.
//!
//! [`PixelBuffer`] is the unit exchanged between the capture source, the
//! sampling graph and the display. It is owned outside the graph and handed
//! around as `Arc<PixelBuffer>`:
//!
//! ```text
//! capture ──load_bytes──> PixelBuffer <──pixel── Import node
//! Export node ──set_pixel──> PixelBuffer ──copy_to──> display
//! ```
//!
//! # Memory Layout
//!
//! Pixels are stored row-major, one packed 32-bit word per pixel
//! (`[R, G, B, A]` little-endian), regardless of encoding. Words are atomics
//! accessed with relaxed ordering: writers on disjoint pixels never contend
//! and every access goes through `&self`, so the buffer can be written by
//! several frame workers at once without locks. Ordering between frames is
//! provided by the thread joins of the frame driver.
//!
//! # Example
//!
//! ```rust
//! use lapse_core::{PixelBuffer, PixelEncoding};
//!
//! let buf = PixelBuffer::new(4, 2, PixelEncoding::Rgba8);
//! buf.set_pixel(3, 1, [1, 2, 3, 4]);
//! assert_eq!(buf.pixel(3, 1), [1, 2, 3, 4]);
//! assert_eq!(buf.byte_len(), 4 * 2 * 4);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::{Error, Result};

/// Byte layout of the pixels a [`PixelBuffer`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelEncoding {
    /// 8-bit red, green, blue, alpha. The only encoding graph boundaries accept.
    #[default]
    Rgba8,
    /// 8-bit red, green, blue.
    Rgb8,
    /// 8-bit single channel.
    Gray8,
}

impl PixelEncoding {
    /// Bytes per pixel in the packed external representation.
    #[inline]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgba8 => 4,
            Self::Rgb8 => 3,
            Self::Gray8 => 1,
        }
    }

    /// Lowercase name used in messages.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rgba8 => "rgba8",
            Self::Rgb8 => "rgb8",
            Self::Gray8 => "gray8",
        }
    }
}

impl fmt::Display for PixelEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[inline]
fn pack(px: [u8; 4]) -> u32 {
    u32::from_le_bytes(px)
}

#[inline]
fn unpack(word: u32) -> [u8; 4] {
    word.to_le_bytes()
}

/// Externally owned 8-bit image shared between capture, graph and display.
pub struct PixelBuffer {
    words: Box<[AtomicU32]>,
    width: u32,
    height: u32,
    encoding: PixelEncoding,
}

impl PixelBuffer {
    /// Creates a zero-filled buffer.
    pub fn new(width: u32, height: u32, encoding: PixelEncoding) -> Self {
        let count = width as usize * height as usize;
        let words = (0..count).map(|_| AtomicU32::new(0)).collect();
        Self {
            words,
            width,
            height,
            encoding,
        }
    }

    /// Creates a zero-filled RGBA8 buffer.
    #[inline]
    pub fn rgba8(width: u32, height: u32) -> Self {
        Self::new(width, height, PixelEncoding::Rgba8)
    }

    /// Creates an RGBA8 buffer with every pixel set to `px`.
    pub fn filled(width: u32, height: u32, px: [u8; 4]) -> Self {
        let buf = Self::rgba8(width, height);
        buf.fill(px);
        buf
    }

    /// Creates an RGBA8 buffer from packed bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] if `bytes.len() != width * height * 4`.
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> Result<Self> {
        let buf = Self::rgba8(width, height);
        buf.load_bytes(bytes)?;
        Ok(buf)
    }

    /// Image width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Pixel encoding.
    #[inline]
    pub fn encoding(&self) -> PixelEncoding {
        self.encoding
    }

    /// Total number of pixels.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.words.len()
    }

    /// Size of the packed external representation in bytes.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.pixel_count() * self.encoding.bytes_per_pixel()
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) out of bounds for {}x{}",
            self.width,
            self.height
        );
        x as usize + y as usize * self.width as usize
    }

    /// Reads the pixel at (x, y). Channels beyond the encoding read as zero.
    ///
    /// # Panics
    ///
    /// Panics if (x, y) is out of bounds.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        unpack(self.words[self.index(x, y)].load(Ordering::Relaxed))
    }

    /// Writes the pixel at (x, y).
    ///
    /// # Panics
    ///
    /// Panics if (x, y) is out of bounds.
    #[inline]
    pub fn set_pixel(&self, x: u32, y: u32, px: [u8; 4]) {
        self.words[self.index(x, y)].store(pack(px), Ordering::Relaxed);
    }

    /// Sets every pixel to `px`.
    pub fn fill(&self, px: [u8; 4]) {
        let word = pack(px);
        for w in self.words.iter() {
            w.store(word, Ordering::Relaxed);
        }
    }

    /// Replaces the contents with packed bytes in this buffer's encoding.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] if `bytes.len() != byte_len()`.
    pub fn load_bytes(&self, bytes: &[u8]) -> Result<()> {
        if bytes.len() != self.byte_len() {
            return Err(Error::invalid_dimensions(
                self.width,
                self.height,
                format!("expected {} bytes, got {}", self.byte_len(), bytes.len()),
            ));
        }
        let bpp = self.encoding.bytes_per_pixel();
        for (word, chunk) in self.words.iter().zip(bytes.chunks_exact(bpp)) {
            let mut px = [0u8; 4];
            px[..bpp].copy_from_slice(chunk);
            word.store(pack(px), Ordering::Relaxed);
        }
        Ok(())
    }

    /// Copies the contents out as packed bytes in this buffer's encoding.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] if `dst.len() != byte_len()`.
    pub fn copy_to(&self, dst: &mut [u8]) -> Result<()> {
        if dst.len() != self.byte_len() {
            return Err(Error::invalid_dimensions(
                self.width,
                self.height,
                format!("expected {} bytes, got {}", self.byte_len(), dst.len()),
            ));
        }
        let bpp = self.encoding.bytes_per_pixel();
        for (word, chunk) in self.words.iter().zip(dst.chunks_exact_mut(bpp)) {
            let px = unpack(word.load(Ordering::Relaxed));
            chunk.copy_from_slice(&px[..bpp]);
        }
        Ok(())
    }

    /// Returns the contents as packed bytes in this buffer's encoding.
    pub fn to_bytes(&self) -> Vec<u8> {
        let bpp = self.encoding.bytes_per_pixel();
        let mut out = Vec::with_capacity(self.byte_len());
        for word in self.words.iter() {
            let px = unpack(word.load(Ordering::Relaxed));
            out.extend_from_slice(&px[..bpp]);
        }
        out
    }

    /// Iterates over all pixels row by row as RGBA quads.
    pub fn pixels(&self) -> impl Iterator<Item = [u8; 4]> + '_ {
        self.words.iter().map(|w| unpack(w.load(Ordering::Relaxed)))
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("encoding", &self.encoding)
            .finish()
    }
}
