//! Error types for lapse-core and the sampling graph.
//!
//! One error enum covers every failure the graph engine can report:
//! construction-time shape problems, evaluation-time format problems and
//! buffers bound with an encoding the engine cannot read or write.
//!
//! # Overview
//!
//! | Variant | When |
//! |---------|------|
//! | [`ShapeMismatch`](Error::ShapeMismatch) | two inputs of an operator (or an export and its source) resolve to different sizes |
//! | [`FormatMismatch`](Error::FormatMismatch) | a node receives a [`Sample`](crate::Sample) in a format it cannot interpret |
//! | [`UnsupportedBufferFormat`](Error::UnsupportedBufferFormat) | an Import/Export is bound to a non-RGBA8 buffer |
//! | [`InvalidDimensions`](Error::InvalidDimensions) | zero-area graphs, wrong byte counts, out-of-bounds sample coordinates |
//! | [`UnknownNode`](Error::UnknownNode) | a node id that does not belong to the graph |
//!
//! # Usage
//!
//! ```rust
//! use lapse_core::{Error, Result};
//!
//! fn same_size(a: (u32, u32), b: (u32, u32)) -> Result<()> {
//!     if a != b {
//!         return Err(Error::shape_mismatch(a, b));
//!     }
//!     Ok(())
//! }
//!
//! assert!(same_size((4, 4), (4, 2)).is_err());
//! ```
//!
//! # Dependencies
//!
//! - [`thiserror`] - For derive macro error implementation

use thiserror::Error;

use crate::{PixelEncoding, SampleFormat};

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or evaluating a sampling graph.
#[derive(Debug, Error)]
pub enum Error {
    /// Two subgraphs that must agree on size resolve to different dimensions.
    ///
    /// Raised at construction time, before any frame is sampled.
    #[error("shape mismatch: {a_width}x{a_height} vs {b_width}x{b_height}")]
    ShapeMismatch {
        /// First input width
        a_width: u32,
        /// First input height
        a_height: u32,
        /// Second input width
        b_width: u32,
        /// Second input height
        b_height: u32,
    },

    /// A sample arrived in a format the consumer cannot interpret.
    #[error("{context}: expected {expected} sample, got {got}")]
    FormatMismatch {
        /// Node or operator that rejected the sample
        context: String,
        /// Format the consumer requires
        expected: SampleFormat,
        /// Format that was received
        got: SampleFormat,
    },

    /// A boundary node was bound to a buffer with an unsupported encoding.
    #[error("{context}: unsupported buffer encoding {encoding}, only rgba8 is supported")]
    UnsupportedBufferFormat {
        /// Node kind that rejected the buffer
        context: &'static str,
        /// Encoding of the rejected buffer
        encoding: PixelEncoding,
    },

    /// Invalid image dimensions or buffer length.
    #[error("invalid dimensions: {width}x{height} ({reason})")]
    InvalidDimensions {
        /// Width involved
        width: u32,
        /// Height involved
        height: u32,
        /// Why the dimensions were rejected
        reason: String,
    },

    /// A node id that was not produced by this graph.
    #[error("unknown node #{id} (graph has {len} nodes)")]
    UnknownNode {
        /// Offending id
        id: usize,
        /// Number of nodes in the graph
        len: usize,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with custom message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Creates an [`Error::ShapeMismatch`] error.
    #[inline]
    pub fn shape_mismatch(a: (u32, u32), b: (u32, u32)) -> Self {
        Self::ShapeMismatch {
            a_width: a.0,
            a_height: a.1,
            b_width: b.0,
            b_height: b.1,
        }
    }

    /// Creates an [`Error::FormatMismatch`] error.
    #[inline]
    pub fn format_mismatch(context: impl Into<String>, expected: SampleFormat, got: SampleFormat) -> Self {
        Self::FormatMismatch {
            context: context.into(),
            expected,
            got,
        }
    }

    /// Creates an [`Error::UnsupportedBufferFormat`] error.
    #[inline]
    pub fn unsupported_buffer(context: &'static str, encoding: PixelEncoding) -> Self {
        Self::UnsupportedBufferFormat { context, encoding }
    }

    /// Creates an [`Error::InvalidDimensions`] error.
    #[inline]
    pub fn invalid_dimensions(width: u32, height: u32, reason: impl Into<String>) -> Self {
        Self::InvalidDimensions {
            width,
            height,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::Other`] error.
    #[inline]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Returns `true` for errors raised while wiring the graph.
    #[inline]
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Self::ShapeMismatch { .. }
                | Self::UnsupportedBufferFormat { .. }
                | Self::InvalidDimensions { .. }
                | Self::UnknownNode { .. }
        )
    }

    /// Returns `true` if this is a format error raised during evaluation.
    #[inline]
    pub fn is_format_error(&self) -> bool {
        matches!(self, Self::FormatMismatch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch() {
        let err = Error::shape_mismatch((100, 100), (200, 50));
        let msg = err.to_string();
        assert!(msg.contains("100x100"));
        assert!(msg.contains("200x50"));
        assert!(err.is_construction_error());
    }

    #[test]
    fn test_format_mismatch() {
        let err = Error::format_mismatch("export", SampleFormat::Rgba, SampleFormat::Gray);
        assert_eq!(err.to_string(), "export: expected rgba sample, got gray");
        assert!(err.is_format_error());
        assert!(!err.is_construction_error());
    }

    #[test]
    fn test_unsupported_buffer() {
        let err = Error::unsupported_buffer("import", PixelEncoding::Gray8);
        assert!(err.to_string().contains("gray8"));
        assert!(err.is_construction_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
