//! # lapse-core
//!
//! Core types shared by every lapse crate:
//!
//! - [`Sample`], [`SampleFormat`] - one pixel in flight through the graph
//! - [`PixelBuffer`], [`PixelEncoding`] - externally owned 8-bit frame buffers
//! - [`Error`], [`Result`] - unified error handling
//!
//! ## Crate Structure
//!
//! ```text
//! lapse-core (this crate)
//!    ^
//!    |
//!    +-- lapse-graph   (node arena, evaluation, frame driver)
//!    +-- lapse-capture (screen capture sources)
//!    +-- lapse-view    (display window)
//!    +-- lapse-cli     (`lapse` binary)
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod buffer;
pub mod error;
pub mod sample;

pub use buffer::{PixelBuffer, PixelEncoding};
pub use error::{Error, Result};
pub use sample::{MAX_CHANNELS, Sample, SampleFormat};

/// Prelude module for convenient imports.
///
/// ```
/// use lapse_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::buffer::{PixelBuffer, PixelEncoding};
    pub use crate::error::{Error, Result};
    pub use crate::sample::{Sample, SampleFormat};
}
