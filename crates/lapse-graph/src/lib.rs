//! # lapse-graph
//!
//! Pull-based per-pixel sampling graph.
//!
//! A [`Graph`] is an arena of nodes wired together by [`NodeId`]s:
//!
//! | Node | Inputs | Effect |
//! |------|--------|--------|
//! | import | - | reads an external [`PixelBuffer`](lapse_core::PixelBuffer) |
//! | export | 1 | writes its input into an external buffer |
//! | unary | 1 | applies a [`UnaryOp`] |
//! | binary | 2 | applies a [`BinaryOp`] to two same-sized inputs |
//! | delay | 1 | returns its input from N frames ago |
//!
//! Frames are driven by [`FrameDriver`], which samples every root in
//! parallel column bands and then advances the delay rings once.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use lapse_core::PixelBuffer;
//! use lapse_graph::{FrameDriver, Graph};
//!
//! let input = Arc::new(PixelBuffer::filled(16, 8, [200, 100, 50, 255]));
//! let output = Arc::new(PixelBuffer::rgba8(16, 8));
//!
//! let mut graph = Graph::new();
//! let src = graph.import(input.clone())?;
//! let late = graph.delay(src, 1)?;
//! let out = graph.export(output.clone(), late)?;
//!
//! let driver = FrameDriver::new(4)?;
//! driver.run_frame(&mut graph, out)?;
//! assert_eq!(output.pixel(0, 0), [0, 0, 0, 0]);
//! driver.run_frame(&mut graph, out)?;
//! assert_eq!(output.pixel(0, 0), [200, 100, 50, 255]);
//! # Ok::<(), lapse_core::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod delay;
pub mod driver;
pub mod graph;
mod node;
pub mod ops;
pub mod preset;

pub use delay::DelayRing;
pub use driver::{FrameDriver, FrameStats, column_bands, run_frame_serial};
pub use graph::Graph;
pub use node::{NodeId, NodeKind};
pub use ops::{AbsDiff, BinaryOp, Diff, ToGray, ToRgba, UnaryOp, binary_fn, unary_fn};
pub use preset::{DelayDiffPreset, DiffMode, Panel, PresetOptions};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::driver::{FrameDriver, FrameStats};
    pub use crate::graph::Graph;
    pub use crate::node::{NodeId, NodeKind};
    pub use crate::ops::{BinaryOp, UnaryOp};
    pub use crate::preset::{DelayDiffPreset, PresetOptions};
    pub use lapse_core::prelude::*;
}
