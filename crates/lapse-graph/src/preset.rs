//! The standard live / delayed / diff session.
//!
//! ```text
//! import ──> export(live) ─────────────────────┐
//!    │                                          ├──> diff ──> export(diff)
//!    └────> delay(n) ──> export(delayed) ───────┘
//! ```
//!
//! All three panels are driven by a single [`FrameDriver::run_frames`]
//! call per frame, so the delay node advances exactly once per frame.

use std::sync::Arc;

use lapse_core::{PixelBuffer, Result};
use tracing::debug;

use crate::driver::{FrameDriver, FrameStats, run_frame_serial};
use crate::graph::Graph;
use crate::node::NodeId;
use crate::ops::{AbsDiff, Diff, ToGray, ToRgba};

/// Difference operator used by the diff panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiffMode {
    /// `255 - (delayed - live)` per channel.
    #[default]
    Directional,
    /// `abs(live - delayed)` per channel.
    Absolute,
}

/// Options for [`DelayDiffPreset::build`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresetOptions {
    /// Delay of the delayed panel in frames.
    pub delay_frames: usize,
    /// Difference operator.
    pub diff: DiffMode,
    /// Compute the difference on gray intensities instead of per channel.
    pub gray_diff: bool,
}

impl Default for PresetOptions {
    fn default() -> Self {
        Self {
            delay_frames: 30,
            diff: DiffMode::Directional,
            gray_diff: false,
        }
    }
}

/// One displayed output.
#[derive(Debug, Clone)]
pub struct Panel {
    /// Panel label: `live`, `delayed` or `diff`.
    pub name: &'static str,
    /// Export node driving the panel.
    pub root: NodeId,
    /// Buffer the export writes into.
    pub buffer: Arc<PixelBuffer>,
}

/// Graph and output buffers of the live / delayed / diff session.
#[derive(Debug)]
pub struct DelayDiffPreset {
    /// The sampling graph.
    pub graph: Graph,
    /// Buffer the import node reads. Refill it between frames.
    pub input: Arc<PixelBuffer>,
    /// Panels in display order.
    pub panels: Vec<Panel>,
    /// Delay node feeding the delayed panel.
    pub delay: NodeId,
}

impl DelayDiffPreset {
    /// Builds the session over `input`, allocating one output buffer per
    /// panel with the same size as the input.
    pub fn build(input: Arc<PixelBuffer>, options: &PresetOptions) -> Result<Self> {
        let (width, height) = input.dimensions();
        let mut graph = Graph::new();

        let src = graph.import(input.clone())?;

        let live_buf = Arc::new(PixelBuffer::rgba8(width, height));
        let live = graph.export(live_buf.clone(), src)?;

        let delay = graph.delay(src, options.delay_frames)?;
        let delayed_buf = Arc::new(PixelBuffer::rgba8(width, height));
        let delayed = graph.export(delayed_buf.clone(), delay)?;

        let (a, b) = if options.gray_diff {
            (graph.unary(live, ToGray)?, graph.unary(delayed, ToGray)?)
        } else {
            (live, delayed)
        };
        let mut diff = match options.diff {
            DiffMode::Directional => graph.binary(a, b, Diff)?,
            DiffMode::Absolute => graph.binary(a, b, AbsDiff)?,
        };
        if options.gray_diff {
            diff = graph.unary(diff, ToRgba)?;
        }
        let diff_buf = Arc::new(PixelBuffer::rgba8(width, height));
        let diff = graph.export(diff_buf.clone(), diff)?;

        debug!(width, height, delay = options.delay_frames, diff = ?options.diff, "delay/diff preset built");

        Ok(Self {
            graph,
            input,
            panels: vec![
                Panel { name: "live", root: live, buffer: live_buf },
                Panel { name: "delayed", root: delayed, buffer: delayed_buf },
                Panel { name: "diff", root: diff, buffer: diff_buf },
            ],
            delay,
        })
    }

    /// Export roots of every panel.
    pub fn roots(&self) -> Vec<NodeId> {
        self.panels.iter().map(|p| p.root).collect()
    }

    /// Panel by name.
    pub fn panel(&self, name: &str) -> Option<&Panel> {
        self.panels.iter().find(|p| p.name == name)
    }

    /// Drives one frame of every panel.
    pub fn run(&mut self, driver: &FrameDriver) -> Result<FrameStats> {
        let roots = self.roots();
        driver.run_frames(&mut self.graph, &roots)
    }

    /// Single-threaded variant of [`run`](Self::run).
    pub fn run_serial(&mut self) -> Result<FrameStats> {
        let roots = self.roots();
        run_frame_serial(&mut self.graph, &roots)
    }

    /// Text dump of every panel's subgraph.
    pub fn describe(&self) -> Result<String> {
        let mut out = String::new();
        for panel in &self.panels {
            out.push_str(panel.name);
            out.push_str(":\n");
            out.push_str(&self.graph.describe(panel.root)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_layout() {
        let input = Arc::new(PixelBuffer::filled(8, 4, [1, 2, 3, 255]));
        let preset = DelayDiffPreset::build(input, &PresetOptions::default()).unwrap();
        assert_eq!(preset.panels.len(), 3);
        assert_eq!(preset.roots().len(), 3);
        assert!(preset.panel("diff").is_some());
        assert!(preset.panel("nope").is_none());
        assert_eq!(preset.panel("live").unwrap().buffer.dimensions(), (8, 4));
        assert_eq!(preset.graph.delay_position(preset.delay), Some(0));
    }

    #[test]
    fn test_run_advances_delay_once() {
        let input = Arc::new(PixelBuffer::filled(5, 3, [9, 9, 9, 255]));
        let mut preset = DelayDiffPreset::build(input, &PresetOptions::default()).unwrap();
        let driver = FrameDriver::new(2).unwrap();
        preset.run(&driver).unwrap();
        assert_eq!(preset.graph.delay_position(preset.delay), Some(1));
        assert_eq!(preset.graph.frames_finished(), 1);
    }

    #[test]
    fn test_gray_abs_diff_layout() {
        let input = Arc::new(PixelBuffer::filled(2, 2, [30, 60, 90, 255]));
        let options = PresetOptions {
            delay_frames: 1,
            diff: DiffMode::Absolute,
            gray_diff: true,
        };
        let mut preset = DelayDiffPreset::build(input, &options).unwrap();
        preset.run_serial().unwrap();
        // Delayed panel is still zero: |60 - 0| gray, opaque.
        assert_eq!(preset.panel("diff").unwrap().buffer.pixel(1, 1), [60, 60, 60, 255]);
        assert!(preset.describe().unwrap().contains("binary abs_diff"));
    }
}
