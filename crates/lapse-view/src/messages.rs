//! Message types for UI <-> worker communication.
//!
//! The UI sends control messages, the worker sends one event per frame.

use egui::ColorImage;
use lapse_graph::FrameStats;

/// Messages from the UI thread to the frame worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerMsg {
    /// Stop sampling until [`ViewerMsg::Resume`].
    Pause,
    /// Continue sampling.
    Resume,
    /// Stop the capture and exit the worker.
    Close,
}

/// One panel of a finished frame.
#[derive(Debug, Clone)]
pub struct PanelFrame {
    /// Panel label.
    pub name: &'static str,
    /// Snapshot of the panel's export buffer.
    pub image: ColorImage,
}

/// Events from the frame worker to the UI thread.
#[derive(Debug)]
pub enum ViewerEvent {
    /// Capture is running.
    Started {
        /// Source name.
        source: String,
        /// Captured frame size.
        resolution: (u32, u32),
        /// Worker threads sampling each frame.
        workers: usize,
    },

    /// A frame was captured, sampled and snapshotted.
    Frame {
        /// Frames produced since start, starting at 1.
        index: u64,
        /// Panels in display order.
        panels: Vec<PanelFrame>,
        /// Driver timing.
        stats: FrameStats,
    },

    /// Sampling is paused or resumed.
    Paused(bool),

    /// Capture or graph failure. The worker stops sampling.
    Error(String),
}
