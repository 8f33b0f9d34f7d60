//! # lapse-view
//!
//! Live window for a capture session: the live capture, a delayed copy
//! and their difference, refreshed every frame.
//!
//! A worker thread owns the capture device, the sampling graph and the
//! frame driver; the UI thread only uploads the finished panels as
//! textures.
//!
//! # Quick Start
//!
//! ```ignore
//! use lapse_view::{run, ViewerConfig};
//!
//! let exit_code = run(ViewerConfig::default());
//! ```
//!
//! # Keyboard Shortcuts
//!
//! | Key | Action |
//! |-----|--------|
//! | `Space` | Pause / resume sampling |
//! | `Esc` | Exit |

#![warn(missing_docs)]
#![warn(clippy::all)]

mod app;
mod handler;
mod messages;
mod state;

pub use app::ViewerApp;
pub use handler::FrameWorker;
pub use messages::{PanelFrame, ViewerEvent, ViewerMsg};
pub use state::ViewerState;

use lapse_capture::CaptureConfig;
use lapse_graph::PresetOptions;
use tracing::{error, info};

/// Configuration for launching the viewer.
#[derive(Debug, Clone, Default)]
pub struct ViewerConfig {
    /// Capture source settings.
    pub capture: CaptureConfig,
    /// Delay and diff settings.
    pub preset: PresetOptions,
    /// Frame driver threads (0 = one per core).
    pub workers: usize,
    /// Upper bound on frames per second, for sources that never block.
    pub max_fps: Option<u32>,
}

/// Runs the viewer until the window closes.
///
/// # Returns
/// Exit code: 0 for success, 1 for error
pub fn run(config: ViewerConfig) -> i32 {
    let (w, h) = config.capture.output_resolution();
    let title = format!("lapse - {w}x{h}, delay {}", config.preset.delay_frames);

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(&title)
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([400.0, 300.0]),
        ..Default::default()
    };

    info!(title = %title, "opening viewer");
    let result = eframe::run_native(
        "lapse",
        native_options,
        Box::new(move |cc| Ok(Box::new(ViewerApp::new(cc, config)))),
    );

    match result {
        Ok(()) => {
            info!("viewer closed");
            0
        }
        Err(e) => {
            error!(error = %e, "viewer failed");
            1
        }
    }
}
