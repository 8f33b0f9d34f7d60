//! Viewer state shown in the status bar, and panel layout.

use std::time::{Duration, Instant};

use lapse_graph::FrameStats;

/// Weight of the newest interval in the fps average.
const FPS_SMOOTHING: f32 = 0.1;

/// Runtime viewer state.
#[derive(Debug, Clone, Default)]
pub struct ViewerState {
    /// Sampling is paused.
    pub paused: bool,
    /// Source name reported by the worker.
    pub source: String,
    /// Captured frame size.
    pub resolution: Option<(u32, u32)>,
    /// Worker threads.
    pub workers: usize,
    /// Index of the last displayed frame.
    pub frame_index: u64,
    /// Timing of the last displayed frame.
    pub last_stats: Option<FrameStats>,
    /// Smoothed frames per second.
    pub fps: f32,
    /// Last error reported by the worker.
    pub error: Option<String>,
    last_frame_at: Option<Instant>,
}

impl ViewerState {
    /// Records a displayed frame received at `now`.
    pub fn record_frame(&mut self, index: u64, stats: FrameStats, now: Instant) {
        if let Some(prev) = self.last_frame_at {
            let dt = now.saturating_duration_since(prev);
            if dt > Duration::ZERO {
                let instant_fps = 1.0 / dt.as_secs_f32();
                self.fps = if self.fps == 0.0 {
                    instant_fps
                } else {
                    self.fps + (instant_fps - self.fps) * FPS_SMOOTHING
                };
            }
        }
        self.last_frame_at = Some(now);
        self.frame_index = index;
        self.last_stats = Some(stats);
    }

    /// Text of the status bar.
    pub fn status_line(&self) -> String {
        let mut parts = Vec::new();
        if !self.source.is_empty() {
            parts.push(self.source.clone());
        }
        if let Some((w, h)) = self.resolution {
            parts.push(format!("{w}x{h}"));
        }
        if self.workers > 0 {
            parts.push(format!("{} workers", self.workers));
        }
        parts.push(format!("frame {}", self.frame_index));
        if let Some(stats) = &self.last_stats {
            parts.push(format!("sample {:.1} ms", stats.millis()));
        }
        parts.push(format!("{:.1} fps", self.fps));
        if self.paused {
            parts.push("PAUSED".into());
        }
        parts.join(" | ")
    }
}

/// Grid cell `(column, row)` of the panel at `index`.
///
/// Panels fill a two-row grid column by column: live top-left, delayed
/// below it, diff top-right.
pub fn panel_cell(index: usize) -> (usize, usize) {
    (index / 2, index % 2)
}

/// Grid size `(columns, rows)` needed for `count` panels.
pub fn grid_size(count: usize) -> (usize, usize) {
    match count {
        0 => (0, 0),
        1 => (1, 1),
        n => (n.div_ceil(2), 2),
    }
}

/// Largest display size of a `width` x `height` image fitting `cell`.
pub fn fit_size(width: u32, height: u32, cell: [f32; 2]) -> [f32; 2] {
    if width == 0 || height == 0 {
        return [0.0, 0.0];
    }
    let scale = (cell[0] / width as f32).min(cell[1] / height as f32).max(0.0);
    [width as f32 * scale, height as f32 * scale]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        assert_eq!(panel_cell(0), (0, 0));
        assert_eq!(panel_cell(1), (0, 1));
        assert_eq!(panel_cell(2), (1, 0));
        assert_eq!(grid_size(3), (2, 2));
        assert_eq!(grid_size(1), (1, 1));
    }

    #[test]
    fn test_fit_size() {
        assert_eq!(fit_size(960, 540, [480.0, 480.0]), [480.0, 270.0]);
        assert_eq!(fit_size(100, 200, [400.0, 100.0]), [50.0, 100.0]);
        assert_eq!(fit_size(0, 10, [10.0, 10.0]), [0.0, 0.0]);
    }

    #[test]
    fn test_fps_and_status() {
        let mut s = ViewerState::default();
        let t0 = Instant::now();
        s.record_frame(1, FrameStats::default(), t0);
        assert_eq!(s.fps, 0.0);
        s.record_frame(2, FrameStats::default(), t0 + Duration::from_millis(50));
        assert!((s.fps - 20.0).abs() < 0.01);
        s.paused = true;
        s.resolution = Some((960, 540));
        let line = s.status_line();
        assert!(line.contains("frame 2"));
        assert!(line.contains("960x540"));
        assert!(line.ends_with("PAUSED"));
    }
}
