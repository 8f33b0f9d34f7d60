//! Parallel frame driver.
//!
//! A frame is driven in two phases:
//!
//! 1. every root is sampled over its full extent, the columns split into
//!    contiguous bands with one rayon task per band
//! 2. after all tasks have joined, one [`Graph::finish_frame`] pass over
//!    all roots advances the delay rings
//!
//! Bands are disjoint, so no two tasks ever write the same export pixel or
//! ring cell. If any pixel fails, the frame is abandoned before phase 2:
//! the error is returned and no delay advances. Export buffers of a failed
//! frame hold partial output and should not be displayed.

use std::ops::Range;
use std::time::{Duration, Instant};

use lapse_core::{Error, Result};
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::graph::Graph;
use crate::node::NodeId;

/// Splits `[0, width)` into at most `workers` contiguous column bands.
///
/// The bands cover every column exactly once. Each band is `width / n`
/// columns wide and the last one also takes the remainder. `workers` is
/// clamped to `1..=width`, so no band is empty; a zero width gives no
/// bands.
///
/// ```rust
/// use lapse_graph::column_bands;
///
/// assert_eq!(column_bands(10, 3), vec![0..3, 3..6, 6..10]);
/// assert_eq!(column_bands(2, 8), vec![0..1, 1..2]);
/// ```
pub fn column_bands(width: u32, workers: usize) -> Vec<Range<u32>> {
    if width == 0 {
        return Vec::new();
    }
    let n = (workers.max(1) as u64).min(width as u64) as u32;
    let step = width / n;
    (0..n)
        .map(|i| {
            let start = i * step;
            let end = if i + 1 == n { width } else { start + step };
            start..end
        })
        .collect()
}

/// Timing and size of one driven frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    /// Width of the first root.
    pub width: u32,
    /// Height of the first root.
    pub height: u32,
    /// Bands per root.
    pub bands: usize,
    /// Pixels sampled over all roots.
    pub pixels: u64,
    /// Wall time of sampling plus the finish pass.
    pub elapsed: Duration,
}

impl FrameStats {
    /// Elapsed time in milliseconds.
    pub fn millis(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

fn sample_band(graph: &Graph, root: NodeId, band: Range<u32>, height: u32) -> Result<()> {
    for y in 0..height {
        for x in band.clone() {
            graph.sample(root, x, y)?;
        }
    }
    Ok(())
}

/// Runs frames on a dedicated rayon pool.
pub struct FrameDriver {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl FrameDriver {
    /// Builds a pool of `workers` threads, or rayon's default when `0`.
    ///
    /// # Errors
    ///
    /// [`Error::Other`] if the pool cannot be created.
    pub fn new(workers: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("lapse-worker-{i}"))
            .build()
            .map_err(|e| Error::other(format!("failed to build worker pool: {e}")))?;
        let workers = pool.current_num_threads();
        debug!(workers, "frame driver ready");
        Ok(Self { pool, workers })
    }

    /// Number of worker threads, and so of bands per frame.
    #[inline]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Drives one frame of a single root.
    pub fn run_frame(&self, graph: &mut Graph, root: NodeId) -> Result<FrameStats> {
        self.run_frames(graph, &[root])
    }

    /// Drives one frame of several roots, then finishes the frame once.
    ///
    /// Roots are sampled one after another, each in parallel. Delay nodes
    /// shared between roots therefore advance once per call.
    pub fn run_frames(&self, graph: &mut Graph, roots: &[NodeId]) -> Result<FrameStats> {
        let start = Instant::now();
        let mut stats = FrameStats::default();

        let shared: &Graph = graph;
        for (i, &root) in roots.iter().enumerate() {
            let (width, height) = shared.resolve_size(root)?;
            let bands = column_bands(width, self.workers);
            if i == 0 {
                stats.width = width;
                stats.height = height;
                stats.bands = bands.len();
            }
            stats.pixels += width as u64 * height as u64;
            self.pool.install(|| {
                bands
                    .into_par_iter()
                    .with_max_len(1)
                    .try_for_each(|band| sample_band(shared, root, band, height))
            })?;
        }

        graph.finish_frame(roots)?;
        stats.elapsed = start.elapsed();
        trace!(
            frame = graph.frames_finished(),
            roots = roots.len(),
            bands = stats.bands,
            pixels = stats.pixels,
            ms = stats.millis(),
            "frame done"
        );
        Ok(stats)
    }
}

impl std::fmt::Debug for FrameDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameDriver").field("workers", &self.workers).finish()
    }
}

/// Single-threaded full-width sweep of `roots`, then one finish pass.
///
/// Produces the same buffers and delay state as [`FrameDriver::run_frames`].
pub fn run_frame_serial(graph: &mut Graph, roots: &[NodeId]) -> Result<FrameStats> {
    let start = Instant::now();
    let mut stats = FrameStats::default();
    for (i, &root) in roots.iter().enumerate() {
        let (width, height) = graph.resolve_size(root)?;
        if i == 0 {
            stats.width = width;
            stats.height = height;
            stats.bands = usize::from(width > 0);
        }
        stats.pixels += width as u64 * height as u64;
        sample_band(graph, root, 0..width, height)?;
    }
    graph.finish_frame(roots)?;
    stats.elapsed = start.elapsed();
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_cover(width: u32, workers: usize) {
        let bands = column_bands(width, workers);
        let mut next = 0;
        for b in &bands {
            assert_eq!(b.start, next, "gap or overlap at {width}/{workers}");
            assert!(b.end > b.start, "empty band at {width}/{workers}");
            next = b.end;
        }
        assert_eq!(next, width);
        assert!(bands.len() <= workers.max(1));
    }

    #[test]
    fn test_bands_cover_width() {
        for width in 1..=70 {
            for workers in 0..=20 {
                assert_cover(width, workers);
            }
        }
    }

    #[test]
    fn test_bands_remainder_in_last() {
        assert_eq!(column_bands(10, 4), vec![0..2, 2..4, 4..6, 6..10]);
        assert_eq!(column_bands(960, 16).len(), 16);
    }

    #[test]
    fn test_bands_zero_width() {
        assert!(column_bands(0, 4).is_empty());
    }

    #[test]
    fn test_driver_workers() {
        let driver = FrameDriver::new(3).unwrap();
        assert_eq!(driver.workers(), 3);
    }
}
