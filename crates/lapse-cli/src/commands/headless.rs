//! Headless run: capture and sample N frames without a window.
//!
//! Reports per-frame sampling time and optionally writes every panel of
//! every Nth frame as `frame_00042_live.png` and so on.

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use lapse_graph::{DelayDiffPreset, FrameDriver};
use tracing::{debug, info};

use crate::HeadlessArgs;
use crate::session::Session;

/// Timing summary of a headless run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub frames: u64,
    pub pixels: u64,
    pub sampling: Duration,
    pub min: Option<Duration>,
    pub max: Duration,
    pub wall: Duration,
    pub dumped: usize,
}

impl RunReport {
    fn record(&mut self, elapsed: Duration, pixels: u64) {
        self.frames += 1;
        self.pixels += pixels;
        self.sampling += elapsed;
        self.min = Some(self.min.map_or(elapsed, |m| m.min(elapsed)));
        self.max = self.max.max(elapsed);
    }

    /// Mean sampling time per frame in milliseconds.
    pub fn mean_ms(&self) -> f64 {
        if self.frames == 0 {
            return 0.0;
        }
        self.sampling.as_secs_f64() * 1000.0 / self.frames as f64
    }
}

pub fn run(args: HeadlessArgs, threads: usize, verbose: u8) -> Result<()> {
    let session = Session::resolve(&args.session, threads)?;
    let report = run_session(&session, args.frames, args.dump.as_deref(), args.dump_every, verbose > 0)?;

    println!("Frames:        {}", report.frames);
    println!("Sampling mean: {:.3} ms", report.mean_ms());
    if let Some(min) = report.min {
        println!("Sampling min:  {:.3} ms", min.as_secs_f64() * 1000.0);
        println!("Sampling max:  {:.3} ms", report.max.as_secs_f64() * 1000.0);
    }
    if !report.sampling.is_zero() {
        let rate = report.pixels as f64 / report.sampling.as_secs_f64();
        println!("Throughput:    {}", super::format_rate(rate));
    }
    println!("Wall time:     {:.2} s", report.wall.as_secs_f64());
    if let Some(dir) = &args.dump {
        println!("Dumped {} images to {}", report.dumped, dir.display());
    }
    Ok(())
}

/// Captures and samples `frames` frames of `session`.
pub fn run_session(
    session: &Session,
    frames: u64,
    dump: Option<&Path>,
    dump_every: u64,
    verbose: bool,
) -> Result<RunReport> {
    if dump_every == 0 {
        bail!("--dump-every must be at least 1");
    }
    if let Some(dir) = dump {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create: {}", dir.display()))?;
    }

    let mut device = super::open_device(session)?;
    let mut preset = DelayDiffPreset::build(device.buffer(), &session.preset).context("Failed to build graph")?;
    let driver = FrameDriver::new(session.workers).context("Failed to start frame driver")?;

    let (w, h) = device.resolution();
    info!(
        source = device.source_name(),
        width = w,
        height = h,
        workers = driver.workers(),
        delay = session.preset.delay_frames,
        frames,
        "headless run"
    );

    device.start().context("Failed to start capture")?;
    let started = Instant::now();
    let mut report = RunReport::default();

    for index in 0..frames {
        device
            .update_frame()
            .with_context(|| format!("Capture failed at frame {index}"))?;
        let stats = preset
            .run(&driver)
            .with_context(|| format!("Sampling failed at frame {index}"))?;
        report.record(stats.elapsed, stats.pixels);

        if verbose {
            println!("frame {index:>5}: {:.3} ms ({} bands)", stats.millis(), stats.bands);
        }

        if let Some(dir) = dump {
            if index % dump_every == 0 {
                for panel in &preset.panels {
                    let path = dir.join(format!("frame_{index:05}_{}.png", panel.name));
                    super::save_png(&path, &panel.buffer)?;
                    report.dumped += 1;
                }
                debug!(frame = index, "panels dumped");
            }
        }
    }

    device.stop().context("Failed to stop capture")?;
    report.wall = started.elapsed();
    info!(frames = report.frames, mean_ms = report.mean_ms(), "headless run finished");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SessionArgs, SessionFile};
    use lapse_capture::{Resolution, SyntheticSource};

    fn synthetic(width: u32, height: u32, delay: usize) -> Session {
        let args = SessionArgs {
            synthetic: true,
            size: Some(Resolution { width, height }),
            delay: Some(delay),
            ..Default::default()
        };
        Session::merge(SessionFile::default(), &args, 2).unwrap()
    }

    fn read_png(path: &Path) -> (u32, u32, Vec<u8>) {
        let file = fs::File::open(path).unwrap();
        let decoder = png::Decoder::new(std::io::BufReader::new(file));
        let mut reader = decoder.read_info().unwrap();
        let mut data = vec![0u8; reader.output_buffer_size().unwrap()];
        let info = reader.next_frame(&mut data).unwrap();
        data.truncate(info.buffer_size());
        (info.width, info.height, data)
    }

    #[test]
    fn test_report_counts_frames() {
        let session = synthetic(16, 8, 2);
        let report = run_session(&session, 6, None, 1, false).unwrap();
        assert_eq!(report.frames, 6);
        assert_eq!(report.pixels, 6 * 3 * 16 * 8);
        assert!(report.min.is_some());
        assert!(report.max >= report.min.unwrap());
        assert_eq!(report.dumped, 0);
    }

    #[test]
    fn test_dump_writes_panels() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("dump");
        let session = synthetic(20, 10, 2);
        let report = run_session(&session, 5, Some(&out), 2, false).unwrap();

        // frames 0, 2 and 4, three panels each
        assert_eq!(report.dumped, 9);
        assert!(out.join("frame_00004_diff.png").exists());
        assert!(!out.join("frame_00003_live.png").exists());

        let pattern = SyntheticSource::new(20, 10).unwrap();
        let (w, h, live) = read_png(&out.join("frame_00004_live.png"));
        assert_eq!((w, h), (20, 10));
        let (_, _, delayed) = read_png(&out.join("frame_00004_delayed.png"));
        for (x, y) in [(0u32, 0u32), (7, 3), (19, 9)] {
            let i = ((y * 20 + x) * 4) as usize;
            assert_eq!(&live[i..i + 4], &pattern.pixel(4, x, y));
            assert_eq!(&delayed[i..i + 4], &pattern.pixel(2, x, y));
        }
    }

    #[test]
    fn test_dump_every_zero_rejected() {
        let session = synthetic(4, 4, 1);
        assert!(run_session(&session, 1, None, 0, false).is_err());
    }
}
