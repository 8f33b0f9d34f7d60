//! Frame worker.
//!
//! Owns the capture device, the live/delayed/diff graph and the frame
//! driver, off the UI thread. Each frame:
//!
//! 1. read the next capture frame into the import buffer
//! 2. drive every panel root with one `run_frames` call
//! 3. snapshot the export buffers and send them to the UI
//!
//! A capture or graph error is sent to the UI and sampling stops; the
//! worker then only waits for [`ViewerMsg::Close`].

use std::sync::mpsc::{Receiver, SyncSender, TryRecvError, TrySendError};
use std::thread;
use std::time::{Duration, Instant};

use egui::ColorImage;
use lapse_capture::{CaptureDevice, open_source};
use lapse_graph::{DelayDiffPreset, FrameDriver};
use tracing::{debug, error, info, trace};

use crate::ViewerConfig;
use crate::messages::{PanelFrame, ViewerEvent, ViewerMsg};

/// Capture + graph loop driven by UI messages.
pub struct FrameWorker {
    rx: Receiver<ViewerMsg>,
    tx: SyncSender<ViewerEvent>,
    repaint: Option<egui::Context>,
    device: CaptureDevice,
    preset: DelayDiffPreset,
    driver: FrameDriver,
    min_frame_time: Option<Duration>,
    paused: bool,
    failed: bool,
    frame: u64,
}

impl FrameWorker {
    /// Opens the capture source and builds the graph over its buffer.
    pub fn new(config: &ViewerConfig, rx: Receiver<ViewerMsg>, tx: SyncSender<ViewerEvent>) -> Result<Self, String> {
        let source = open_source(&config.capture).map_err(|e| format!("capture: {e}"))?;
        let device = CaptureDevice::new(source);
        let preset = DelayDiffPreset::build(device.buffer(), &config.preset).map_err(|e| format!("graph: {e}"))?;
        let driver = FrameDriver::new(config.workers).map_err(|e| format!("driver: {e}"))?;
        let min_frame_time = config
            .max_fps
            .filter(|fps| *fps > 0)
            .map(|fps| Duration::from_secs_f64(1.0 / fps as f64));

        Ok(Self {
            rx,
            tx,
            repaint: None,
            device,
            preset,
            driver,
            min_frame_time,
            paused: false,
            failed: false,
            frame: 0,
        })
    }

    /// Requests a repaint of `ctx` after every event.
    pub fn with_repaint(mut self, ctx: egui::Context) -> Self {
        self.repaint = Some(ctx);
        self
    }

    /// Captures, samples and snapshots one frame.
    pub fn step(&mut self) -> Result<ViewerEvent, String> {
        self.device.update_frame().map_err(|e| format!("capture: {e}"))?;
        let stats = self.preset.run(&self.driver).map_err(|e| format!("graph: {e}"))?;
        self.frame += 1;

        let panels = self
            .preset
            .panels
            .iter()
            .map(|panel| {
                let (w, h) = panel.buffer.dimensions();
                let bytes = panel.buffer.to_bytes();
                PanelFrame {
                    name: panel.name,
                    image: ColorImage::from_rgba_unmultiplied([w as usize, h as usize], &bytes),
                }
            })
            .collect();

        Ok(ViewerEvent::Frame {
            index: self.frame,
            panels,
            stats,
        })
    }

    /// Frames produced so far.
    pub fn frames(&self) -> u64 {
        self.frame
    }

    fn notify(&self) {
        if let Some(ctx) = &self.repaint {
            ctx.request_repaint();
        }
    }

    /// Sends an event that must arrive. Returns false once the UI is gone.
    fn send(&self, event: ViewerEvent) -> bool {
        let ok = self.tx.send(event).is_ok();
        self.notify();
        ok
    }

    /// Sends a frame, dropping it if the UI is behind.
    fn offer(&self, event: ViewerEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => {
                self.notify();
                true
            }
            Err(TrySendError::Full(_)) => {
                trace!(frame = self.frame, "ui busy, frame dropped");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    fn fail(&mut self, msg: String) -> bool {
        error!(error = %msg, "sampling stopped");
        self.failed = true;
        self.send(ViewerEvent::Error(msg))
    }

    /// Applies a control message. Returns false on close.
    fn handle(&mut self, msg: ViewerMsg) -> bool {
        match msg {
            ViewerMsg::Close => return false,
            ViewerMsg::Pause => self.paused = true,
            ViewerMsg::Resume => self.paused = false,
        }
        debug!(paused = self.paused, "worker state");
        self.send(ViewerEvent::Paused(self.paused))
    }

    /// Starts the capture device and announces it to the UI.
    pub fn start(&mut self) -> Result<(), String> {
        self.device.start().map_err(|e| format!("capture: {e}"))?;
        let started = ViewerEvent::Started {
            source: self.device.source_name().to_string(),
            resolution: self.device.resolution(),
            workers: self.driver.workers(),
        };
        self.send(started);
        Ok(())
    }

    /// Main loop. Returns when the UI closes or sends [`ViewerMsg::Close`].
    pub fn run(mut self) {
        if let Err(msg) = self.start() {
            if !self.fail(msg) {
                return;
            }
        }

        loop {
            let idle = self.paused || self.failed;
            let msg = if idle {
                match self.rx.recv() {
                    Ok(msg) => Some(msg),
                    Err(_) => break,
                }
            } else {
                match self.rx.try_recv() {
                    Ok(msg) => Some(msg),
                    Err(TryRecvError::Empty) => None,
                    Err(TryRecvError::Disconnected) => break,
                }
            };
            if let Some(msg) = msg {
                if !self.handle(msg) {
                    break;
                }
                continue;
            }

            let started = Instant::now();
            let alive = match self.step() {
                Ok(event) => self.offer(event),
                Err(msg) => self.fail(msg),
            };
            if !alive {
                break;
            }
            if let Some(min) = self.min_frame_time {
                let spent = started.elapsed();
                if spent < min {
                    thread::sleep(min - spent);
                }
            }
        }

        if let Err(e) = self.device.stop() {
            error!(error = %e, "failed to stop capture");
        }
        info!(frames = self.frame, "frame worker shut down");
    }
}
