//! Main viewer application with eframe/egui integration.
//!
//! Handles UI rendering and user interaction. Frames are produced by the
//! [`FrameWorker`](crate::handler::FrameWorker) thread.

use std::sync::mpsc::{Receiver, Sender, channel, sync_channel};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use egui::{Color32, TextureHandle, TextureOptions};
use tracing::warn;

use crate::ViewerConfig;
use crate::handler::FrameWorker;
use crate::messages::{ViewerEvent, ViewerMsg};
use crate::state::{ViewerState, fit_size, grid_size, panel_cell};

/// Frames buffered between worker and UI before the worker drops frames.
const EVENT_QUEUE: usize = 2;

/// Gap between panels in points.
const PANEL_GAP: f32 = 4.0;

struct PanelTexture {
    name: &'static str,
    texture: TextureHandle,
}

/// Main viewer application.
pub struct ViewerApp {
    /// Sender for commands to worker thread.
    tx: Sender<ViewerMsg>,
    /// Receiver for frames from worker thread.
    rx: Receiver<ViewerEvent>,
    /// Worker thread handle (Option for Drop).
    worker: Option<JoinHandle<()>>,

    panels: Vec<PanelTexture>,
    state: ViewerState,
}

impl ViewerApp {
    /// Creates the app and spawns the frame worker.
    pub fn new(cc: &eframe::CreationContext<'_>, config: ViewerConfig) -> Self {
        let (tx_to_worker, rx_in_worker) = channel();
        let (tx_to_ui, rx_from_worker) = sync_channel(EVENT_QUEUE);

        let mut state = ViewerState::default();
        let worker = match FrameWorker::new(&config, rx_in_worker, tx_to_ui) {
            Ok(worker) => {
                let worker = worker.with_repaint(cc.egui_ctx.clone());
                Some(thread::spawn(move || worker.run()))
            }
            Err(msg) => {
                warn!(error = %msg, "frame worker not started");
                state.error = Some(msg);
                None
            }
        };

        Self {
            tx: tx_to_worker,
            rx: rx_from_worker,
            worker,
            panels: Vec::new(),
            state,
        }
    }

    fn send(&self, msg: ViewerMsg) {
        let _ = self.tx.send(msg);
    }

    /// Process all pending events from worker.
    fn process_events(&mut self, ctx: &egui::Context) {
        while let Ok(event) = self.rx.try_recv() {
            match event {
                ViewerEvent::Started {
                    source,
                    resolution,
                    workers,
                } => {
                    self.state.source = source;
                    self.state.resolution = Some(resolution);
                    self.state.workers = workers;
                }
                ViewerEvent::Frame { index, panels, stats } => {
                    for (i, frame) in panels.into_iter().enumerate() {
                        let reuse = self.panels.get(i).is_some_and(|p| p.name == frame.name);
                        if reuse {
                            self.panels[i].texture.set(frame.image, TextureOptions::NEAREST);
                            continue;
                        }
                        let texture = ctx.load_texture(frame.name, frame.image, TextureOptions::NEAREST);
                        let entry = PanelTexture {
                            name: frame.name,
                            texture,
                        };
                        if i < self.panels.len() {
                            self.panels[i] = entry;
                        } else {
                            self.panels.push(entry);
                        }
                    }
                    self.state.record_frame(index, stats, Instant::now());
                }
                ViewerEvent::Paused(paused) => self.state.paused = paused,
                ViewerEvent::Error(msg) => self.state.error = Some(msg),
            }
        }
    }

    /// Handle keyboard input. Returns true if should exit.
    fn handle_input(&mut self, ctx: &egui::Context) -> bool {
        let mut exit = false;
        let mut toggle = false;
        ctx.input(|i| {
            exit = i.key_pressed(egui::Key::Escape);
            toggle = i.key_pressed(egui::Key::Space);
        });
        if toggle {
            self.toggle_pause();
        }
        exit
    }

    fn toggle_pause(&mut self) {
        if self.state.paused {
            self.send(ViewerMsg::Resume);
        } else {
            self.send(ViewerMsg::Pause);
        }
    }

    fn draw_status(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let label = if self.state.paused { "Resume" } else { "Pause" };
                if ui.button(label).clicked() {
                    self.toggle_pause();
                }
                ui.separator();
                ui.monospace(self.state.status_line());
            });
        });
        egui::TopBottomPanel::bottom("hints").show(ctx, |ui| {
            ui.label("Space: Pause/Resume | Esc: Exit");
        });
    }

    fn draw_panels(&self, ctx: &egui::Context) {
        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(Color32::BLACK))
            .show(ctx, |ui| {
                if let Some(err) = &self.state.error {
                    ui.colored_label(Color32::RED, err);
                }
                if self.panels.is_empty() {
                    return;
                }

                let area = ui.available_rect_before_wrap();
                let (cols, rows) = grid_size(self.panels.len());
                let cell = [
                    (area.width() - PANEL_GAP * (cols as f32 - 1.0)) / cols as f32,
                    (area.height() - PANEL_GAP * (rows as f32 - 1.0)) / rows as f32,
                ];
                let painter = ui.painter_at(area);

                for (i, panel) in self.panels.iter().enumerate() {
                    let (col, row) = panel_cell(i);
                    let [w, h] = panel.texture.size();
                    let size = fit_size(w as u32, h as u32, cell);
                    let min = area.min
                        + egui::vec2(col as f32 * (cell[0] + PANEL_GAP), row as f32 * (cell[1] + PANEL_GAP));
                    let rect = egui::Rect::from_min_size(min, egui::vec2(size[0], size[1]));
                    painter.image(
                        panel.texture.id(),
                        rect,
                        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                        Color32::WHITE,
                    );
                    painter.text(
                        rect.min + egui::vec2(6.0, 4.0),
                        egui::Align2::LEFT_TOP,
                        panel.name,
                        egui::FontId::monospace(14.0),
                        Color32::YELLOW,
                    );
                }
            });
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_events(ctx);

        if self.handle_input(ctx) {
            self.send(ViewerMsg::Close);
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }

        self.draw_status(ctx);
        self.draw_panels(ctx);
    }
}

impl Drop for ViewerApp {
    fn drop(&mut self) {
        // Signal worker to stop
        let _ = self.tx.send(ViewerMsg::Close);
        // Drain so a worker blocked on a full queue can see the close.
        while self.rx.try_recv().is_ok() {}

        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
