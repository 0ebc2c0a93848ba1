// src/gui.rs
use std::sync::mpsc::{channel, Receiver};
use std::time::Duration;
use eframe::egui;
use egui::Color32;
use egui_plot::{Legend, Line, Plot, PlotBounds, PlotPoints};
use crate::config::{SessionConfig, TimeWindow};
use crate::engine;
use crate::recorder::{csv_path, export_csv_file};
use crate::telemetry::plot::history_ranges;
use crate::telemetry::{CancelFlag, Session};
use crate::types::TelemetryMessage;

const REDRAW_INTERVAL: Duration = Duration::from_millis(50);

const PALETTE: [Color32; 7] = [
    Color32::from_rgb(80, 140, 255),
    Color32::from_rgb(255, 90, 90),
    Color32::from_rgb(90, 220, 120),
    Color32::from_rgb(0, 220, 220),
    Color32::from_rgb(230, 80, 230),
    Color32::from_rgb(240, 220, 60),
    Color32::WHITE,
];

pub struct LivePlotApp {
    // The GUI thread is the only writer of the session.
    session: Session,
    window: TimeWindow,
    cancel: CancelFlag,
    rx: Receiver<TelemetryMessage>,
    is_streaming: bool,
    rejected: usize,
    save_name: String,
    log_messages: Vec<String>,
}

impl LivePlotApp {
    pub fn new(config: SessionConfig) -> Self {
        let (tx, rx) = channel();
        let cancel = CancelFlag::new();
        let session = match config.channels {
            Some(n) => Session::with_channel_count(config.labels.clone(), n),
            None => Session::new(config.labels.clone()),
        };
        let window = config.window;
        engine::spawn_thread(config, cancel.clone(), tx);
        Self {
            session,
            window,
            cancel,
            rx,
            is_streaming: true,
            rejected: 0,
            save_name: String::from("telemetry"),
            log_messages: vec!["Opening source...".to_owned()],
        }
    }

    fn log(&mut self, msg: &str) {
        self.log_messages.push(format!("> {}", msg));
        if self.log_messages.len() > 8 {
            self.log_messages.remove(0);
        }
    }

    fn drain_messages(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            match msg {
                TelemetryMessage::Log(text) => self.log(&text),
                TelemetryMessage::Batch(batch) => {
                    for err in self.session.ingest(batch) {
                        self.rejected += 1;
                        self.log(&format!("dropped record: {err}"));
                    }
                }
                TelemetryMessage::Finished(reason) => {
                    self.is_streaming = false;
                    self.session.close();
                    match reason {
                        Some(reason) => self.log(&reason),
                        None => self.log("Data collection finished."),
                    }
                }
            }
        }
    }

    fn save(&mut self) {
        let path = csv_path(&self.save_name);
        match export_csv_file(&self.session, &path) {
            Ok(rows) => self.log(&format!("{rows} rows saved to {}", path.display())),
            Err(err) => self.log(&format!("save failed: {err}")),
        }
    }

    fn draw_controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if self.is_streaming {
                let stopping = self.cancel.is_cancelled();
                if ui
                    .add_enabled(!stopping, egui::Button::new("Stop"))
                    .clicked()
                {
                    self.cancel.cancel();
                }
                ui.label(if stopping { "stopping..." } else { "collecting" });
            } else {
                ui.label("stopped");
            }
            ui.separator();
            ui.label(format!(
                "{} rows, {} dropped, window {}",
                self.session.row_count(),
                self.rejected,
                self.window.length
            ));
        });
        if self.session.is_closed() && self.session.row_count() > 0 {
            ui.horizontal(|ui| {
                ui.label("Save as:");
                ui.text_edit_singleline(&mut self.save_name);
                if ui.button("Save CSV").clicked() {
                    self.save();
                }
            });
        }
    }

    fn draw_chart(&self, ui: &mut egui::Ui) {
        let Ok((x_lo, x_hi)) = self.session.visible_bound(self.window.length) else {
            ui.centered_and_justified(|ui| {
                ui.label("Waiting for data...");
            });
            return;
        };
        let (y_lo, y_hi) = history_ranges(&self.session)
            .map(|(_, y)| y)
            .unwrap_or((-1.0, 1.0));
        Plot::new("telemetry")
            .legend(Legend::default())
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .show(ui, |plot_ui| {
                plot_ui.set_plot_bounds(PlotBounds::from_min_max([x_lo, y_lo], [x_hi, y_hi]));
                let history = self.session.full_history();
                for (idx, (series, label)) in history.iter().zip(self.session.labels()).enumerate() {
                    let points = series.points();
                    // Timestamps arrive non-decreasing; keep one point left of the window.
                    let start = points.partition_point(|p| p.time < x_lo).saturating_sub(1);
                    let visible: PlotPoints = points[start..]
                        .iter()
                        .map(|p| [p.time, p.value])
                        .collect();
                    plot_ui.line(
                        Line::new(visible)
                            .name(label)
                            .color(PALETTE[idx % PALETTE.len()]),
                    );
                }
            });
    }
}

impl eframe::App for LivePlotApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_messages();
        egui::TopBottomPanel::top("controls").show(ctx, |ui| self.draw_controls(ui));
        egui::TopBottomPanel::bottom("log").show(ctx, |ui| {
            for msg in &self.log_messages {
                ui.monospace(msg);
            }
        });
        egui::CentralPanel::default().show(ctx, |ui| self.draw_chart(ui));
        ctx.request_repaint_after(REDRAW_INTERVAL);
    }
}

impl Drop for LivePlotApp {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
