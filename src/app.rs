use std::sync::Arc;
use std::time::{Duration, Instant};

use eframe::egui;
use eframe::egui::{Color32, Visuals};

use crate::api::DefectApi;
use crate::config::Config;
use crate::logging::DebugLog;
use crate::models::DatasetFile;
use crate::state::{Action, AppState, Tab, Theme};
use crate::tasks::TaskRunner;
use crate::ui;

const BUSY_REPAINT: Duration = Duration::from_millis(100);

pub struct DashboardApp {
    state: AppState,
    runner: TaskRunner,
    debug_log: DebugLog,
    debug_output: String,
    debug_panel_height: f32,
    debug_panel_visible: bool,
}

impl DashboardApp {
    pub fn new(config: &Config, api: Arc<dyn DefectApi>, debug_log: DebugLog) -> Self {
        DashboardApp {
            state: AppState::new(config),
            runner: TaskRunner::new(api),
            debug_log,
            debug_output: String::new(),
            debug_panel_height: 150.0,
            debug_panel_visible: false,
        }
    }

    fn apply(&mut self, actions: Vec<Action>) {
        for action in actions {
            if let Some(effect) = self.state.dispatch(action) {
                self.runner.spawn(effect);
            }
        }
    }

    fn debug_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("debug_panel")
            .resizable(true)
            .min_height(50.0)
            .default_height(self.debug_panel_height)
            .show_animated(ctx, self.debug_panel_visible, |ui| {
                self.debug_panel_height = ui.available_height();

                ui.horizontal(|ui| {
                    ui.heading("Debug Output");
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("Clear").clicked() {
                            self.debug_log.clear();
                        }
                        if ui.button("Hide").clicked() {
                            self.debug_panel_visible = false;
                        }
                    });
                });
                ui.separator();

                self.debug_output = self.debug_log.snapshot();
                egui::ScrollArea::vertical()
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        ui.add(
                            egui::TextEdit::multiline(&mut self.debug_output)
                                .desired_width(f32::INFINITY)
                                .desired_rows(10)
                                .font(egui::TextStyle::Monospace)
                                .code_editor()
                                .interactive(false),
                        );
                    });
            });
    }
}

fn dropped_file_action(file: egui::DroppedFile) -> Action {
    if let Some(bytes) = file.bytes {
        return ui::selection_action(file.name.clone(), || {
            Ok(DatasetFile::new(file.name, bytes))
        });
    }
    match file.path {
        Some(path) => {
            let name = path
                .file_name()
                .and_then(|s| s.to_str())
                .map(str::to_string)
                .unwrap_or(file.name);
            ui::selection_action(name, || DatasetFile::from_path(&path))
        }
        None => Action::ReportError(format!("Could not read dropped file {}", file.name)),
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.set_visuals(match self.state.theme {
            Theme::Dark => Visuals::dark(),
            Theme::Light => Visuals::light(),
        });

        self.state.notices.prune(Instant::now());
        let completed = self.runner.poll();
        self.apply(completed);

        let mut actions = Vec::new();

        let (hovering_file, dropped) = ctx.input(|i| {
            (
                !i.raw.hovered_files.is_empty(),
                i.raw.dropped_files.clone(),
            )
        });
        // Only one dataset can be selected at a time.
        if let Some(file) = dropped.into_iter().next() {
            actions.push(Action::SelectTab(Tab::Upload));
            actions.push(dropped_file_action(file));
        }

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui::top_bar(ui, &self.state, &mut actions);
        });

        egui::SidePanel::left("nav_panel").show(ctx, |ui| {
            ui.set_width(200.0);
            ui::nav_panel(ui, &self.state, &mut actions);
        });

        self.debug_panel(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| match self.state.selected_tab {
                Tab::Upload => ui::upload_tab(ui, &self.state, hovering_file, &mut actions),
                Tab::Model => ui::model_tab(ui, &self.state, &mut actions),
                Tab::Results => ui::results_tab(ui, &self.state, &mut actions),
                Tab::History => ui::history_tab(ui, &self.state, &mut actions),
                Tab::About => ui::about_tab(ui),
            });

            if !self.debug_panel_visible {
                ui.with_layout(egui::Layout::bottom_up(egui::Align::Center), |ui| {
                    if ui.button("Show Debug Panel").clicked() {
                        self.debug_panel_visible = true;
                    }
                });
            }
        });

        if hovering_file {
            egui::Area::new(egui::Id::new("drop_hint"))
                .order(egui::Order::Foreground)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        ui.colored_label(
                            Color32::from_rgb(14, 165, 233),
                            "Drop your CSV file to select it",
                        );
                    });
                });
        }

        ui::notices_overlay(ctx, &self.state, &mut actions);

        self.apply(actions);

        if !self.runner.is_idle() || !self.state.notices.is_empty() {
            ctx.request_repaint_after(BUSY_REPAINT);
        }
    }
}
