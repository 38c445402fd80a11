use std::time::SystemTime;

use eframe::egui;
use eframe::egui::{Align, Align2, Color32, Layout, RichText, Stroke, Ui};
use egui_extras::{Column, TableBuilder};
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints, Points};
use rfd::FileDialog;

use crate::models::{DatasetFile, ModelKind, PredictionResults};
use crate::results::{self, ConfusionSummary, Intensity, MatrixCell, TOP_FEATURES};
use crate::state::{Action, AppState, NoticeLevel, Tab, Theme};
use crate::upload::{self, UploadState};

const ACCENT: Color32 = Color32::from_rgb(14, 165, 233);
const METRIC_NAMES: [&str; 4] = ["Accuracy", "Precision", "Recall", "F1-Score"];

pub fn nav_panel(ui: &mut Ui, state: &AppState, actions: &mut Vec<Action>) {
    ui.heading("Defect Prediction");
    ui.label(RichText::new("ML Dashboard").weak());
    ui.separator();
    for tab in Tab::ALL {
        if ui
            .selectable_label(state.selected_tab == tab, tab.label())
            .clicked()
        {
            actions.push(Action::SelectTab(tab));
        }
    }
}

pub fn top_bar(ui: &mut Ui, state: &AppState, actions: &mut Vec<Action>) {
    ui.horizontal(|ui| {
        ui.heading("Software Defect Prediction");
        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
            let label = match state.theme {
                Theme::Dark => "☀ Light",
                Theme::Light => "🌙 Dark",
            };
            if ui.button(label).on_hover_text("Toggle theme").clicked() {
                actions.push(Action::ToggleTheme);
            }
        });
    });
}

/// Turns a picked or dropped file into a selection action. Names without a
/// `.csv` suffix are passed on unread so the upload flow can reject them.
pub fn selection_action<F>(name: String, load: F) -> Action
where
    F: FnOnce() -> std::io::Result<DatasetFile>,
{
    if !upload::is_csv_name(&name) {
        return Action::SelectFile(DatasetFile::new(name, Vec::<u8>::new()));
    }
    match load() {
        Ok(file) => Action::SelectFile(file),
        Err(err) => Action::ReportError(format!("Could not read {name}: {err}")),
    }
}

pub fn upload_tab(ui: &mut Ui, state: &AppState, hovering_file: bool, actions: &mut Vec<Action>) {
    ui.heading("Upload Dataset");
    ui.label("Upload a CSV file containing software metrics for defect prediction");
    ui.add_space(8.0);

    let stroke_color = if hovering_file {
        ACCENT
    } else {
        ui.visuals().widgets.noninteractive.bg_stroke.color
    };
    egui::Frame::group(ui.style())
        .stroke(Stroke::new(2.0, stroke_color))
        .show(ui, |ui| {
            ui.set_min_height(140.0);
            ui.vertical_centered(|ui| {
                ui.add_space(24.0);
                ui.label(RichText::new("Drop your CSV file here or click to browse").size(18.0));
                ui.label(RichText::new("Supported format: CSV files only").weak());
                ui.add_space(8.0);
                if ui.button("Browse…").clicked() {
                    if let Some(path) = FileDialog::new().add_filter("CSV", &["csv"]).pick_file() {
                        let name = path
                            .file_name()
                            .and_then(|s| s.to_str())
                            .unwrap_or_default()
                            .to_string();
                        actions.push(selection_action(name, || DatasetFile::from_path(&path)));
                    }
                }
            });
        });

    if let Some(file) = state.upload.file() {
        ui.add_space(8.0);
        egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.vertical(|ui| {
                    ui.label(RichText::new(file.name()).strong());
                    ui.label(format!("{:.2} KB", file.size_kb()));
                });
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    if state.upload.can_upload() && ui.button("Upload").clicked() {
                        actions.push(Action::StartUpload);
                    }
                });
            });
        });
    }

    if let Some(progress) = state.upload.progress() {
        ui.add_space(8.0);
        ui.horizontal(|ui| {
            ui.label("Uploading...");
            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                ui.label(format!("{progress:.0}%"));
            });
        });
        ui.add(egui::ProgressBar::new(progress / 100.0).fill(ACCENT));
    }

    match state.upload.state() {
        UploadState::Succeeded(handle) => {
            ui.add_space(8.0);
            egui::Frame::group(ui.style()).show(ui, |ui| {
                ui.colored_label(Color32::from_rgb(22, 163, 74), "Upload successful!");
                ui.label(format!("Dataset ID: {}", handle.dataset_id));
                if let Some(rows) = handle.rows {
                    ui.label(format!("Rows: {rows}"));
                }
            });
        }
        UploadState::Failed(message) => {
            ui.add_space(8.0);
            ui.colored_label(Color32::RED, message);
        }
        _ => {}
    }

    ui.add_space(8.0);
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.label(RichText::new("Dataset Requirements:").strong());
        ui.label("• File must be in CSV format");
        ui.label("• Should contain software metrics columns");
        ui.label("• Must include a target column indicating defect status");
    });

    if state.is_previewing() {
        ui.add_space(8.0);
        ui.horizontal(|ui| {
            ui.add(egui::Spinner::new());
            ui.label("Reading preview...");
        });
    } else if let Some(preview) = &state.preview {
        ui.add_space(8.0);
        ui.separator();
        ui.heading("Preview");
        match preview {
            Ok(table) if !table.is_empty() => preview_table(ui, table),
            Ok(_) => {
                ui.label("No columns found in the selected file.");
            }
            Err(err) => {
                ui.colored_label(Color32::YELLOW, err);
            }
        }
    }
}

fn preview_table(ui: &mut Ui, table: &crate::data::PreviewTable) {
    ui.label(
        RichText::new(format!(
            "First {} rows, {} columns",
            table.rows.len(),
            table.columns.len()
        ))
        .weak(),
    );
    egui::ScrollArea::horizontal().show(ui, |ui| {
        let mut builder = TableBuilder::new(ui)
            .striped(true)
            .vscroll(false)
            .cell_layout(Layout::left_to_right(Align::Center));
        for _ in &table.columns {
            builder = builder.column(Column::auto().at_least(60.0));
        }
        builder
            .header(20.0, |mut header| {
                for name in &table.columns {
                    header.col(|ui| {
                        ui.strong(name);
                    });
                }
            })
            .body(|body| {
                body.rows(18.0, table.rows.len(), |mut row| {
                    let row_idx = row.index();
                    for value in &table.rows[row_idx] {
                        row.col(|ui| {
                            ui.label(value);
                        });
                    }
                });
            });
    });
}

pub fn model_tab(ui: &mut Ui, state: &AppState, actions: &mut Vec<Action>) {
    ui.heading("Model Selection");
    ui.label("Choose a machine learning model for defect prediction");
    ui.add_space(8.0);

    let dataset = state.predict.dataset();
    if dataset.is_none() {
        ui.colored_label(
            Color32::from_rgb(202, 138, 4),
            "Please upload a dataset first before selecting a model.",
        );
        ui.add_space(8.0);
    }

    let selected = state.predict.model();
    ui.columns(2, |columns| {
        for (idx, kind) in ModelKind::ALL.into_iter().enumerate() {
            let ui = &mut columns[idx % 2];
            model_card(ui, kind, selected == kind, actions);
            ui.add_space(8.0);
        }
    });

    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.label(RichText::new("Ready to Train").strong().size(16.0));
        ui.horizontal(|ui| {
            ui.vertical(|ui| {
                ui.label(format!("Selected Model: {}", selected.label()));
                match dataset {
                    Some(handle) => ui.label(format!("Dataset ID: {}", handle.dataset_id)),
                    None => ui.label("No dataset uploaded"),
                };
            });
            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                if state.predict.is_training() {
                    ui.label("Training...");
                    ui.add(egui::Spinner::new());
                } else if ui
                    .add_enabled(
                        state.predict.can_submit(),
                        egui::Button::new("▶ Start Training"),
                    )
                    .clicked()
                {
                    actions.push(Action::StartPrediction);
                }
            });
        });
    });
}

fn model_card(ui: &mut Ui, kind: ModelKind, selected: bool, actions: &mut Vec<Action>) {
    let stroke = if selected {
        Stroke::new(2.0, ACCENT)
    } else {
        ui.visuals().widgets.noninteractive.bg_stroke
    };
    egui::Frame::group(ui.style()).stroke(stroke).show(ui, |ui| {
        ui.set_width(ui.available_width());
        let title = RichText::new(kind.label()).strong().size(16.0);
        if ui.selectable_label(selected, title).clicked() {
            actions.push(Action::SelectModel(kind));
        }
        ui.label(RichText::new(kind.description()).weak());
        for highlight in kind.highlights() {
            ui.label(format!("• {highlight}"));
        }
    });
}

pub fn results_tab(ui: &mut Ui, state: &AppState, actions: &mut Vec<Action>) {
    let Some(results) = &state.results else {
        ui.heading("Results Dashboard");
        ui.label("Train a model to view prediction results");
        ui.add_space(24.0);
        ui.vertical_centered(|ui| {
            ui.label(RichText::new("No Results Yet").size(20.0).strong());
            ui.label(
                "Upload a dataset and train a model to see prediction metrics and visualizations here.",
            );
        });
        return;
    };

    ui.horizontal(|ui| {
        ui.vertical(|ui| {
            ui.heading("Results Dashboard");
            ui.label(format!(
                "Model: {} | Dataset: {}",
                or_placeholder(&results.model, "Unknown"),
                or_placeholder(&results.dataset_id, "N/A"),
            ));
        });
        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
            if ui.button("⬇ Download Report").clicked() {
                download_report(results, actions);
            }
        });
    });
    ui.add_space(8.0);

    let series = results::metric_series(&results.metrics);
    ui.columns(4, |columns| {
        for (column, (name, percent)) in columns.iter_mut().zip(series) {
            egui::Frame::group(column.style()).show(column, |ui| {
                ui.set_width(ui.available_width());
                ui.label(RichText::new(name).weak());
                ui.label(
                    RichText::new(results::format_percent(percent / 100.0))
                        .size(24.0)
                        .strong(),
                );
            });
        }
    });
    ui.add_space(8.0);

    ui.columns(2, |columns| {
        confusion_matrix(&mut columns[0], results);
        metrics_bar_chart(&mut columns[1], &series);
    });
    ui.add_space(8.0);
    metrics_line_chart(ui, &series);

    let top = results::top_features(results, TOP_FEATURES);
    if !top.is_empty() {
        ui.add_space(8.0);
        egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.label(RichText::new("Feature Importance").strong().size(16.0));
            for (feature, importance) in top {
                ui.horizontal(|ui| {
                    ui.label(feature);
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(results::format_percent(importance));
                    });
                });
                ui.add(egui::ProgressBar::new(importance.clamp(0.0, 1.0) as f32).fill(ACCENT));
            }
        });
    }
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.is_empty() { placeholder } else { value }
}

fn download_report(results: &PredictionResults, actions: &mut Vec<Action>) {
    let Some(path) = FileDialog::new()
        .set_file_name(results::report_file_name(SystemTime::now()))
        .add_filter("JSON", &["json"])
        .save_file()
    else {
        return;
    };
    match results::save_report(&path, results) {
        Ok(()) => actions.push(Action::ReportSaved(path)),
        Err(err) => actions.push(Action::ReportError(err.to_string())),
    }
}

fn confusion_matrix(ui: &mut Ui, results: &PredictionResults) {
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.set_width(ui.available_width());
        ui.label(RichText::new("Confusion Matrix").strong().size(16.0));
        let Some(matrix) = &results.confusion_matrix else {
            ui.label("No data available");
            return;
        };
        let summary = ConfusionSummary::new(matrix);
        egui::Grid::new("confusion_matrix")
            .spacing([8.0, 8.0])
            .show(ui, |ui| {
                ui.label("");
                ui.label("Predicted: No Defect");
                ui.label("Predicted: Defect");
                ui.end_row();
                for (label, row) in ["Actual: No Defect", "Actual: Defect"]
                    .into_iter()
                    .zip(summary.cells.iter())
                {
                    ui.label(label);
                    for cell in row {
                        matrix_cell(ui, cell);
                    }
                    ui.end_row();
                }
            });
        ui.label(RichText::new(format!("Total samples: {}", summary.total)).weak());
    });
}

fn intensity_colors(intensity: Intensity) -> (Color32, Color32) {
    match intensity {
        Intensity::Strong => (Color32::from_rgb(37, 99, 235), Color32::WHITE),
        Intensity::Medium => (Color32::from_rgb(96, 165, 250), Color32::WHITE),
        Intensity::Light => (
            Color32::from_rgb(191, 219, 254),
            Color32::from_rgb(31, 41, 55),
        ),
        Intensity::Faint => (
            Color32::from_rgb(219, 234, 254),
            Color32::from_rgb(55, 65, 81),
        ),
    }
}

fn matrix_cell(ui: &mut Ui, cell: &MatrixCell) {
    let (fill, text) = intensity_colors(cell.intensity);
    egui::Frame::default().fill(fill).show(ui, |ui| {
        ui.set_min_size(egui::vec2(120.0, 72.0));
        ui.vertical_centered(|ui| {
            ui.add_space(10.0);
            ui.label(
                RichText::new(cell.count.to_string())
                    .size(22.0)
                    .strong()
                    .color(text),
            );
            ui.label(RichText::new(cell.label).small().color(text));
        });
    });
}

fn metric_axis_label(value: f64) -> String {
    let idx = value.round();
    if (value - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    METRIC_NAMES
        .get(idx as usize)
        .map(|name| name.to_string())
        .unwrap_or_default()
}

fn metrics_bar_chart(ui: &mut Ui, series: &[(&'static str, f64); 4]) {
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.label(RichText::new("Performance Metrics").strong().size(16.0));
        let bars: Vec<Bar> = series
            .iter()
            .enumerate()
            .map(|(i, (name, value))| Bar::new(i as f64, *value).name(*name).width(0.6))
            .collect();
        Plot::new("metrics_bar_chart")
            .height(260.0)
            .include_y(0.0)
            .include_y(100.0)
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .x_axis_formatter(|mark, _| metric_axis_label(mark.value))
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars).color(ACCENT));
            });
    });
}

fn metrics_line_chart(ui: &mut Ui, series: &[(&'static str, f64); 4]) {
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.label(RichText::new("Metrics Comparison").strong().size(16.0));
        let points: Vec<[f64; 2]> = series
            .iter()
            .enumerate()
            .map(|(i, (_, value))| [i as f64, *value])
            .collect();
        Plot::new("metrics_line_chart")
            .height(260.0)
            .include_y(0.0)
            .include_y(100.0)
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .legend(Legend::default())
            .x_axis_formatter(|mark, _| metric_axis_label(mark.value))
            .show(ui, |plot_ui| {
                plot_ui.line(
                    Line::new(PlotPoints::from(points.clone()))
                        .name("value")
                        .color(ACCENT)
                        .width(2.0),
                );
                plot_ui.points(
                    Points::new(PlotPoints::from(points))
                        .color(ACCENT)
                        .radius(6.0),
                );
            });
    });
}

pub fn history_tab(ui: &mut Ui, state: &AppState, actions: &mut Vec<Action>) {
    ui.horizontal(|ui| {
        ui.heading("Stored Results");
        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
            let loading = state.history.is_loading();
            if ui
                .add_enabled(!loading, egui::Button::new("⟳ Refresh"))
                .clicked()
            {
                actions.push(Action::RefreshHistory);
            }
            if loading {
                ui.add(egui::Spinner::new());
            }
        });
    });
    ui.separator();

    if !state.history.is_loaded() {
        ui.label("Click 'Refresh' to load results stored by the backend.");
        return;
    }
    let entries = state.history.entries();
    if entries.is_empty() {
        ui.label("The backend has no stored results.");
        return;
    }

    TableBuilder::new(ui)
        .striped(true)
        .vscroll(false)
        .cell_layout(Layout::left_to_right(Align::Center))
        .column(Column::auto().at_least(80.0))
        .column(Column::auto().at_least(120.0))
        .column(Column::auto().at_least(120.0))
        .column(Column::auto().at_least(80.0))
        .column(Column::auto().at_least(80.0))
        .column(Column::remainder())
        .header(20.0, |mut header| {
            for title in ["ID", "Model", "Dataset", "Accuracy", "F1-Score", ""] {
                header.col(|ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|body| {
            body.rows(22.0, entries.len(), |mut row| {
                let entry = &entries[row.index()];
                row.col(|ui| {
                    ui.label(entry.id.as_deref().unwrap_or("—"));
                });
                row.col(|ui| {
                    ui.label(or_placeholder(&entry.model, "Unknown"));
                });
                row.col(|ui| {
                    ui.label(or_placeholder(&entry.dataset_id, "N/A"));
                });
                row.col(|ui| {
                    ui.label(results::format_percent(entry.metrics.accuracy));
                });
                row.col(|ui| {
                    ui.label(results::format_percent(entry.metrics.f1_score));
                });
                row.col(|ui| {
                    let opening = entry.id.is_some() && state.history.opening() == entry.id.as_deref();
                    if opening {
                        ui.add(egui::Spinner::new());
                    } else if let Some(id) = &entry.id {
                        if ui.button("Open").clicked() {
                            actions.push(Action::OpenResult(id.clone()));
                        }
                    }
                });
            });
        });
}

pub fn about_tab(ui: &mut Ui) {
    ui.heading("About Project");
    ui.label("Software Defect Prediction Using Machine Learning");
    ui.add_space(8.0);

    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.label(RichText::new("Project Overview").strong().size(18.0));
        ui.label(
            "This application uses machine learning to predict software defects before they \
             occur. By analyzing software metrics it helps development teams identify high-risk \
             modules and allocate testing resources more effectively. Several algorithms are \
             supported so performance can be compared on the same dataset.",
        );
    });
    ui.add_space(8.0);

    let features = [
        (
            "Accurate Predictions",
            "Uses ML algorithms to identify defect-prone software modules",
        ),
        (
            "Multiple Models",
            "Choose from Random Forest, Naïve Bayes, SVM, and PCA+SVM",
        ),
        (
            "Reliable Results",
            "Accuracy, precision, recall, and F1-score for every run",
        ),
    ];
    ui.columns(features.len(), |columns| {
        for (column, (title, description)) in columns.iter_mut().zip(features) {
            egui::Frame::group(column.style()).show(column, |ui| {
                ui.set_width(ui.available_width());
                ui.label(RichText::new(title).strong());
                ui.label(RichText::new(description).weak());
            });
        }
    });
    ui.add_space(8.0);

    let stack = [
        ("Dashboard", "eframe / egui, egui_plot, ureq"),
        ("Backend", "Python, Flask/FastAPI, Scikit-learn, Pandas"),
        ("ML Models", "Random Forest, Naïve Bayes, SVM, PCA"),
    ];
    egui::Grid::new("tech_stack").striped(true).show(ui, |ui| {
        for (category, items) in stack {
            ui.strong(category);
            ui.label(items);
            ui.end_row();
        }
    });
}

pub fn notices_overlay(ctx: &egui::Context, state: &AppState, actions: &mut Vec<Action>) {
    if state.notices.is_empty() {
        return;
    }
    egui::Area::new(egui::Id::new("notices"))
        .order(egui::Order::Foreground)
        .anchor(Align2::RIGHT_TOP, [-12.0, 48.0])
        .show(ctx, |ui| {
            for (index, notice) in state.notices.iter().enumerate() {
                let color = match notice.level {
                    NoticeLevel::Success => Color32::from_rgb(16, 185, 129),
                    NoticeLevel::Warning => Color32::from_rgb(234, 179, 8),
                    NoticeLevel::Error => Color32::from_rgb(239, 68, 68),
                };
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.horizontal(|ui| {
                        ui.colored_label(color, &notice.message);
                        if ui.small_button("✕").clicked() {
                            actions.push(Action::DismissNotice(index));
                        }
                    });
                });
                ui.add_space(4.0);
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_csv_selection_is_not_read() {
        let action = selection_action("report.pdf".to_string(), || {
            panic!("non-CSV files must not be read")
        });
        match action {
            Action::SelectFile(file) => {
                assert_eq!(file.name(), "report.pdf");
                assert_eq!(file.size(), 0);
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn unreadable_csv_reports_error() {
        let action = selection_action("gone.csv".to_string(), || {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"))
        });
        assert!(matches!(action, Action::ReportError(message) if message.contains("gone.csv")));
    }

    #[test]
    fn axis_labels_only_on_integer_marks() {
        assert_eq!(metric_axis_label(0.0), "Accuracy");
        assert_eq!(metric_axis_label(3.0), "F1-Score");
        assert_eq!(metric_axis_label(1.5), "");
        assert_eq!(metric_axis_label(4.0), "");
        assert_eq!(metric_axis_label(-1.0), "");
    }
}
