//! Application state container.
//!
//! The UI never mutates state directly; it emits [`Action`]s which
//! [`AppState::dispatch`] applies, possibly returning an [`Effect`] for the
//! task runner to carry out.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::data::PreviewTable;
use crate::error::ClientError;
use crate::history::HistoryFlow;
use crate::models::{DatasetFile, DatasetHandle, ModelKind, PredictionResults};
use crate::predict::PredictFlow;
use crate::request::{Generation, RequestTracker};
use crate::upload::UploadFlow;

#[derive(PartialEq, Debug, Clone, Copy, Default)]
pub enum Tab {
    #[default]
    Upload,
    Model,
    Results,
    History,
    About,
}

impl Tab {
    pub const ALL: [Tab; 5] = [Tab::Upload, Tab::Model, Tab::Results, Tab::History, Tab::About];

    pub fn label(self) -> &'static str {
        match self {
            Tab::Upload => "Upload Dataset",
            Tab::Model => "Model Selection",
            Tab::Results => "Results Dashboard",
            Tab::History => "History",
            Tab::About => "About Project",
        }
    }
}

#[derive(PartialEq, Debug, Clone, Copy, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

impl NoticeLevel {
    fn lifetime(self) -> Duration {
        match self {
            NoticeLevel::Success => Duration::from_secs(3),
            NoticeLevel::Warning | NoticeLevel::Error => Duration::from_secs(4),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    expires_at: Instant,
}

/// Transient toast notifications, newest last.
#[derive(Debug, Default)]
pub struct Notices {
    items: Vec<Notice>,
}

impl Notices {
    pub fn push(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.push_at(level, message, Instant::now());
    }

    pub fn push_at(&mut self, level: NoticeLevel, message: impl Into<String>, now: Instant) {
        self.items.push(Notice {
            level,
            message: message.into(),
            expires_at: now + level.lifetime(),
        });
    }

    pub fn prune(&mut self, now: Instant) {
        self.items.retain(|notice| notice.expires_at > now);
    }

    pub fn dismiss(&mut self, index: usize) {
        if index < self.items.len() {
            self.items.remove(index);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.items.iter()
    }

    pub fn last(&self) -> Option<&Notice> {
        self.items.last()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug)]
pub enum Action {
    SelectTab(Tab),
    ToggleTheme,
    SelectFile(DatasetFile),
    PreviewReady {
        generation: Generation,
        result: Result<PreviewTable, String>,
    },
    StartUpload,
    UploadProgress {
        generation: Generation,
        percent: f32,
    },
    UploadFinished {
        generation: Generation,
        result: Result<DatasetHandle, ClientError>,
    },
    SelectModel(ModelKind),
    StartPrediction,
    PredictionFinished {
        generation: Generation,
        result: Result<PredictionResults, ClientError>,
    },
    RefreshHistory,
    HistoryLoaded {
        generation: Generation,
        result: Result<Vec<PredictionResults>, ClientError>,
    },
    OpenResult(String),
    ResultLoaded {
        generation: Generation,
        result: Result<PredictionResults, ClientError>,
    },
    ReportSaved(PathBuf),
    ReportError(String),
    DismissNotice(usize),
}

/// Network work requested by a state transition.
#[derive(Debug, Clone)]
pub enum Effect {
    Preview {
        generation: Generation,
        file: DatasetFile,
        max_rows: usize,
        infer_schema_length: usize,
    },
    Upload {
        generation: Generation,
        file: DatasetFile,
    },
    Predict {
        generation: Generation,
        model: ModelKind,
        dataset_id: String,
    },
    FetchHistory {
        generation: Generation,
    },
    FetchResult {
        generation: Generation,
        result_id: String,
    },
}

#[derive(Debug)]
pub struct AppState {
    pub selected_tab: Tab,
    pub theme: Theme,
    pub upload: UploadFlow,
    pub predict: PredictFlow,
    pub history: HistoryFlow,
    pub results: Option<PredictionResults>,
    pub preview: Option<Result<PreviewTable, String>>,
    pub notices: Notices,
    preview_request: RequestTracker,
    preview_rows: usize,
    infer_schema_length: usize,
}

impl Default for AppState {
    fn default() -> Self {
        AppState::new(&Config::default())
    }
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        AppState {
            selected_tab: Tab::default(),
            theme: Theme::default(),
            upload: UploadFlow::default(),
            predict: PredictFlow::default(),
            history: HistoryFlow::default(),
            results: None,
            preview: None,
            notices: Notices::default(),
            preview_request: RequestTracker::default(),
            preview_rows: config.preview_rows,
            infer_schema_length: config.infer_schema_length,
        }
    }

    pub fn dispatch(&mut self, action: Action) -> Option<Effect> {
        match action {
            Action::SelectTab(tab) => {
                self.selected_tab = tab;
                None
            }
            Action::ToggleTheme => {
                self.theme = match self.theme {
                    Theme::Dark => Theme::Light,
                    Theme::Light => Theme::Dark,
                };
                None
            }
            Action::SelectFile(file) => self.select_file(file),
            Action::PreviewReady { generation, result } => {
                if self.preview_request.settle(generation) {
                    if let Err(err) = &result {
                        tracing::debug!(error = %err, "Preview unavailable");
                    }
                    self.preview = Some(result);
                }
                None
            }
            Action::StartUpload => match self.upload.begin_upload() {
                Ok(ticket) => {
                    tracing::info!(file = ticket.file.name(), "Starting upload");
                    Some(Effect::Upload {
                        generation: ticket.generation,
                        file: ticket.file,
                    })
                }
                Err(err) => {
                    self.notices.push(NoticeLevel::Error, err.to_string());
                    None
                }
            },
            Action::UploadProgress {
                generation,
                percent,
            } => {
                self.upload.record_progress(generation, percent);
                None
            }
            Action::UploadFinished { generation, result } => {
                match self.upload.finish(generation, result) {
                    Some(Ok(handle)) => {
                        tracing::info!(dataset_id = %handle.dataset_id, rows = ?handle.rows, "Dataset uploaded");
                        self.notices
                            .push(NoticeLevel::Success, "Dataset uploaded successfully!");
                        self.predict.set_dataset(handle);
                        self.selected_tab = Tab::Model;
                    }
                    Some(Err(err)) => {
                        tracing::warn!(error = %err, "Upload failed");
                        self.notices.push(NoticeLevel::Error, err.to_string());
                    }
                    None => {}
                }
                None
            }
            Action::SelectModel(model) => {
                self.predict.select_model(model);
                None
            }
            Action::StartPrediction => match self.predict.submit() {
                Ok(ticket) => {
                    tracing::info!(model = %ticket.model, dataset_id = %ticket.dataset_id, "Starting training");
                    Some(Effect::Predict {
                        generation: ticket.generation,
                        model: ticket.model,
                        dataset_id: ticket.dataset_id,
                    })
                }
                Err(err) => {
                    self.notices.push(NoticeLevel::Error, err.to_string());
                    None
                }
            },
            Action::PredictionFinished { generation, result } => {
                match self.predict.finish(generation, result) {
                    Some(Ok(results)) => {
                        self.notices.push(
                            NoticeLevel::Success,
                            "Model training completed successfully!",
                        );
                        self.show_results(results);
                    }
                    Some(Err(err)) => {
                        tracing::warn!(error = %err, "Prediction failed");
                        self.notices.push(NoticeLevel::Error, err.to_string());
                    }
                    None => {}
                }
                None
            }
            Action::RefreshHistory => match self.history.refresh() {
                Ok(generation) => Some(Effect::FetchHistory { generation }),
                Err(err) => {
                    self.notices.push(NoticeLevel::Warning, err.to_string());
                    None
                }
            },
            Action::HistoryLoaded { generation, result } => {
                match self.history.finish_refresh(generation, result) {
                    Some(Ok(count)) => tracing::debug!(count, "Loaded stored results"),
                    Some(Err(err)) => {
                        tracing::warn!(error = %err, "Listing results failed");
                        self.notices.push(NoticeLevel::Error, err.to_string());
                    }
                    None => {}
                }
                None
            }
            Action::OpenResult(result_id) => match self.history.open(&result_id) {
                Ok(generation) => Some(Effect::FetchResult {
                    generation,
                    result_id,
                }),
                Err(err) => {
                    self.notices.push(NoticeLevel::Warning, err.to_string());
                    None
                }
            },
            Action::ResultLoaded { generation, result } => {
                match self.history.finish_open(generation, result) {
                    Some(Ok(results)) => self.show_results(results),
                    Some(Err(err)) => {
                        tracing::warn!(error = %err, "Loading stored result failed");
                        self.notices.push(NoticeLevel::Error, err.to_string());
                    }
                    None => {}
                }
                None
            }
            Action::ReportSaved(path) => {
                tracing::debug!(path = %path.display(), "Report download finished");
                self.notices
                    .push(NoticeLevel::Success, "Results downloaded successfully!");
                None
            }
            Action::ReportError(message) => {
                tracing::error!(%message, "Reported error");
                self.notices.push(NoticeLevel::Error, message);
                None
            }
            Action::DismissNotice(index) => {
                self.notices.dismiss(index);
                None
            }
        }
    }

    /// True while the preview for the selected file is being parsed.
    pub fn is_previewing(&self) -> bool {
        self.preview_request.in_flight()
    }

    fn select_file(&mut self, file: DatasetFile) -> Option<Effect> {
        match self.upload.select_file(file.clone()) {
            Ok(()) => {
                tracing::info!(file = file.name(), bytes = file.size(), "Selected dataset file");
                self.predict.clear_dataset();
                self.preview = None;
                Some(Effect::Preview {
                    generation: self.preview_request.issue(),
                    file,
                    max_rows: self.preview_rows,
                    infer_schema_length: self.infer_schema_length,
                })
            }
            Err(err) => {
                tracing::warn!(file = file.name(), "Rejected non-CSV file");
                self.notices.push(NoticeLevel::Warning, err.to_string());
                None
            }
        }
    }

    /// Replaces the results snapshot wholesale and switches to the dashboard.
    fn show_results(&mut self, results: PredictionResults) {
        self.results = Some(results);
        self.selected_tab = Tab::Results;
    }
}
