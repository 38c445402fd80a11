//! Upload flow: file selection, upload submission and progress.

use crate::error::ClientError;
use crate::models::{DatasetFile, DatasetHandle};
use crate::request::{Generation, RequestTracker};

pub const CSV_REQUIRED: &str = "Please upload a CSV file";
pub const NO_FILE_SELECTED: &str = "Please select a file first";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UploadState {
    #[default]
    Idle,
    FileSelected,
    Uploading,
    Succeeded(DatasetHandle),
    Failed(String),
}

/// Work the caller must perform to carry out an accepted upload.
#[derive(Debug, Clone)]
pub struct UploadTicket {
    pub generation: Generation,
    pub file: DatasetFile,
}

pub fn is_csv_name(name: &str) -> bool {
    name.ends_with(".csv")
}

#[derive(Debug, Default)]
pub struct UploadFlow {
    state: UploadState,
    file: Option<DatasetFile>,
    progress: f32,
    tracker: RequestTracker,
}

impl UploadFlow {
    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn file(&self) -> Option<&DatasetFile> {
        self.file.as_ref()
    }

    pub fn is_uploading(&self) -> bool {
        self.state == UploadState::Uploading
    }

    /// Percent sent; `None` outside of an upload.
    pub fn progress(&self) -> Option<f32> {
        self.is_uploading().then_some(self.progress)
    }

    pub fn dataset(&self) -> Option<&DatasetHandle> {
        match &self.state {
            UploadState::Succeeded(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn can_upload(&self) -> bool {
        self.file.is_some()
            && matches!(self.state, UploadState::FileSelected | UploadState::Failed(_))
    }

    /// Accepts a new file from any state. A non-CSV name leaves everything
    /// untouched. An in-flight upload for the previous file is abandoned.
    pub fn select_file(&mut self, file: DatasetFile) -> Result<(), ClientError> {
        if !is_csv_name(file.name()) {
            return Err(ClientError::validation(CSV_REQUIRED));
        }
        if self.tracker.in_flight() {
            tracing::debug!("Abandoning in-flight upload for newly selected file");
            self.tracker.abandon();
        }
        self.file = Some(file);
        self.progress = 0.0;
        self.state = UploadState::FileSelected;
        Ok(())
    }

    pub fn begin_upload(&mut self) -> Result<UploadTicket, ClientError> {
        let Some(file) = self.file.clone() else {
            return Err(ClientError::validation(NO_FILE_SELECTED));
        };
        match self.state {
            UploadState::FileSelected | UploadState::Failed(_) => {}
            UploadState::Uploading => {
                return Err(ClientError::validation("An upload is already in progress"));
            }
            UploadState::Succeeded(_) => {
                return Err(ClientError::validation(
                    "This file has already been uploaded; select a new file to upload again",
                ));
            }
            UploadState::Idle => return Err(ClientError::validation(NO_FILE_SELECTED)),
        }
        self.progress = 0.0;
        self.state = UploadState::Uploading;
        let generation = self.tracker.issue();
        Ok(UploadTicket { generation, file })
    }

    /// Applies a progress event; stale events and regressions are ignored.
    pub fn record_progress(&mut self, generation: Generation, percent: f32) {
        if !self.tracker.is_current(generation) || !percent.is_finite() {
            return;
        }
        self.progress = self.progress.max(percent.clamp(0.0, 100.0));
    }

    /// Applies the outcome of upload `generation`.
    ///
    /// Returns `None` when the upload was superseded. The dataset handle is
    /// returned at most once per successful upload.
    pub fn finish(
        &mut self,
        generation: Generation,
        result: Result<DatasetHandle, ClientError>,
    ) -> Option<Result<DatasetHandle, ClientError>> {
        if !self.tracker.settle(generation) {
            tracing::debug!(?generation, "Ignoring stale upload completion");
            return None;
        }
        match &result {
            Ok(handle) => {
                self.progress = 100.0;
                self.state = UploadState::Succeeded(handle.clone());
            }
            Err(err) => self.state = UploadState::Failed(err.to_string()),
        }
        Some(result)
    }
}
