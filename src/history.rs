//! Stored results browsing via `/results` and `/results/{id}`.

use crate::error::ClientError;
use crate::models::PredictionResults;
use crate::request::{Generation, RequestTracker};

#[derive(Debug, Default)]
pub struct HistoryFlow {
    entries: Vec<PredictionResults>,
    loaded: bool,
    list: RequestTracker,
    open: RequestTracker,
    opening: Option<String>,
}

impl HistoryFlow {
    pub fn entries(&self) -> &[PredictionResults] {
        &self.entries
    }

    /// True once a listing has been received.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_loading(&self) -> bool {
        self.list.in_flight()
    }

    pub fn opening(&self) -> Option<&str> {
        self.opening.as_deref()
    }

    pub fn refresh(&mut self) -> Result<Generation, ClientError> {
        if self.list.in_flight() {
            return Err(ClientError::validation("Results are already loading"));
        }
        Ok(self.list.issue())
    }

    pub fn finish_refresh(
        &mut self,
        generation: Generation,
        result: Result<Vec<PredictionResults>, ClientError>,
    ) -> Option<Result<usize, ClientError>> {
        if !self.list.settle(generation) {
            return None;
        }
        Some(result.map(|entries| {
            self.entries = entries;
            self.loaded = true;
            self.entries.len()
        }))
    }

    /// Starts loading one stored result. A newer request supersedes an older one.
    pub fn open(&mut self, result_id: &str) -> Result<Generation, ClientError> {
        if result_id.trim().is_empty() {
            return Err(ClientError::validation("This result has no identifier"));
        }
        self.opening = Some(result_id.to_string());
        Ok(self.open.issue())
    }

    pub fn finish_open(
        &mut self,
        generation: Generation,
        result: Result<PredictionResults, ClientError>,
    ) -> Option<Result<PredictionResults, ClientError>> {
        if !self.open.settle(generation) {
            return None;
        }
        self.opening = None;
        Some(result)
    }
}
