//! Predict flow: model choice and training/prediction submission.

use crate::error::ClientError;
use crate::models::{DatasetHandle, ModelKind, PredictionResults};
use crate::request::{Generation, RequestTracker};

pub const NO_DATASET: &str = "Please upload a dataset first";

#[derive(Debug, Clone)]
pub struct PredictTicket {
    pub generation: Generation,
    pub model: ModelKind,
    pub dataset_id: String,
}

#[derive(Debug, Default)]
pub struct PredictFlow {
    model: ModelKind,
    dataset: Option<DatasetHandle>,
    training: bool,
    tracker: RequestTracker,
}

impl PredictFlow {
    pub fn model(&self) -> ModelKind {
        self.model
    }

    pub fn dataset(&self) -> Option<&DatasetHandle> {
        self.dataset.as_ref()
    }

    pub fn is_training(&self) -> bool {
        self.training
    }

    pub fn can_submit(&self) -> bool {
        self.dataset.is_some() && !self.training
    }

    /// Only affects the next submission.
    pub fn select_model(&mut self, model: ModelKind) {
        self.model = model;
    }

    pub fn set_dataset(&mut self, handle: DatasetHandle) {
        self.dataset = Some(handle);
    }

    /// Drops the dataset handle and abandons any prediction that used it.
    pub fn clear_dataset(&mut self) {
        self.dataset = None;
        if self.training {
            self.tracker.abandon();
            self.training = false;
        }
    }

    pub fn submit(&mut self) -> Result<PredictTicket, ClientError> {
        let Some(dataset) = &self.dataset else {
            return Err(ClientError::validation(NO_DATASET));
        };
        if self.training {
            return Err(ClientError::validation("Training is already in progress"));
        }
        let dataset_id = dataset.dataset_id.clone();
        self.training = true;
        let generation = self.tracker.issue();
        Ok(PredictTicket {
            generation,
            model: self.model,
            dataset_id,
        })
    }

    /// Applies the outcome of prediction `generation`. Model and dataset are
    /// kept on failure so the user can retry.
    pub fn finish(
        &mut self,
        generation: Generation,
        result: Result<PredictionResults, ClientError>,
    ) -> Option<Result<PredictionResults, ClientError>> {
        if !self.tracker.settle(generation) {
            tracing::debug!(?generation, "Ignoring stale prediction");
            return None;
        }
        self.training = false;
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(id: &str) -> DatasetHandle {
        DatasetHandle {
            dataset_id: id.to_string(),
            rows: None,
        }
    }

    #[test]
    fn defaults_to_random_forest_without_dataset() {
        let flow = PredictFlow::default();
        assert_eq!(flow.model(), ModelKind::RandomForest);
        assert!(!flow.is_training());
        assert!(!flow.can_submit());
    }

    #[test]
    fn submit_without_dataset_fails_locally() {
        let mut flow = PredictFlow::default();
        let err = flow.submit().unwrap_err();
        assert_eq!(err, ClientError::validation(NO_DATASET));
        assert!(!flow.is_training());
    }

    #[test]
    fn submit_binds_model_and_dataset() {
        let mut flow = PredictFlow::default();
        flow.set_dataset(handle("ds-3"));
        flow.select_model(ModelKind::NaiveBayes);
        let ticket = flow.submit().unwrap();
        assert_eq!(ticket.model, ModelKind::NaiveBayes);
        assert_eq!(ticket.dataset_id, "ds-3");
        assert!(flow.is_training());
        assert!(flow.submit().is_err());
    }

    #[test]
    fn model_change_mid_training_only_affects_next_submission() {
        let mut flow = PredictFlow::default();
        flow.set_dataset(handle("ds"));
        let ticket = flow.submit().unwrap();
        flow.select_model(ModelKind::Svm);
        assert_eq!(ticket.model, ModelKind::RandomForest);

        flow.finish(ticket.generation, Ok(PredictionResults::default()));
        assert_eq!(flow.submit().unwrap().model, ModelKind::Svm);
    }

    #[test]
    fn failure_resets_training_and_keeps_selection() {
        let mut flow = PredictFlow::default();
        flow.set_dataset(handle("ds"));
        flow.select_model(ModelKind::PcaSvm);
        let ticket = flow.submit().unwrap();
        let outcome = flow.finish(
            ticket.generation,
            Err(ClientError::PredictionFailed("boom".into())),
        );
        assert!(matches!(outcome, Some(Err(ClientError::PredictionFailed(_)))));
        assert!(!flow.is_training());
        assert_eq!(flow.model(), ModelKind::PcaSvm);
        assert_eq!(flow.dataset(), Some(&handle("ds")));
        assert!(flow.can_submit());
    }

    #[test]
    fn clearing_dataset_abandons_in_flight_prediction() {
        let mut flow = PredictFlow::default();
        flow.set_dataset(handle("ds"));
        let ticket = flow.submit().unwrap();
        flow.clear_dataset();
        assert!(!flow.is_training());
        assert_eq!(
            flow.finish(ticket.generation, Ok(PredictionResults::default())),
            None
        );
        assert_eq!(
            flow.submit().unwrap_err(),
            ClientError::validation(NO_DATASET)
        );
    }
}
