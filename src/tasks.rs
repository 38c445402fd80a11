//! Runs [`Effect`]s on worker threads and turns their completions back into
//! [`Action`]s for the UI thread.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use poll_promise::Promise;

use crate::api::DefectApi;
use crate::data::{self, PreviewTable};
use crate::error::ClientError;
use crate::models::{DatasetFile, DatasetHandle, PredictionResults};
use crate::request::Generation;
use crate::state::{Action, Effect};

/// One upload attempt as seen by the UI: any number of progress values
/// followed by exactly one terminal event.
#[derive(Debug)]
pub enum UploadEvent {
    Progress(f32),
    Finished(Result<DatasetHandle, ClientError>),
}

enum PendingTask {
    Preview {
        generation: Generation,
        promise: Promise<Result<PreviewTable, String>>,
    },
    Upload {
        generation: Generation,
        events: Receiver<UploadEvent>,
    },
    Predict {
        generation: Generation,
        promise: Promise<Result<PredictionResults, ClientError>>,
    },
    History {
        generation: Generation,
        promise: Promise<Result<Vec<PredictionResults>, ClientError>>,
    },
    StoredResult {
        generation: Generation,
        promise: Promise<Result<PredictionResults, ClientError>>,
    },
}

pub struct TaskRunner {
    api: Arc<dyn DefectApi>,
    pending: Vec<PendingTask>,
}

impl TaskRunner {
    pub fn new(api: Arc<dyn DefectApi>) -> Self {
        TaskRunner {
            api,
            pending: Vec::new(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn spawn(&mut self, effect: Effect) {
        let task = match effect {
            Effect::Preview {
                generation,
                file,
                max_rows,
                infer_schema_length,
            } => {
                let promise = Promise::spawn_thread("csv_preview", move || {
                    data::preview_csv(file.contents(), max_rows, infer_schema_length)
                        .map_err(|err| err.to_string())
                });
                PendingTask::Preview {
                    generation,
                    promise,
                }
            }
            Effect::Upload { generation, file } => {
                let events = spawn_upload(Arc::clone(&self.api), file);
                PendingTask::Upload { generation, events }
            }
            Effect::Predict {
                generation,
                model,
                dataset_id,
            } => {
                let api = Arc::clone(&self.api);
                let promise = Promise::spawn_thread("predict_request", move || {
                    api.predict(model, &dataset_id)
                });
                PendingTask::Predict {
                    generation,
                    promise,
                }
            }
            Effect::FetchHistory { generation } => {
                let api = Arc::clone(&self.api);
                let promise =
                    Promise::spawn_thread("results_request", move || api.fetch_results());
                PendingTask::History {
                    generation,
                    promise,
                }
            }
            Effect::FetchResult {
                generation,
                result_id,
            } => {
                let api = Arc::clone(&self.api);
                let promise = Promise::spawn_thread("result_request", move || {
                    api.fetch_result(&result_id)
                });
                PendingTask::StoredResult {
                    generation,
                    promise,
                }
            }
        };
        self.pending.push(task);
    }

    /// Collects everything that completed since the last poll, in arrival order
    /// per task.
    pub fn poll(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        let pending = std::mem::take(&mut self.pending);
        for task in pending {
            if let Some(task) = poll_task(task, &mut actions) {
                self.pending.push(task);
            }
        }
        actions
    }
}

/// Returns the task back if it has not finished yet.
fn poll_task(task: PendingTask, actions: &mut Vec<Action>) -> Option<PendingTask> {
    match task {
        PendingTask::Preview {
            generation,
            promise,
        } => match promise.try_take() {
            Ok(result) => {
                actions.push(Action::PreviewReady { generation, result });
                None
            }
            Err(promise) => Some(PendingTask::Preview {
                generation,
                promise,
            }),
        },
        PendingTask::Upload { generation, events } => loop {
            match events.try_recv() {
                Ok(UploadEvent::Progress(percent)) => {
                    actions.push(Action::UploadProgress {
                        generation,
                        percent,
                    });
                }
                Ok(UploadEvent::Finished(result)) => {
                    actions.push(Action::UploadFinished { generation, result });
                    return None;
                }
                Err(TryRecvError::Empty) => {
                    return Some(PendingTask::Upload { generation, events });
                }
                Err(TryRecvError::Disconnected) => {
                    actions.push(Action::UploadFinished {
                        generation,
                        result: Err(ClientError::Network(
                            "upload worker stopped unexpectedly".to_string(),
                        )),
                    });
                    return None;
                }
            }
        },
        PendingTask::Predict {
            generation,
            promise,
        } => match promise.try_take() {
            Ok(result) => {
                actions.push(Action::PredictionFinished { generation, result });
                None
            }
            Err(promise) => Some(PendingTask::Predict {
                generation,
                promise,
            }),
        },
        PendingTask::History {
            generation,
            promise,
        } => match promise.try_take() {
            Ok(result) => {
                actions.push(Action::HistoryLoaded { generation, result });
                None
            }
            Err(promise) => Some(PendingTask::History {
                generation,
                promise,
            }),
        },
        PendingTask::StoredResult {
            generation,
            promise,
        } => match promise.try_take() {
            Ok(result) => {
                actions.push(Action::ResultLoaded { generation, result });
                None
            }
            Err(promise) => Some(PendingTask::StoredResult {
                generation,
                promise,
            }),
        },
    }
}

fn spawn_upload(api: Arc<dyn DefectApi>, file: DatasetFile) -> Receiver<UploadEvent> {
    let (sender, events) = mpsc::channel();
    let fallback = sender.clone();
    let spawned = thread::Builder::new()
        .name("upload_request".to_string())
        .spawn(move || {
            let progress = sender.clone();
            let mut on_progress = |percent: f32| {
                let _ = progress.send(UploadEvent::Progress(percent));
            };
            let result = api.upload_dataset(&file, &mut on_progress);
            let _ = sender.send(UploadEvent::Finished(result));
        });
    if let Err(err) = spawned {
        tracing::error!(error = %err, "Failed to start upload worker");
        let _ = fallback.send(UploadEvent::Finished(Err(ClientError::Network(format!(
            "failed to start upload: {err}"
        )))));
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelKind;
    use crate::state::AppState;
    use std::time::{Duration, Instant};

    struct ScriptedApi;

    impl DefectApi for ScriptedApi {
        fn upload_dataset(
            &self,
            file: &DatasetFile,
            on_progress: &mut dyn FnMut(f32),
        ) -> Result<DatasetHandle, ClientError> {
            for percent in [25.0, 50.0, 100.0] {
                on_progress(percent);
            }
            Ok(DatasetHandle {
                dataset_id: format!("id-{}", file.name()),
                rows: Some(3),
            })
        }

        fn predict(
            &self,
            model: ModelKind,
            dataset_id: &str,
        ) -> Result<PredictionResults, ClientError> {
            Ok(PredictionResults {
                model: model.as_str().to_string(),
                dataset_id: dataset_id.to_string(),
                ..Default::default()
            })
        }

        fn fetch_result(&self, result_id: &str) -> Result<PredictionResults, ClientError> {
            Err(ClientError::FetchFailed(format!("Not Found: {result_id}")))
        }

        fn fetch_results(&self) -> Result<Vec<PredictionResults>, ClientError> {
            Ok(vec![PredictionResults::default()])
        }
    }

    fn drain(runner: &mut TaskRunner) -> Vec<Action> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut actions = Vec::new();
        while !runner.is_idle() && Instant::now() < deadline {
            actions.extend(runner.poll());
            thread::sleep(Duration::from_millis(5));
        }
        actions
    }

    #[test]
    fn upload_streams_progress_then_finishes() {
        let mut state = AppState::default();
        let mut runner = TaskRunner::new(Arc::new(ScriptedApi));
        state.dispatch(Action::SelectFile(DatasetFile::new("pc1.csv", b"a\n1\n".to_vec())));
        runner.spawn(state.dispatch(Action::StartUpload).unwrap());

        let actions = drain(&mut runner);
        let progress: Vec<f32> = actions
            .iter()
            .filter_map(|a| match a {
                Action::UploadProgress { percent, .. } => Some(*percent),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![25.0, 50.0, 100.0]);
        assert!(matches!(
            actions.last(),
            Some(Action::UploadFinished { result: Ok(_), .. })
        ));

        for action in actions {
            state.dispatch(action);
        }
        assert_eq!(
            state.predict.dataset().map(|h| h.dataset_id.as_str()),
            Some("id-pc1.csv")
        );
    }

    #[test]
    fn preview_is_parsed_on_worker() {
        let mut state = AppState::default();
        let mut runner = TaskRunner::new(Arc::new(ScriptedApi));
        let effect = state
            .dispatch(Action::SelectFile(DatasetFile::new(
                "kc2.csv",
                b"loc,defects\n10,1\n".to_vec(),
            )))
            .unwrap();
        runner.spawn(effect);

        let actions = drain(&mut runner);
        assert!(matches!(
            actions.as_slice(),
            [Action::PreviewReady { result: Ok(_), .. }]
        ));
        for action in actions {
            state.dispatch(action);
        }
        let table = state.preview.clone().unwrap().unwrap();
        assert_eq!(table.columns, vec!["loc", "defects"]);
    }

    #[test]
    fn predict_and_fetches_report_back_as_actions() {
        let mut runner = TaskRunner::new(Arc::new(ScriptedApi));
        let mut state = AppState::default();
        state.predict.set_dataset(DatasetHandle {
            dataset_id: "ds".into(),
            rows: None,
        });
        runner.spawn(state.dispatch(Action::StartPrediction).unwrap());
        runner.spawn(state.dispatch(Action::RefreshHistory).unwrap());
        runner.spawn(state.dispatch(Action::OpenResult("missing".into())).unwrap());

        let actions = drain(&mut runner);
        assert_eq!(actions.len(), 3);
        for action in actions {
            state.dispatch(action);
        }
        assert_eq!(state.results.as_ref().map(|r| r.model.as_str()), Some("random_forest"));
        assert_eq!(state.history.entries().len(), 1);
        assert!(!state.predict.is_training());
        assert!(
            state
                .notices
                .iter()
                .any(|n| n.message == "Failed to fetch results: Not Found: missing")
        );
    }
}
