mod support;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use defectscope::api::HttpApi;
use defectscope::config::Config;
use defectscope::models::{DatasetFile, ModelKind};
use defectscope::results::{self, ConfusionSummary, Intensity, TOP_FEATURES};
use defectscope::state::{Action, AppState, Tab};
use defectscope::tasks::TaskRunner;
use support::CannedServer;

fn setup(url: &str) -> (AppState, TaskRunner) {
    let config = Config {
        api_base_url: url.to_string(),
        request_timeout: Duration::from_secs(5),
        ..Config::default()
    };
    let api = Arc::new(HttpApi::new(&config));
    (AppState::new(&config), TaskRunner::new(api))
}

fn dispatch(state: &mut AppState, runner: &mut TaskRunner, action: Action) {
    if let Some(effect) = state.dispatch(action) {
        runner.spawn(effect);
    }
}

fn settle(state: &mut AppState, runner: &mut TaskRunner) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !runner.is_idle() {
        assert!(Instant::now() < deadline, "background work did not finish");
        for action in runner.poll() {
            dispatch(state, runner, action);
        }
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn upload_then_train_shows_results() {
    let prediction = r#"{
        "model": "pca_svm",
        "dataset_id": "ds-1",
        "metrics": {"accuracy": 0.91, "precision": 0.87, "recall": 0.93, "f1_score": 0.9},
        "confusion_matrix": [[50, 5], [3, 42]],
        "feature_importance": {"loc": 0.31, "v(g)": 0.22, "ev(g)": 0.05}
    }"#;
    let server = CannedServer::serve(vec![
        (200, "OK", r#"{"dataset_id":"ds-1","rows":100}"#.to_string()),
        (200, "OK", prediction.to_string()),
    ]);
    let (mut state, mut runner) = setup(&server.url);

    dispatch(
        &mut state,
        &mut runner,
        Action::SelectFile(DatasetFile::new("pc1.csv", b"loc,defects\n1,0\n".to_vec())),
    );
    dispatch(&mut state, &mut runner, Action::StartUpload);
    assert!(state.upload.is_uploading());
    settle(&mut state, &mut runner);
    assert!(state.preview.as_ref().is_some_and(|p| p.is_ok()));

    assert_eq!(state.selected_tab, Tab::Model);
    assert_eq!(
        state.predict.dataset().map(|h| h.dataset_id.as_str()),
        Some("ds-1")
    );
    assert_eq!(server.request().path, "/upload");

    dispatch(&mut state, &mut runner, Action::SelectModel(ModelKind::PcaSvm));
    dispatch(&mut state, &mut runner, Action::StartPrediction);
    assert!(state.predict.is_training());
    settle(&mut state, &mut runner);

    let sent = server.request();
    let body: serde_json::Value = serde_json::from_slice(&sent.body).unwrap();
    assert_eq!(body["model"], "pca_svm");
    assert_eq!(body["dataset_id"], "ds-1");

    assert_eq!(state.selected_tab, Tab::Results);
    assert!(!state.predict.is_training());
    let shown = state.results.as_ref().unwrap();
    let summary = ConfusionSummary::new(shown.confusion_matrix.as_ref().unwrap());
    assert_eq!(summary.cells[0][0].intensity, Intensity::Strong);
    let top = results::top_features(shown, TOP_FEATURES);
    assert_eq!(top[0].0, "loc");
    assert_eq!(
        state.notices.last().map(|n| n.message.as_str()),
        Some("Model training completed successfully!")
    );
}

#[test]
fn failed_upload_leaves_training_unavailable() {
    let server = CannedServer::once(503, "Service Unavailable", "{}");
    let (mut state, mut runner) = setup(&server.url);

    dispatch(
        &mut state,
        &mut runner,
        Action::SelectFile(DatasetFile::new("pc1.csv", b"a\n1\n".to_vec())),
    );
    dispatch(&mut state, &mut runner, Action::StartUpload);
    settle(&mut state, &mut runner);

    assert!(!state.upload.is_uploading());
    assert!(state.upload.can_upload());
    assert!(!state.predict.can_submit());
    assert_eq!(
        state.notices.last().map(|n| n.message.as_str()),
        Some("Upload failed: Service Unavailable")
    );
}

#[test]
fn history_refresh_and_open() {
    let server = CannedServer::serve(vec![
        (
            200,
            "OK",
            r#"[{"id":"r-1","model":"svm","dataset_id":"a"}]"#.to_string(),
        ),
        (
            200,
            "OK",
            r#"{"id":"r-1","model":"svm","dataset_id":"a","metrics":{"accuracy":0.8}}"#
                .to_string(),
        ),
    ]);
    let (mut state, mut runner) = setup(&server.url);

    dispatch(&mut state, &mut runner, Action::RefreshHistory);
    settle(&mut state, &mut runner);
    assert!(state.history.is_loaded());
    assert_eq!(state.history.entries().len(), 1);

    dispatch(&mut state, &mut runner, Action::OpenResult("r-1".to_string()));
    settle(&mut state, &mut runner);
    assert_eq!(server.request().path, "/results");
    assert_eq!(server.request().path, "/results/r-1");
    assert_eq!(state.selected_tab, Tab::Results);
    assert_eq!(
        state.results.as_ref().map(|r| r.metrics.accuracy),
        Some(0.8)
    );
}
