//! HTTP transport for the defect-prediction backend.

use std::io::{self, Cursor, Read};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::config::Config;
use crate::error::ClientError;
use crate::models::{
    DatasetFile, DatasetHandle, ErrorBody, ModelKind, PredictRequest, PredictionResults,
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const GENERIC_PREDICTION_FAILURE: &str = "Prediction failed";
const GENERIC_FETCH_FAILURE: &str = "Failed to fetch results";

/// Calls the dashboard makes against the backend.
///
/// Implementations are blocking; the task runner moves them off the UI
/// thread. Each call is independent and never retried.
pub trait DefectApi: Send + Sync {
    /// Stream `file` to `/upload`, reporting percent sent through `on_progress`.
    fn upload_dataset(
        &self,
        file: &DatasetFile,
        on_progress: &mut dyn FnMut(f32),
    ) -> Result<DatasetHandle, ClientError>;

    fn predict(&self, model: ModelKind, dataset_id: &str)
    -> Result<PredictionResults, ClientError>;

    fn fetch_result(&self, result_id: &str) -> Result<PredictionResults, ClientError>;

    fn fetch_results(&self) -> Result<Vec<PredictionResults>, ClientError>;
}

pub struct HttpApi {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpApi {
    pub fn new(config: &Config) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout_read(config.request_timeout)
            .timeout_write(config.request_timeout)
            .build();
        HttpApi {
            base_url: config.api_base_url.clone(),
            agent,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Non-success outcome of one HTTP exchange, before endpoint-specific mapping.
enum Failure {
    Status { status_text: String, body: String },
    Transport(String),
}

fn settle(result: Result<ureq::Response, ureq::Error>) -> Result<ureq::Response, Failure> {
    match result {
        Ok(response) if (200..300).contains(&response.status()) => Ok(response),
        Ok(response) | Err(ureq::Error::Status(_, response)) => {
            let status_text = status_text(&response);
            let body = response.into_string().unwrap_or_default();
            Err(Failure::Status { status_text, body })
        }
        Err(ureq::Error::Transport(err)) => Err(Failure::Transport(err.to_string())),
    }
}

fn status_text(response: &ureq::Response) -> String {
    let text = response.status_text().trim();
    if text.is_empty() {
        format!("HTTP {}", response.status())
    } else {
        text.to_string()
    }
}

fn read_json<T: serde::de::DeserializeOwned>(response: ureq::Response) -> Result<T, ClientError> {
    let body = response
        .into_string()
        .map_err(|err| ClientError::Network(err.to_string()))?;
    serde_json::from_str(&body).map_err(|err| ClientError::MalformedResponse(err.to_string()))
}

impl DefectApi for HttpApi {
    fn upload_dataset(
        &self,
        file: &DatasetFile,
        on_progress: &mut dyn FnMut(f32),
    ) -> Result<DatasetHandle, ClientError> {
        let form = MultipartForm::single_file("file", file);
        let total = form.body.len();
        tracing::info!(file = file.name(), bytes = total, "Uploading dataset");

        let reader = ProgressReader::new(Cursor::new(form.body), total, on_progress);
        let result = self
            .agent
            .post(&self.url("/upload"))
            .set("Accept", "application/json")
            .set("Content-Type", &form.content_type)
            .set("Content-Length", &total.to_string())
            .send(reader);

        match settle(result) {
            Ok(response) => read_json(response),
            Err(Failure::Status { status_text, .. }) => Err(ClientError::UploadFailed(status_text)),
            Err(Failure::Transport(err)) => Err(ClientError::Network(err)),
        }
    }

    fn predict(
        &self,
        model: ModelKind,
        dataset_id: &str,
    ) -> Result<PredictionResults, ClientError> {
        tracing::info!(%model, dataset_id, "Requesting prediction");
        let result = self
            .agent
            .post(&self.url("/predict"))
            .set("Accept", "application/json")
            .send_json(PredictRequest::new(model, dataset_id));

        match settle(result) {
            Ok(response) => read_json(response),
            Err(Failure::Status { body, .. }) => {
                let message = serde_json::from_str::<ErrorBody>(&body)
                    .ok()
                    .and_then(ErrorBody::into_message)
                    .unwrap_or_else(|| GENERIC_PREDICTION_FAILURE.to_string());
                Err(ClientError::PredictionFailed(message))
            }
            Err(Failure::Transport(err)) => Err(ClientError::Network(err)),
        }
    }

    fn fetch_result(&self, result_id: &str) -> Result<PredictionResults, ClientError> {
        let result = self
            .agent
            .get(&self.url(&format!("/results/{result_id}")))
            .set("Accept", "application/json")
            .call();
        match settle(result) {
            Ok(response) => read_json(response),
            Err(Failure::Status { status_text, .. }) => Err(fetch_failed(status_text)),
            Err(Failure::Transport(err)) => Err(ClientError::Network(err)),
        }
    }

    fn fetch_results(&self) -> Result<Vec<PredictionResults>, ClientError> {
        let result = self
            .agent
            .get(&self.url("/results"))
            .set("Accept", "application/json")
            .call();
        match settle(result) {
            Ok(response) => read_result_list(response),
            Err(Failure::Status { status_text, .. }) => Err(fetch_failed(status_text)),
            Err(Failure::Transport(err)) => Err(ClientError::Network(err)),
        }
    }
}

/// A listing must be a JSON array; entries that are not result objects are
/// skipped rather than failing the whole list.
fn read_result_list(response: ureq::Response) -> Result<Vec<PredictionResults>, ClientError> {
    let entries: Vec<serde_json::Value> = read_json(response)?;
    Ok(entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(results) => Some(results),
            Err(err) => {
                tracing::warn!(error = %err, "Skipping unreadable stored result");
                None
            }
        })
        .collect())
}

fn fetch_failed(status_text: String) -> ClientError {
    if status_text.is_empty() {
        ClientError::FetchFailed(GENERIC_FETCH_FAILURE.to_string())
    } else {
        ClientError::FetchFailed(status_text)
    }
}

/// A `multipart/form-data` body assembled in memory so its length is known.
struct MultipartForm {
    content_type: String,
    body: Vec<u8>,
}

impl MultipartForm {
    fn single_file(field: &str, file: &DatasetFile) -> Self {
        let boundary = boundary();
        let filename = file.name().replace(['"', '\r', '\n'], "_");
        let mut body = Vec::with_capacity(file.size() + 256);
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n")
                .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: text/csv\r\n\r\n");
        body.extend_from_slice(file.contents());
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        MultipartForm {
            content_type: format!("multipart/form-data; boundary={boundary}"),
            body,
        }
    }
}

fn boundary() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("----defectscope{nanos:x}")
}

/// Reports `100 * sent / total` every time the transport pulls body bytes.
struct ProgressReader<'a, R> {
    inner: R,
    sent: usize,
    total: usize,
    on_progress: &'a mut dyn FnMut(f32),
}

impl<'a, R: Read> ProgressReader<'a, R> {
    fn new(inner: R, total: usize, on_progress: &'a mut dyn FnMut(f32)) -> Self {
        ProgressReader {
            inner,
            sent: 0,
            total,
            on_progress,
        }
    }
}

impl<R: Read> Read for ProgressReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        if read > 0 && self.total > 0 {
            self.sent = (self.sent + read).min(self.total);
            (self.on_progress)(self.sent as f32 * 100.0 / self.total as f32);
        }
        Ok(read)
    }
}
