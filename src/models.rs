use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::Path;
use std::sync::Arc;

/// A CSV file chosen by the user, held in memory until it is uploaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetFile {
    name: String,
    contents: Arc<[u8]>,
}

impl DatasetFile {
    pub fn new(name: impl Into<String>, contents: impl Into<Arc<[u8]>>) -> Self {
        DatasetFile {
            name: name.into(),
            contents: contents.into(),
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("dataset")
            .to_string();
        let contents = std::fs::read(path)?;
        Ok(DatasetFile::new(name, contents))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    pub fn size(&self) -> usize {
        self.contents.len()
    }

    pub fn size_kb(&self) -> f64 {
        self.contents.len() as f64 / 1024.0
    }
}

/// Backend acknowledgement of an upload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DatasetHandle {
    #[serde(deserialize_with = "identifier")]
    pub dataset_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<u64>,
}

// Backends disagree on whether identifiers are strings or integers.
fn identifier<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number identifier, got {other}"
        ))),
    }
}

fn optional_identifier<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        _ => Ok(None),
    }
}

fn identifier_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(optional_identifier(deserializer)?.unwrap_or_default())
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    #[default]
    RandomForest,
    NaiveBayes,
    Svm,
    PcaSvm,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [
        ModelKind::RandomForest,
        ModelKind::NaiveBayes,
        ModelKind::Svm,
        ModelKind::PcaSvm,
    ];

    /// Identifier sent to the backend.
    pub fn as_str(self) -> &'static str {
        match self {
            ModelKind::RandomForest => "random_forest",
            ModelKind::NaiveBayes => "naive_bayes",
            ModelKind::Svm => "svm",
            ModelKind::PcaSvm => "pca_svm",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ModelKind::RandomForest => "Random Forest",
            ModelKind::NaiveBayes => "Naïve Bayes",
            ModelKind::Svm => "Support Vector Machine",
            ModelKind::PcaSvm => "PCA + SVM",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ModelKind::RandomForest => {
                "Ensemble learning method using multiple decision trees for robust predictions"
            }
            ModelKind::NaiveBayes => {
                "Probabilistic classifier based on Bayes theorem with strong independence assumptions"
            }
            ModelKind::Svm => {
                "Finds optimal hyperplane to separate classes in high-dimensional space"
            }
            ModelKind::PcaSvm => {
                "Combines dimensionality reduction with SVM for improved performance"
            }
        }
    }

    pub fn highlights(self) -> [&'static str; 3] {
        match self {
            ModelKind::RandomForest => [
                "High accuracy",
                "Handles non-linear data",
                "Feature importance",
            ],
            ModelKind::NaiveBayes => [
                "Fast training",
                "Works well with small datasets",
                "Simple interpretation",
            ],
            ModelKind::Svm => [
                "Effective in high dimensions",
                "Memory efficient",
                "Versatile kernels",
            ],
            ModelKind::PcaSvm => [
                "Reduced complexity",
                "Better generalization",
                "Handles multicollinearity",
            ],
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Metrics {
    #[serde(default, deserialize_with = "number_or_zero")]
    pub accuracy: f64,
    #[serde(default, deserialize_with = "number_or_zero")]
    pub precision: f64,
    #[serde(default, deserialize_with = "number_or_zero")]
    pub recall: f64,
    #[serde(default, deserialize_with = "number_or_zero")]
    pub f1_score: f64,
}

// `null`, strings and other non-numbers read as 0.0.
fn number_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<Value>::deserialize(deserializer)?
        .and_then(|value| value.as_f64())
        .unwrap_or_default())
}

fn metrics_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Metrics, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(value @ Value::Object(_)) => serde_json::from_value(value).unwrap_or_default(),
        _ => Metrics::default(),
    })
}

/// `[[tn, fp], [fn, tp]]`
pub type ConfusionMatrix = [[u64; 2]; 2];

/// One prediction run as reported by the backend.
///
/// Fields the dashboard does not interpret are kept in `extra` so a
/// downloaded report contains the full payload. A `confusion_matrix` or
/// `feature_importance` value that cannot be read is kept there verbatim
/// too, and serialized back in place of the typed field.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(from = "WireResults", into = "WireResults")]
pub struct PredictionResults {
    pub id: Option<String>,
    pub model: String,
    pub dataset_id: String,
    pub metrics: Metrics,
    pub confusion_matrix: Option<ConfusionMatrix>,
    pub feature_importance: Option<BTreeMap<String, f64>>,
    pub extra: serde_json::Map<String, Value>,
}

const CONFUSION_MATRIX_KEY: &str = "confusion_matrix";
const FEATURE_IMPORTANCE_KEY: &str = "feature_importance";

/// Results as they appear on the wire, before shape checks.
#[derive(Serialize, Deserialize)]
struct WireResults {
    #[serde(
        default,
        deserialize_with = "optional_identifier",
        skip_serializing_if = "Option::is_none"
    )]
    id: Option<String>,
    #[serde(default, deserialize_with = "identifier_or_empty")]
    model: String,
    #[serde(default, deserialize_with = "identifier_or_empty")]
    dataset_id: String,
    #[serde(default, deserialize_with = "metrics_or_default")]
    metrics: Metrics,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    confusion_matrix: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    feature_importance: Value,
    #[serde(flatten)]
    extra: serde_json::Map<String, Value>,
}

impl From<WireResults> for PredictionResults {
    fn from(wire: WireResults) -> Self {
        let mut extra = wire.extra;

        let confusion_matrix = match wire.confusion_matrix {
            Value::Null => None,
            raw => match serde_json::from_value::<ConfusionMatrix>(raw.clone()) {
                Ok(matrix) => Some(matrix),
                Err(err) => {
                    tracing::warn!(error = %err, "Ignoring malformed confusion matrix");
                    extra.insert(CONFUSION_MATRIX_KEY.to_string(), raw);
                    None
                }
            },
        };

        let feature_importance = match wire.feature_importance {
            Value::Null => None,
            Value::Object(entries) => {
                let numeric: BTreeMap<String, f64> = entries
                    .iter()
                    .filter_map(|(name, value)| value.as_f64().map(|v| (name.clone(), v)))
                    .collect();
                if numeric.len() != entries.len() {
                    tracing::warn!(
                        skipped = entries.len() - numeric.len(),
                        "Ignoring non-numeric feature importances"
                    );
                    extra.insert(FEATURE_IMPORTANCE_KEY.to_string(), Value::Object(entries));
                }
                Some(numeric)
            }
            raw => {
                tracing::warn!("Ignoring malformed feature importance");
                extra.insert(FEATURE_IMPORTANCE_KEY.to_string(), raw);
                None
            }
        };

        PredictionResults {
            id: wire.id,
            model: wire.model,
            dataset_id: wire.dataset_id,
            metrics: wire.metrics,
            confusion_matrix,
            feature_importance,
            extra,
        }
    }
}

impl From<PredictionResults> for WireResults {
    fn from(results: PredictionResults) -> Self {
        let mut extra = results.extra;
        let confusion_matrix = extra.remove(CONFUSION_MATRIX_KEY).unwrap_or_else(|| {
            results
                .confusion_matrix
                .map(|rows| {
                    Value::Array(
                        rows.iter()
                            .map(|row| Value::Array(row.iter().map(|&n| Value::from(n)).collect()))
                            .collect(),
                    )
                })
                .unwrap_or(Value::Null)
        });
        let feature_importance = extra.remove(FEATURE_IMPORTANCE_KEY).unwrap_or_else(|| {
            results
                .feature_importance
                .map(|entries| {
                    Value::Object(
                        entries
                            .into_iter()
                            .map(|(name, value)| (name, Value::from(value)))
                            .collect(),
                    )
                })
                .unwrap_or(Value::Null)
        });
        WireResults {
            id: results.id,
            model: results.model,
            dataset_id: results.dataset_id,
            metrics: results.metrics,
            confusion_matrix,
            feature_importance,
            extra,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PredictRequest {
    pub model: ModelKind,
    pub dataset_id: String,
}

impl PredictRequest {
    pub fn new(model: ModelKind, dataset_id: &str) -> Self {
        PredictRequest {
            model,
            dataset_id: dataset_id.to_string(),
        }
    }
}

/// Error body the backend may attach to a failed call.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message
            .or(self.error)
            .filter(|message| !message.trim().is_empty())
    }
}
