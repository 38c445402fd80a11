//! Chart-ready derivations of a [`PredictionResults`] snapshot and the
//! JSON report export.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::models::{ConfusionMatrix, Metrics, PredictionResults};

pub const TOP_FEATURES: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Failed to encode results: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Failed to write report to {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// The four headline metrics in display order, scaled to percent.
pub fn metric_series(metrics: &Metrics) -> [(&'static str, f64); 4] {
    [
        ("Accuracy", metrics.accuracy * 100.0),
        ("Precision", metrics.precision * 100.0),
        ("Recall", metrics.recall * 100.0),
        ("F1-Score", metrics.f1_score * 100.0),
    ]
}

pub fn format_percent(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

/// Shading band of a confusion-matrix cell by its share of all samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intensity {
    /// more than 40%
    Strong,
    /// more than 20%
    Medium,
    /// more than 10%
    Light,
    Faint,
}

impl Intensity {
    pub fn for_share(count: u64, total: u64) -> Self {
        if total == 0 {
            return Intensity::Faint;
        }
        let scaled = u128::from(count) * 100;
        let total = u128::from(total);
        if scaled > 40 * total {
            Intensity::Strong
        } else if scaled > 20 * total {
            Intensity::Medium
        } else if scaled > 10 * total {
            Intensity::Light
        } else {
            Intensity::Faint
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixCell {
    pub label: &'static str,
    pub count: u64,
    pub intensity: Intensity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionSummary {
    pub total: u64,
    /// Rows are actual class, columns predicted class: `[[tn, fp], [fn, tp]]`.
    pub cells: [[MatrixCell; 2]; 2],
}

impl ConfusionSummary {
    pub fn new(matrix: &ConfusionMatrix) -> Self {
        let [[tn, fp], [fal_neg, tp]] = *matrix;
        let total = [tn, fp, fal_neg, tp]
            .into_iter()
            .fold(0u64, u64::saturating_add);
        let cell = |label: &'static str, count: u64| MatrixCell {
            label,
            count,
            intensity: Intensity::for_share(count, total),
        };
        ConfusionSummary {
            total,
            cells: [
                [cell("True Negative", tn), cell("False Positive", fp)],
                [cell("False Negative", fal_neg), cell("True Positive", tp)],
            ],
        }
    }
}

/// Highest-ranked features, most important first. Ties keep name order.
pub fn top_features(results: &PredictionResults, limit: usize) -> Vec<(String, f64)> {
    let Some(importance) = &results.feature_importance else {
        return Vec::new();
    };
    let mut ranked: Vec<(String, f64)> = importance
        .iter()
        .map(|(name, value)| (name.clone(), *value))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(limit);
    ranked
}

pub fn report_file_name(now: SystemTime) -> String {
    let millis = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("prediction-results-{millis}.json")
}

pub fn report_json(results: &PredictionResults) -> Result<String, ReportError> {
    Ok(serde_json::to_string_pretty(results)?)
}

pub fn save_report(path: &Path, results: &PredictionResults) -> Result<(), ReportError> {
    let json = report_json(results)?;
    std::fs::write(path, json).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), "Saved results report");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Duration;

    #[test]
    fn metric_series_is_percent_in_fixed_order() {
        let metrics = Metrics {
            accuracy: 0.91,
            precision: 0.87,
            recall: 0.93,
            f1_score: 0.90,
        };
        let values: Vec<i64> = metric_series(&metrics)
            .iter()
            .map(|(_, v)| v.round() as i64)
            .collect();
        assert_eq!(values, vec![91, 87, 93, 90]);
        let names: Vec<&str> = metric_series(&metrics).iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["Accuracy", "Precision", "Recall", "F1-Score"]);
    }

    #[test]
    fn confusion_matrix_bands_by_share_of_total() {
        let summary = ConfusionSummary::new(&[[50, 5], [3, 42]]);
        assert_eq!(summary.total, 100);
        let bands: Vec<Intensity> = summary
            .cells
            .iter()
            .flatten()
            .map(|cell| cell.intensity)
            .collect();
        assert_eq!(
            bands,
            vec![
                Intensity::Strong,
                Intensity::Faint,
                Intensity::Faint,
                Intensity::Strong
            ]
        );
        assert_eq!(summary.cells[1][0].label, "False Negative");
    }

    #[test]
    fn band_thresholds_are_exclusive() {
        assert_eq!(Intensity::for_share(40, 100), Intensity::Medium);
        assert_eq!(Intensity::for_share(20, 100), Intensity::Light);
        assert_eq!(Intensity::for_share(11, 100), Intensity::Light);
        assert_eq!(Intensity::for_share(10, 100), Intensity::Faint);
        assert_eq!(Intensity::for_share(0, 0), Intensity::Faint);
    }

    #[test]
    fn huge_counts_saturate_total() {
        let summary = ConfusionSummary::new(&[[u64::MAX, 1], [0, u64::MAX]]);
        assert_eq!(summary.total, u64::MAX);
        assert_eq!(summary.cells[0][0].intensity, Intensity::Strong);
        assert_eq!(summary.cells[0][1].intensity, Intensity::Faint);
    }

    #[test]
    fn top_features_sorted_descending_and_capped() {
        let importance: BTreeMap<String, f64> = (0..15)
            .map(|i| (format!("f{i:02}"), i as f64 / 100.0))
            .collect();
        let results = PredictionResults {
            feature_importance: Some(importance),
            ..Default::default()
        };
        let top = top_features(&results, TOP_FEATURES);
        assert_eq!(top.len(), 10);
        assert_eq!(top[0].0, "f14");
        assert_eq!(top[9].0, "f05");
        assert!(top.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn top_features_empty_without_importance() {
        assert!(top_features(&PredictionResults::default(), TOP_FEATURES).is_empty());
    }

    #[test]
    fn report_file_name_uses_epoch_millis() {
        let now = UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
        assert_eq!(report_file_name(now), "prediction-results-1700000000123.json");
    }

    #[test]
    fn saved_report_contains_full_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let mut results = PredictionResults {
            model: "svm".into(),
            dataset_id: "ds-1".into(),
            confusion_matrix: Some([[1, 2], [3, 4]]),
            ..Default::default()
        };
        results
            .extra
            .insert("duration_ms".into(), serde_json::json!(1250));

        save_report(&path, &results).unwrap();
        let written: PredictionResults =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, results);
    }

    #[test]
    fn save_report_reports_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("report.json");
        let err = save_report(&path, &PredictionResults::default()).unwrap_err();
        assert!(matches!(err, ReportError::Write { .. }));
    }

    #[test]
    fn format_percent_uses_two_decimals() {
        assert_eq!(format_percent(0.875), "87.50%");
        assert_eq!(format_percent(0.0), "0.00%");
    }
}
