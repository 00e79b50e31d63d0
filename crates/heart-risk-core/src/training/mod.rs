//! Offline model fitting.
//!
//! Impute → fit vocabulary → fit expansion and scaler → split → fit forest → evaluate.
//! Runs as a batch job before the serving process starts; never on a request path.

pub mod metrics;

pub use metrics::{accuracy, ClassificationReport};

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::artifacts::ModelArtifacts;
use crate::encoder::{EncodeError, FittedEncoder};
use crate::forest::{ForestConfig, ForestError, RandomForest};
use crate::models::{AttributeRecord, RiskLabel};

/// Training errors.
#[derive(Error, Debug)]
pub enum TrainingError {
    #[error("Encoding error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Forest error: {0}")]
    Forest(#[from] ForestError),

    #[error("Not enough data: {0}")]
    InsufficientData(String),
}

pub type TrainingResult<T> = Result<T, TrainingError>;

/// One row of the historical dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabeledRecord {
    pub attributes: AttributeRecord,
    pub has_disease: bool,
}

impl LabeledRecord {
    pub fn label(&self) -> RiskLabel {
        if self.has_disease {
            RiskLabel::Have
        } else {
            RiskLabel::DontHave
        }
    }
}

/// Fitting parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub forest: ForestConfig,
    /// Share of rows held out for evaluation
    pub test_fraction: f64,
    pub split_seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            forest: ForestConfig::default(),
            test_fraction: 0.2,
            split_seed: 42,
        }
    }
}

/// Outcome of a fitting run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Held-out accuracy as a percentage
    pub accuracy: f64,
    pub report: ClassificationReport,
    pub n_train: usize,
    pub n_test: usize,
}

/// Shuffle row indices with a seeded RNG and split off `ceil(test_fraction * n)` test rows.
///
/// Returns `(train, test)`.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((n as f64) * test_fraction.clamp(0.0, 1.0)).ceil() as usize;
    let train = indices.split_off(n_test.min(n));
    (train, indices)
}

/// Fit every artifact on the dataset and evaluate on a held-out split.
pub fn fit_artifacts(
    records: &[LabeledRecord],
    config: &TrainingConfig,
) -> TrainingResult<(ModelArtifacts, TrainingReport)> {
    if records.len() < 2 {
        return Err(TrainingError::InsufficientData(format!(
            "need at least 2 records, got {}",
            records.len()
        )));
    }

    tracing::info!(rows = records.len(), "Fitting feature encoder");
    let attributes: Vec<AttributeRecord> = records.iter().map(|r| r.attributes).collect();
    let encoder = FittedEncoder::fit(&attributes)?;

    let x = attributes
        .iter()
        .map(|a| encoder.encode(a).map(|v| v.0))
        .collect::<Result<Vec<_>, _>>()?;
    let y: Vec<usize> = records.iter().map(|r| r.label().class()).collect();

    let (train, test) = train_test_split(records.len(), config.test_fraction, config.split_seed);
    if train.is_empty() || test.is_empty() {
        return Err(TrainingError::InsufficientData(format!(
            "split of {} rows left {} train / {} test",
            records.len(),
            train.len(),
            test.len()
        )));
    }

    let x_train: Vec<Vec<f64>> = train.iter().map(|&i| x[i].clone()).collect();
    let y_train: Vec<usize> = train.iter().map(|&i| y[i]).collect();

    tracing::info!(
        n_train = train.len(),
        n_test = test.len(),
        n_features = encoder.n_features(),
        n_trees = config.forest.n_trees,
        "Fitting classifier"
    );
    let classifier = RandomForest::fit(&x_train, &y_train, &config.forest)?;

    let y_test: Vec<usize> = test.iter().map(|&i| y[i]).collect();
    let predicted = test
        .iter()
        .map(|&i| classifier.predict(&x[i]))
        .collect::<Result<Vec<_>, _>>()?;

    let labels = [RiskLabel::DontHave.as_str(), RiskLabel::Have.as_str()];
    let report = ClassificationReport::new(&y_test, &predicted, &labels);
    let accuracy = report.accuracy * 100.0;
    tracing::info!(accuracy, "Model fitted");

    let artifacts = ModelArtifacts {
        encoder,
        classifier,
        accuracy,
    };
    let report = TrainingReport {
        accuracy,
        report,
        n_train: train.len(),
        n_test: test.len(),
    };
    Ok((artifacts, report))
}


#[cfg(test)]
mod tests {
    use super::fixtures::{cohort, quick_config};
    use super::*;

    #[test]
    fn test_split_sizes() {
        let (train, test) = train_test_split(10, 0.2, 42);
        assert_eq!(test.len(), 2);
        assert_eq!(train.len(), 8);

        let (train, test) = train_test_split(11, 0.2, 42);
        assert_eq!(test.len(), 3);
        assert_eq!(train.len(), 8);

        let mut all: Vec<usize> = train.into_iter().chain(test).collect();
        all.sort_unstable();
        assert_eq!(all, (0..11).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_is_seeded() {
        assert_eq!(train_test_split(50, 0.2, 42), train_test_split(50, 0.2, 42));
        assert_ne!(train_test_split(50, 0.2, 42), train_test_split(50, 0.2, 43));
    }

    #[test]
    fn test_fit_artifacts() {
        let records = cohort(80);
        let (artifacts, report) = fit_artifacts(&records, &quick_config()).unwrap();

        assert_eq!(report.n_test, 16);
        assert_eq!(report.n_train, 64);
        assert_eq!(artifacts.classifier.n_features(), 66);
        assert_eq!(artifacts.encoder.n_features(), 66);
        // The synthetic signal is easy to separate.
        assert!(report.accuracy >= 80.0, "accuracy {}", report.accuracy);
        assert_eq!(artifacts.accuracy, report.accuracy);
    }

    #[test]
    fn test_too_few_records() {
        let records = cohort(1);
        assert!(matches!(
            fit_artifacts(&records, &quick_config()),
            Err(TrainingError::InsufficientData(_))
        ));
    }
}
