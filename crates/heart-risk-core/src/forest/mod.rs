//! Random forest classifier.
//!
//! Ensemble of [`DecisionTree`]s fitted on bootstrap samples with per-split
//! feature subsampling. Prediction averages the leaf class distributions of
//! every tree and picks the most probable class.

mod tree;

pub use tree::*;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Forest errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForestError {
    #[error("Cannot fit on an empty dataset")]
    EmptyDataset,

    #[error("Expected {expected} features, got {got}")]
    FeatureCount { expected: usize, got: usize },

    #[error("Got {rows} rows but {labels} labels")]
    LabelCount { rows: usize, labels: usize },

    #[error("Invalid forest configuration: {0}")]
    InvalidConfig(String),

    #[error("Corrupt model: {0}")]
    Corrupt(String),
}

pub type ForestResult<T> = Result<T, ForestError>;

/// Hyper-parameters for fitting a forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 200,
            max_depth: 15,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

/// A fitted random forest. Read-only once fitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_features: usize,
    n_classes: usize,
}

impl RandomForest {
    /// Fit a forest. Labels are class indices starting at 0.
    pub fn fit(x: &[Vec<f64>], y: &[usize], config: &ForestConfig) -> ForestResult<Self> {
        if x.is_empty() {
            return Err(ForestError::EmptyDataset);
        }
        if x.len() != y.len() {
            return Err(ForestError::LabelCount {
                rows: x.len(),
                labels: y.len(),
            });
        }
        if config.n_trees == 0 {
            return Err(ForestError::InvalidConfig("n_trees must be at least 1".into()));
        }
        let n_features = x[0].len();
        if let Some(row) = x.iter().find(|row| row.len() != n_features) {
            return Err(ForestError::FeatureCount {
                expected: n_features,
                got: row.len(),
            });
        }

        let n_classes = y.iter().copied().max().unwrap_or(0).max(1) + 1;
        let params = TreeParams {
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split.max(2),
            max_features: ((n_features as f64).sqrt() as usize).max(1),
        };

        tracing::debug!(
            n_trees = config.n_trees,
            max_depth = config.max_depth,
            rows = x.len(),
            n_features,
            "Fitting random forest"
        );

        let mut master = ChaCha8Rng::seed_from_u64(config.seed);
        let mut trees = Vec::with_capacity(config.n_trees);
        for _ in 0..config.n_trees {
            let mut rng = ChaCha8Rng::seed_from_u64(master.gen());
            let bootstrap: Vec<usize> = (0..x.len()).map(|_| rng.gen_range(0..x.len())).collect();
            trees.push(DecisionTree::fit(x, y, &bootstrap, n_classes, params, &mut rng)?);
        }

        Ok(Self {
            trees,
            n_features,
            n_classes,
        })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Mean class distribution across trees.
    pub fn predict_proba(&self, features: &[f64]) -> ForestResult<Vec<f64>> {
        if features.len() != self.n_features {
            return Err(ForestError::FeatureCount {
                expected: self.n_features,
                got: features.len(),
            });
        }

        let mut proba = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (p, q) in proba.iter_mut().zip(tree.predict_proba(features)?) {
                *p += q;
            }
        }
        let n = self.trees.len() as f64;
        for p in &mut proba {
            *p /= n;
        }
        Ok(proba)
    }

    /// Most probable class; ties resolve to the lower class.
    pub fn predict(&self, features: &[f64]) -> ForestResult<usize> {
        let proba = self.predict_proba(features)?;
        let mut best = 0;
        for (class, p) in proba.iter().enumerate() {
            if *p > proba[best] {
                best = class;
            }
        }
        Ok(best)
    }

    /// Check a deserialized forest before serving from it.
    pub fn validate(&self) -> ForestResult<()> {
        if self.trees.is_empty() {
            return Err(ForestError::Corrupt("forest has no trees".into()));
        }
        for tree in &self.trees {
            if tree.n_features() != self.n_features || tree.n_classes() != self.n_classes {
                return Err(ForestError::Corrupt("inconsistent tree shape".into()));
            }
            tree.validate()?;
        }
        Ok(())
    }
}
