//! Trained-artifact file set shared between the fitting job and the server.
//!
//! ```text
//! trained_models/
//!   classifier.json      RandomForest
//!   scaler.json          StandardScaler
//!   expansion.json       InteractionExpansion
//!   vocabulary.json      EncodingVocabulary
//!   imputation.json      CholesterolImputation
//!   model_accuracy.txt   held-out accuracy, percent
//!   manifest.json        SHA-256 of every file above
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::encoder::{
    CholesterolImputation, EncodingVocabulary, FittedEncoder, InteractionExpansion,
    StandardScaler, RAW_FEATURE_COUNT,
};
use crate::forest::RandomForest;

pub const CLASSIFIER_FILE: &str = "classifier.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const EXPANSION_FILE: &str = "expansion.json";
pub const VOCABULARY_FILE: &str = "vocabulary.json";
pub const IMPUTATION_FILE: &str = "imputation.json";
pub const ACCURACY_FILE: &str = "model_accuracy.txt";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Errors loading the artifact set. Fatal to serving.
#[derive(Error, Debug)]
pub enum ArtifactLoadError {
    #[error("Cannot read artifact {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse artifact {file}: {reason}")]
    Parse { file: String, reason: String },

    #[error("Artifact {file} is not listed in the manifest")]
    Unlisted { file: String },

    #[error("Checksum mismatch for artifact {file}")]
    Checksum { file: String },

    #[error("Inconsistent artifacts: {0}")]
    Inconsistent(String),
}

/// Errors writing the artifact set.
#[derive(Error, Debug)]
pub enum ArtifactSaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Checksums of every artifact file, written last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub created_at: DateTime<Utc>,
    /// File name → SHA-256 hex digest
    pub files: BTreeMap<String, String>,
}

/// Everything the inference path needs, loaded as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelArtifacts {
    pub encoder: FittedEncoder,
    pub classifier: RandomForest,
    /// Held-out accuracy as a percentage
    pub accuracy: f64,
}

impl ModelArtifacts {
    /// Write every artifact file and then the manifest.
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<Manifest, ArtifactSaveError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let blobs: [(&str, Vec<u8>); 6] = [
            (CLASSIFIER_FILE, serde_json::to_vec(&self.classifier)?),
            (SCALER_FILE, serde_json::to_vec_pretty(&self.encoder.scaler)?),
            (EXPANSION_FILE, serde_json::to_vec_pretty(&self.encoder.expansion)?),
            (VOCABULARY_FILE, serde_json::to_vec_pretty(&self.encoder.vocabulary)?),
            (IMPUTATION_FILE, serde_json::to_vec_pretty(&self.encoder.imputation)?),
            (ACCURACY_FILE, self.accuracy.to_string().into_bytes()),
        ];

        let mut files = BTreeMap::new();
        for (name, bytes) in &blobs {
            fs::write(dir.join(name), bytes)?;
            files.insert(name.to_string(), hash_data(bytes));
        }

        let manifest = Manifest {
            created_at: Utc::now(),
            files,
        };
        fs::write(dir.join(MANIFEST_FILE), serde_json::to_vec_pretty(&manifest)?)?;

        tracing::info!(dir = %dir.display(), accuracy = self.accuracy, "Saved model artifacts");
        Ok(manifest)
    }

    /// Load and verify the complete artifact set.
    ///
    /// Either every file reads, matches its checksum, parses and agrees with
    /// the others, or nothing is returned.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self, ArtifactLoadError> {
        let dir = dir.as_ref();
        let manifest: Manifest = parse_json(MANIFEST_FILE, &read(dir, MANIFEST_FILE)?)?;

        let verified = |file: &str| -> Result<Vec<u8>, ArtifactLoadError> {
            let bytes = read(dir, file)?;
            let expected = manifest
                .files
                .get(file)
                .ok_or_else(|| ArtifactLoadError::Unlisted { file: file.to_string() })?;
            if hash_data(&bytes) != *expected {
                return Err(ArtifactLoadError::Checksum { file: file.to_string() });
            }
            Ok(bytes)
        };

        let classifier: RandomForest = parse_json(CLASSIFIER_FILE, &verified(CLASSIFIER_FILE)?)?;
        let scaler: StandardScaler = parse_json(SCALER_FILE, &verified(SCALER_FILE)?)?;
        let expansion: InteractionExpansion = parse_json(EXPANSION_FILE, &verified(EXPANSION_FILE)?)?;
        let vocabulary: EncodingVocabulary = parse_json(VOCABULARY_FILE, &verified(VOCABULARY_FILE)?)?;
        let imputation: CholesterolImputation = parse_json(IMPUTATION_FILE, &verified(IMPUTATION_FILE)?)?;
        let accuracy = parse_accuracy(&verified(ACCURACY_FILE)?)?;

        let artifacts = Self {
            encoder: FittedEncoder {
                imputation,
                vocabulary,
                expansion,
                scaler,
            },
            classifier,
            accuracy,
        };
        artifacts.check_consistency()?;

        tracing::info!(
            dir = %dir.display(),
            n_trees = artifacts.classifier.n_trees(),
            n_features = artifacts.classifier.n_features(),
            accuracy,
            "Loaded model artifacts"
        );
        Ok(artifacts)
    }

    /// Cross-check widths and shapes between the pieces.
    pub fn check_consistency(&self) -> Result<(), ArtifactLoadError> {
        let encoder = &self.encoder;
        if encoder.expansion.n_input() != RAW_FEATURE_COUNT {
            return Err(ArtifactLoadError::Inconsistent(format!(
                "expansion expects {} inputs, records have {}",
                encoder.expansion.n_input(),
                RAW_FEATURE_COUNT
            )));
        }
        if encoder.scaler.width() != encoder.expansion.n_output() {
            return Err(ArtifactLoadError::Inconsistent(format!(
                "scaler width {} does not match expansion output {}",
                encoder.scaler.width(),
                encoder.expansion.n_output()
            )));
        }
        if self.classifier.n_features() != encoder.scaler.width() {
            return Err(ArtifactLoadError::Inconsistent(format!(
                "classifier expects {} features, encoder produces {}",
                self.classifier.n_features(),
                encoder.scaler.width()
            )));
        }
        if self.classifier.n_classes() != 2 {
            return Err(ArtifactLoadError::Inconsistent(format!(
                "classifier has {} classes, expected 2",
                self.classifier.n_classes()
            )));
        }
        let missing = encoder.vocabulary.missing_fields();
        if !missing.is_empty() {
            return Err(ArtifactLoadError::Inconsistent(format!(
                "vocabulary missing fields: {}",
                missing.join(", ")
            )));
        }
        self.classifier
            .validate()
            .map_err(|e| ArtifactLoadError::Inconsistent(e.to_string()))
    }
}

fn hash_data(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn read(dir: &Path, file: &str) -> Result<Vec<u8>, ArtifactLoadError> {
    fs::read(dir.join(file)).map_err(|source| ArtifactLoadError::Io {
        file: file.to_string(),
        source,
    })
}

fn parse_json<T: DeserializeOwned>(file: &str, bytes: &[u8]) -> Result<T, ArtifactLoadError> {
    serde_json::from_slice(bytes).map_err(|e| ArtifactLoadError::Parse {
        file: file.to_string(),
        reason: e.to_string(),
    })
}

fn parse_accuracy(bytes: &[u8]) -> Result<f64, ArtifactLoadError> {
    let parse_err = |reason: String| ArtifactLoadError::Parse {
        file: ACCURACY_FILE.to_string(),
        reason,
    };
    let text = std::str::from_utf8(bytes).map_err(|e| parse_err(e.to_string()))?;
    let value: f64 = text
        .trim()
        .parse()
        .map_err(|_| parse_err(format!("'{}' is not a number", text.trim())))?;
    if !(0.0..=100.0).contains(&value) {
        return Err(parse_err(format!("{} is not a percentage", value)));
    }
    Ok(value)
}
