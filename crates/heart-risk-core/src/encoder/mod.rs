//! Feature encoder: attribute record → standardised feature vector.
//!
//! Pipeline: Imputation → Categorical Encoding → Interaction Expansion → Standardisation

mod expansion;
mod imputation;
mod scaler;
mod vocabulary;

pub use expansion::*;
pub use imputation::*;
pub use scaler::*;
pub use vocabulary::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{AttributeRecord, FEATURE_NAMES};

/// Encoding errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    #[error("Invalid attribute '{field}': {reason}")]
    Schema { field: String, reason: String },

    #[error("Unknown category '{value}' for '{field}'")]
    UnknownCategory { field: String, value: String },
}

impl EncodeError {
    pub(crate) fn schema(field: &str, reason: impl Into<String>) -> Self {
        Self::Schema {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

pub type EncodeResult<T> = Result<T, EncodeError>;

/// Number of raw attributes fed to the expansion step.
pub const RAW_FEATURE_COUNT: usize = FEATURE_NAMES.len();

/// Fully encoded model input.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(pub Vec<f64>);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// All fitted preprocessing state, applied in a fixed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedEncoder {
    pub imputation: CholesterolImputation,
    pub vocabulary: EncodingVocabulary,
    pub expansion: InteractionExpansion,
    pub scaler: StandardScaler,
}

impl FittedEncoder {
    /// Fit every stage on a dataset.
    pub fn fit(records: &[AttributeRecord]) -> EncodeResult<Self> {
        let imputation = CholesterolImputation::fit(records);
        let vocabulary = EncodingVocabulary::fit(records);
        let expansion = InteractionExpansion::new(RAW_FEATURE_COUNT);

        let expanded = records
            .iter()
            .map(|r| {
                let raw = raw_vector(&imputation, &vocabulary, r)?;
                expansion.transform(&raw)
            })
            .collect::<EncodeResult<Vec<_>>>()?;
        let scaler = StandardScaler::fit(&expanded)?;

        Ok(Self {
            imputation,
            vocabulary,
            expansion,
            scaler,
        })
    }

    /// Imputed, label-encoded attributes in model order.
    pub fn raw_vector(&self, record: &AttributeRecord) -> EncodeResult<Vec<f64>> {
        raw_vector(&self.imputation, &self.vocabulary, record)
    }

    /// Encode a record into the vector the classifier expects.
    pub fn encode(&self, record: &AttributeRecord) -> EncodeResult<FeatureVector> {
        let raw = self.raw_vector(record)?;
        let expanded = self.expansion.transform(&raw)?;
        Ok(FeatureVector(self.scaler.transform(&expanded)?))
    }

    /// Width of the encoded vector.
    pub fn n_features(&self) -> usize {
        self.expansion.n_output()
    }

    /// Names of the encoded features, in vector order.
    pub fn feature_names(&self) -> Vec<String> {
        self.expansion.feature_names(&FEATURE_NAMES)
    }
}

fn raw_vector(
    imputation: &CholesterolImputation,
    vocab: &EncodingVocabulary,
    record: &AttributeRecord,
) -> EncodeResult<Vec<f64>> {
    record.validate()?;
    let [gender, chest_pain_type, resting_ecg, exercise_angina, st_slope] =
        vocabulary::categorical_labels(record).map(|(field, label)| vocab.encode(field, label));

    Ok(vec![
        record.age as f64,
        gender? as f64,
        chest_pain_type? as f64,
        record.resting_bp as f64,
        imputation.apply(record.cholesterol),
        record.fasting_bs as f64,
        resting_ecg? as f64,
        record.max_hr as f64,
        exercise_angina? as f64,
        record.oldpeak,
        st_slope? as f64,
    ])
}
