//! Categorical label vocabulary fitted once and reused at every inference.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{EncodeError, EncodeResult};
use crate::models::{
    AttributeRecord, Category, ChestPainType, ExerciseAngina, Gender, RestingEcg, StSlope,
    CATEGORICAL_FIELDS,
};

/// Ordered category labels per categorical field.
///
/// A label's index in its list is its encoded value, so the lists must be
/// persisted exactly as fitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingVocabulary {
    fields: BTreeMap<String, Vec<String>>,
}

impl EncodingVocabulary {
    /// Build a vocabulary from explicit label lists.
    pub fn new(fields: BTreeMap<String, Vec<String>>) -> Self {
        Self { fields }
    }

    /// Fit on a dataset: each field gets its distinct observed labels, sorted.
    pub fn fit(records: &[AttributeRecord]) -> Self {
        let mut seen: BTreeMap<&'static str, BTreeSet<&'static str>> = CATEGORICAL_FIELDS
            .iter()
            .map(|field| (*field, BTreeSet::new()))
            .collect();

        for record in records {
            for (field, label) in categorical_labels(record) {
                if let Some(labels) = seen.get_mut(field) {
                    labels.insert(label);
                }
            }
        }

        let fields = seen
            .into_iter()
            .map(|(field, labels)| {
                (
                    field.to_string(),
                    labels.into_iter().map(str::to_string).collect(),
                )
            })
            .collect();
        Self { fields }
    }

    /// Index of `label` within `field`'s vocabulary.
    pub fn encode(&self, field: &str, label: &str) -> EncodeResult<usize> {
        let labels = self
            .fields
            .get(field)
            .ok_or_else(|| EncodeError::schema(field, "no vocabulary fitted for field"))?;
        labels
            .iter()
            .position(|l| l == label)
            .ok_or_else(|| EncodeError::UnknownCategory {
                field: field.to_string(),
                value: label.to_string(),
            })
    }

    /// Inverse lookup of [`encode`](Self::encode).
    pub fn decode(&self, field: &str, index: usize) -> Option<&str> {
        self.fields
            .get(field)
            .and_then(|labels| labels.get(index))
            .map(String::as_str)
    }

    /// Labels fitted for a field.
    pub fn labels(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    /// Fields missing from this vocabulary.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        CATEGORICAL_FIELDS
            .iter()
            .copied()
            .filter(|field| !self.fields.contains_key(*field))
            .collect()
    }
}

/// The (field, label) pairs of a record's categorical attributes.
pub(crate) fn categorical_labels(record: &AttributeRecord) -> [(&'static str, &'static str); 5] {
    [
        (Gender::FIELD, record.gender.label()),
        (ChestPainType::FIELD, record.chest_pain_type.label()),
        (RestingEcg::FIELD, record.resting_ecg.label()),
        (ExerciseAngina::FIELD, record.exercise_angina.label()),
        (StSlope::FIELD, record.st_slope.label()),
    ]
}
