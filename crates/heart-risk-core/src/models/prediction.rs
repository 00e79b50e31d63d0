//! Prediction records and risk labels.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AttributeRecord;

/// Binary classifier output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLabel {
    /// Heart disease present (class 1)
    #[serde(rename = "have")]
    Have,
    /// Heart disease absent (class 0)
    #[serde(rename = "don't have")]
    DontHave,
}

impl RiskLabel {
    /// Map a classifier class to a label. Only class 1 means disease.
    pub fn from_class(class: usize) -> Self {
        if class == 1 {
            Self::Have
        } else {
            Self::DontHave
        }
    }

    /// Classifier class for this label.
    pub fn class(&self) -> usize {
        match self {
            Self::Have => 1,
            Self::DontHave => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Have => "have",
            Self::DontHave => "don't have",
        }
    }
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "have" => Ok(Self::Have),
            "don't have" => Ok(Self::DontHave),
            other => Err(format!("Unknown risk label: {}", other)),
        }
    }
}

/// A persisted classification: the submitted attributes plus the derived label.
///
/// Created once after a successful classification and never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Unique prediction ID
    pub prediction_id: String,
    /// Owning patient
    pub patient_id: String,
    /// Attributes exactly as submitted
    pub attributes: AttributeRecord,
    /// Classifier verdict
    pub risk: RiskLabel,
    /// When the classification happened
    pub predicted_at: DateTime<Utc>,
}

impl PredictionRecord {
    /// Create a record stamped with the current time.
    pub fn new(patient_id: String, attributes: AttributeRecord, risk: RiskLabel) -> Self {
        Self {
            prediction_id: uuid::Uuid::new_v4().to_string(),
            patient_id,
            attributes,
            risk,
            predicted_at: Utc::now(),
        }
    }

    pub fn has_disease(&self) -> bool {
        self.risk == RiskLabel::Have
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_mapping() {
        assert_eq!(RiskLabel::from_class(1), RiskLabel::Have);
        assert_eq!(RiskLabel::from_class(0), RiskLabel::DontHave);
        assert_eq!(RiskLabel::from_class(2), RiskLabel::DontHave);
        assert_eq!(RiskLabel::from_class(RiskLabel::Have.class()), RiskLabel::Have);
        assert_eq!(RiskLabel::Have.to_string(), "have");
        assert_eq!(RiskLabel::DontHave.to_string(), "don't have");
        assert_eq!("don't have".parse::<RiskLabel>(), Ok(RiskLabel::DontHave));
        assert!("maybe".parse::<RiskLabel>().is_err());
    }

    #[test]
    fn test_label_serializes_as_rendering() {
        assert_eq!(
            serde_json::to_string(&RiskLabel::DontHave).unwrap(),
            "\"don't have\""
        );
    }
}
