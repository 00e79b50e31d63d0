//! Advisory derivation from a stored prediction.
//!
//! Threshold rules are evaluated independently and only for a positive
//! prediction. A negative prediction yields exactly one advisory.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{ChestPainType, ExerciseAngina, PredictionRecord, RestingEcg, RiskLabel, StSlope};

/// A fixed advisory a doctor can pick when writing a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Advisory {
    DietAndExercise,
    BloodPressureMonitoring,
    DiabetesEvaluation,
    ActivityRestriction,
    FurtherEvaluation,
    NoSignificantRisk,
}

impl Advisory {
    pub fn text(&self) -> &'static str {
        match self {
            Self::DietAndExercise => {
                "Heart-healthy diet and regular moderate-intensity exercise recommended."
            }
            Self::BloodPressureMonitoring => {
                "Regularly monitor your blood pressure and adopt lifestyle changes."
            }
            Self::DiabetesEvaluation => {
                "Balanced diet, regular exercise and further medical evaluation for diabetes recommended."
            }
            Self::ActivityRestriction => {
                "Avoid strenuous activities until further evaluation is completed."
            }
            Self::FurtherEvaluation => "Further medical evaluation needed.",
            Self::NoSignificantRisk => "The patient is okay with no significant risks detected.",
        }
    }
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Advisories for a prediction, in rule order.
pub fn derive_recommendations(prediction: &PredictionRecord) -> Vec<Advisory> {
    if prediction.risk != RiskLabel::Have {
        return vec![Advisory::NoSignificantRisk];
    }

    let a = &prediction.attributes;
    let mut advisories = Vec::new();
    if a.cholesterol > 200 {
        advisories.push(Advisory::DietAndExercise);
    }
    if a.resting_bp > 130 {
        advisories.push(Advisory::BloodPressureMonitoring);
    }
    if a.fasting_bs == 1 {
        advisories.push(Advisory::DiabetesEvaluation);
    }
    if a.exercise_angina == ExerciseAngina::Yes {
        advisories.push(Advisory::ActivityRestriction);
    }
    if a.chest_pain_type != ChestPainType::Asymptomatic
        || a.resting_ecg != RestingEcg::Normal
        || a.oldpeak > 1.0
        || a.st_slope != StSlope::Flat
    {
        advisories.push(Advisory::FurtherEvaluation);
    }
    advisories
}

/// Same as [`derive_recommendations`], rendered as text.
pub fn derive_recommendation_texts(prediction: &PredictionRecord) -> Vec<String> {
    derive_recommendations(prediction)
        .into_iter()
        .map(|a| a.text().to_string())
        .collect()
}

/// Build recommendation content from selected advisories and free text.
///
/// Selections are newline-joined; non-blank custom text follows on its own line.
pub fn compose_content(selected: &[String], custom: &str) -> String {
    let mut content = selected
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let custom = custom.trim();
    if !custom.is_empty() {
        if !content.is_empty() {
            content.push('\n');
        }
        content.push_str(custom);
    }
    content
}
