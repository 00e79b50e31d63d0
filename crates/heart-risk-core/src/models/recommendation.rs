//! Doctor-authored recommendation records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free-text advice a doctor leaves for a patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRecord {
    /// Unique recommendation ID
    pub recommendation_id: String,
    /// Patient the advice is for
    pub patient_id: String,
    /// Authoring doctor (only they may delete it)
    pub doctor_id: String,
    /// Advice text
    pub content: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl RecommendationRecord {
    /// Create a new recommendation stamped with the current time.
    pub fn new(patient_id: String, doctor_id: String, content: String) -> Self {
        Self {
            recommendation_id: uuid::Uuid::new_v4().to_string(),
            patient_id,
            doctor_id,
            content,
            created_at: Utc::now(),
        }
    }

    pub fn is_authored_by(&self, doctor_id: &str) -> bool {
        self.doctor_id == doctor_id
    }
}
