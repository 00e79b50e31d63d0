//! Inference context: the loaded artifact set plus the classification pipeline.
//!
//! Built once at process start and shared read-only between handlers.

use std::path::Path;

use thiserror::Error;

use crate::artifacts::{ArtifactLoadError, ModelArtifacts};
use crate::db::{Database, DbError};
use crate::encoder::{EncodeError, FeatureVector};
use crate::forest::ForestError;
use crate::models::{AttributeRecord, PredictionRecord, RiskLabel};

/// Per-request inference errors. None of these leave a partial write behind.
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Encoding error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Classifier error: {0}")]
    Forest(#[from] ForestError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Patient not found: {0}")]
    PatientNotFound(String),
}

pub type InferenceResult<T> = Result<T, InferenceError>;

/// Fitted encoder and classifier, immutable after construction.
#[derive(Debug)]
pub struct InferenceContext {
    artifacts: ModelArtifacts,
}

impl InferenceContext {
    /// Load the artifact set from disk. Failure means the service must not start.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self, ArtifactLoadError> {
        Ok(Self::new(ModelArtifacts::load(dir)?))
    }

    /// Wrap an in-memory artifact set.
    pub fn new(artifacts: ModelArtifacts) -> Self {
        Self { artifacts }
    }

    pub fn artifacts(&self) -> &ModelArtifacts {
        &self.artifacts
    }

    /// Held-out accuracy recorded when the model was fitted, in percent.
    pub fn model_accuracy(&self) -> f64 {
        self.artifacts.accuracy
    }

    pub fn encode(&self, record: &AttributeRecord) -> InferenceResult<FeatureVector> {
        Ok(self.artifacts.encoder.encode(record)?)
    }

    /// Classify a record without touching the store.
    pub fn predict(&self, record: &AttributeRecord) -> InferenceResult<RiskLabel> {
        let features = self.encode(record)?;
        let class = self.artifacts.classifier.predict(features.as_slice())?;
        Ok(RiskLabel::from_class(class))
    }

    /// Classify a record for a patient without storing it.
    pub fn prediction_for(
        &self,
        record: &AttributeRecord,
        patient_id: &str,
    ) -> InferenceResult<PredictionRecord> {
        let risk = self.predict(record)?;
        Ok(PredictionRecord::new(patient_id.to_string(), *record, risk))
    }

    /// Classify a record for a patient and persist exactly one prediction.
    ///
    /// The insert happens only after encoding and prediction succeeded.
    pub fn classify(
        &self,
        db: &Database,
        record: &AttributeRecord,
        patient_id: &str,
    ) -> InferenceResult<PredictionRecord> {
        let prediction = self.prediction_for(record, patient_id)?;
        store_prediction(db, &prediction)?;
        Ok(prediction)
    }
}

/// Persist a prediction for an existing patient.
pub fn store_prediction(db: &Database, prediction: &PredictionRecord) -> InferenceResult<()> {
    if db.get_patient(&prediction.patient_id)?.is_none() {
        return Err(InferenceError::PatientNotFound(prediction.patient_id.clone()));
    }
    db.insert_prediction(prediction)?;

    tracing::info!(
        patient_id = %prediction.patient_id,
        prediction_id = %prediction.prediction_id,
        risk = %prediction.risk,
        "Stored prediction"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::EncodingVocabulary;
    use crate::models::{Patient, RawAttributes, StSlope};
    use crate::training::fit_artifacts;
    use crate::training::fixtures::{cohort, quick_config};
    use chrono::NaiveDate;

    fn context() -> InferenceContext {
        InferenceContext::new(fit_artifacts(&cohort(60), &quick_config()).unwrap().0)
    }

    fn patient(db: &Database) -> String {
        let p = Patient::new(
            "p@mail.com".into(),
            "Rui".into(),
            "Costa".into(),
            NaiveDate::from_ymd_opt(1970, 1, 1).unwrap(),
        );
        db.insert_patient(&p).unwrap();
        p.patient_id
    }

    #[test]
    fn test_predict_follows_signal() {
        let ctx = context();
        let records = cohort(60);
        // Index 0 is a positive example, index 1 negative.
        assert_eq!(ctx.predict(&records[0].attributes).unwrap(), RiskLabel::Have);
        assert_eq!(ctx.predict(&records[1].attributes).unwrap(), RiskLabel::DontHave);
    }

    #[test]
    fn test_classify_stores_one_prediction() {
        let ctx = context();
        let db = Database::open_in_memory().unwrap();
        let patient_id = patient(&db);

        let record = cohort(2)[0].attributes;
        let prediction = ctx.classify(&db, &record, &patient_id).unwrap();
        assert_eq!(db.count_predictions().unwrap(), 1);
        assert_eq!(
            db.latest_prediction_for_patient(&patient_id).unwrap().unwrap(),
            prediction
        );
    }

    #[test]
    fn test_classify_unknown_patient_writes_nothing() {
        let ctx = context();
        let db = Database::open_in_memory().unwrap();
        let record = cohort(2)[0].attributes;

        assert!(matches!(
            ctx.classify(&db, &record, "ghost"),
            Err(InferenceError::PatientNotFound(_))
        ));
        assert_eq!(db.count_predictions().unwrap(), 0);
    }

    #[test]
    fn test_unseen_category_writes_nothing() {
        let ctx = context();
        let db = Database::open_in_memory().unwrap();
        let patient_id = patient(&db);

        let mut raw = RawAttributes::from(&cohort(2)[0].attributes);
        raw.st_slope = Some("Sideways".into());
        assert!(matches!(raw.parse(), Err(EncodeError::UnknownCategory { .. })));

        // Vocabulary fitted without any Down slope
        let without_down: Vec<_> = cohort(60)
            .iter()
            .map(|r| r.attributes)
            .filter(|a| a.st_slope != StSlope::Down)
            .collect();
        let mut artifacts = ctx.artifacts().clone();
        artifacts.encoder.vocabulary = EncodingVocabulary::fit(&without_down);
        let narrowed = InferenceContext::new(artifacts);
        let mut record = cohort(2)[0].attributes;
        record.st_slope = StSlope::Down;

        assert!(matches!(
            narrowed.classify(&db, &record, &patient_id),
            Err(InferenceError::Encode(EncodeError::UnknownCategory { .. }))
        ));
        assert_eq!(db.count_predictions().unwrap(), 0);
    }

    #[test]
    fn test_prediction_for_does_not_store() {
        let ctx = context();
        let db = Database::open_in_memory().unwrap();
        let patient_id = patient(&db);

        let prediction = ctx.prediction_for(&cohort(2)[0].attributes, &patient_id).unwrap();
        assert_eq!(prediction.risk, RiskLabel::Have);
        assert_eq!(db.count_predictions().unwrap(), 0);

        store_prediction(&db, &prediction).unwrap();
        assert_eq!(db.get_prediction(&prediction.prediction_id).unwrap().unwrap(), prediction);

        let orphan = ctx.prediction_for(&cohort(2)[1].attributes, "ghost").unwrap();
        assert!(matches!(
            store_prediction(&db, &orphan),
            Err(InferenceError::PatientNotFound(_))
        ));
        assert_eq!(db.count_predictions().unwrap(), 1);
    }

    #[test]
    fn test_invalid_record_is_schema_error() {
        let ctx = context();
        let db = Database::open_in_memory().unwrap();
        let patient_id = patient(&db);

        let mut record = cohort(2)[0].attributes;
        record.fasting_bs = 7;
        assert!(matches!(
            ctx.classify(&db, &record, &patient_id),
            Err(InferenceError::Encode(EncodeError::Schema { .. }))
        ));
        assert_eq!(db.count_predictions().unwrap(), 0);
    }

    #[test]
    fn test_model_accuracy() {
        let ctx = context();
        assert!(ctx.model_accuracy() > 0.0 && ctx.model_accuracy() <= 100.0);
    }
}
