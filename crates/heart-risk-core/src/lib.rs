//! Heart-Risk Core Library
//!
//! Heart-disease risk classification with a persisted record of every
//! prediction and the recommendations doctors write for their patients.
//!
//! # Architecture
//!
//! ```text
//!   heart.csv ──► training::fit_artifacts ──► trained_models/ (artifacts)
//!                                                   │
//!                                        InferenceContext::load   (process start)
//!                                                   │
//! AttributeRecord ──► Feature Encoder ──► Random Forest ──► RiskLabel
//!                                                   │
//!                                     [PredictionRecord stored once]
//!                                                   │
//!                                       Recommendation Deriver
//!                                                   │
//!                                 Doctor selects advisories + free text
//!                                                   │
//!                                        [RecommendationRecord]
//! ```
//!
//! # Modules
//!
//! - [`models`]: Domain types (AttributeRecord, PredictionRecord, Patient, Doctor, ...)
//! - [`encoder`]: Imputation, categorical vocabulary, interaction expansion, scaling
//! - [`forest`]: Random-forest classifier
//! - [`training`]: Offline model fitting and evaluation
//! - [`artifacts`]: Trained-artifact file set with checksum manifest
//! - [`inference`]: Loaded model context and the classification pipeline
//! - [`recommend`]: Threshold-rule advisories
//! - [`db`]: SQLite record store
//! - [`care`]: Role-checked patient/doctor workflows

pub mod artifacts;
pub mod care;
pub mod config;
pub mod db;
pub mod encoder;
pub mod forest;
pub mod inference;
pub mod models;
pub mod recommend;
pub mod training;

// Re-export commonly used types
pub use artifacts::{ArtifactLoadError, ModelArtifacts};
pub use care::{Actor, CareError, PatientOverview, RecommendationChoices};
pub use config::Config;
pub use db::Database;
pub use encoder::{EncodeError, FeatureVector, FittedEncoder};
pub use forest::{ForestConfig, RandomForest};
pub use inference::{store_prediction, InferenceContext, InferenceError};
pub use models::{
    AttributeRecord, Doctor, Patient, PredictionRecord, RawAttributes, RecommendationRecord,
    RiskLabel,
};
pub use recommend::{derive_recommendation_texts, derive_recommendations, Advisory};

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

// =========================================================================
// Error Type
// =========================================================================

#[derive(Debug, thiserror::Error)]
pub enum HeartRiskError {
    #[error("Artifact error: {0}")]
    Artifacts(#[from] ArtifactLoadError),

    #[error("Database error: {0}")]
    Database(#[from] db::DbError),

    #[error("Invalid attributes: {0}")]
    Encode(#[from] EncodeError),

    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Care(#[from] CareError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl<T> From<std::sync::PoisonError<T>> for HeartRiskError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        HeartRiskError::LockPoisoned(e.to_string())
    }
}

pub type HeartRiskResult<T> = Result<T, HeartRiskError>;

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe entry point for the presentation layer.
pub struct HeartRisk {
    db: Mutex<Database>,
    inference: Arc<InferenceContext>,
}

impl HeartRisk {
    /// Load artifacts, then open the store. Refuses to start if artifacts are unusable.
    pub fn open(config: &Config) -> HeartRiskResult<Self> {
        let inference = InferenceContext::load(&config.artifact_dir)?;
        let db = Database::open(&config.database_path)?;
        tracing::info!(
            database = %config.database_path.display(),
            artifacts = %config.artifact_dir.display(),
            "Heart-risk service ready"
        );
        Ok(Self::with_parts(db, Arc::new(inference)))
    }

    pub fn with_parts(db: Database, inference: Arc<InferenceContext>) -> Self {
        Self {
            db: Mutex::new(db),
            inference,
        }
    }

    pub fn inference(&self) -> &Arc<InferenceContext> {
        &self.inference
    }

    pub fn model_accuracy(&self) -> f64 {
        self.inference.model_accuracy()
    }

    // =========================================================================
    // Registration
    // =========================================================================

    pub fn register_patient(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
        date_of_birth: NaiveDate,
    ) -> HeartRiskResult<Patient> {
        let email = normalize_email(email)?;
        let patient = Patient::new(email, first_name.into(), last_name.into(), date_of_birth);
        self.db.lock()?.insert_patient(&patient)?;
        Ok(patient)
    }

    pub fn register_doctor(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
        registry_number: &str,
    ) -> HeartRiskResult<Doctor> {
        let email = normalize_email(email)?;
        let doctor = Doctor::new(email, first_name.into(), last_name.into(), registry_number.into())
            .map_err(HeartRiskError::InvalidInput)?;
        self.db.lock()?.insert_doctor(&doctor)?;
        Ok(doctor)
    }

    pub fn list_doctors(&self) -> HeartRiskResult<Vec<Doctor>> {
        Ok(self.db.lock()?.list_doctors()?)
    }

    // =========================================================================
    // Classification
    // =========================================================================

    /// Classify a typed record and store the prediction.
    ///
    /// The store is locked only for the insert.
    pub fn classify(&self, record: &AttributeRecord, patient_id: &str) -> HeartRiskResult<PredictionRecord> {
        let prediction = self.inference.prediction_for(record, patient_id)?;
        store_prediction(&*self.db.lock()?, &prediction)?;
        Ok(prediction)
    }

    /// Validate a submitted form, then classify it.
    pub fn classify_raw(&self, raw: &RawAttributes, patient_id: &str) -> HeartRiskResult<PredictionRecord> {
        let record = raw.parse()?;
        self.classify(&record, patient_id)
    }

    pub fn derive_recommendations(&self, prediction: &PredictionRecord) -> Vec<String> {
        derive_recommendation_texts(prediction)
    }

    // =========================================================================
    // Care workflows
    // =========================================================================

    pub fn patient_overview(&self, actor: &Actor, patient_id: &str) -> HeartRiskResult<PatientOverview> {
        Ok(care::patient_overview(&*self.db.lock()?, actor, patient_id)?)
    }

    pub fn select_doctor(&self, actor: &Actor, doctor_id: Option<&str>) -> HeartRiskResult<Patient> {
        Ok(care::select_doctor(&*self.db.lock()?, actor, doctor_id)?)
    }

    pub fn doctor_patients(&self, actor: &Actor) -> HeartRiskResult<Vec<Patient>> {
        Ok(care::doctor_patients(&*self.db.lock()?, actor)?)
    }

    pub fn recommendation_choices(
        &self,
        actor: &Actor,
        patient_id: &str,
    ) -> HeartRiskResult<RecommendationChoices> {
        Ok(care::recommendation_choices(&*self.db.lock()?, actor, patient_id)?)
    }

    pub fn add_recommendation(
        &self,
        actor: &Actor,
        patient_id: &str,
        selected: &[String],
        custom: &str,
    ) -> HeartRiskResult<RecommendationRecord> {
        Ok(care::add_recommendation(&*self.db.lock()?, actor, patient_id, selected, custom)?)
    }

    pub fn delete_recommendation(&self, actor: &Actor, recommendation_id: &str) -> HeartRiskResult<()> {
        Ok(care::delete_recommendation(&*self.db.lock()?, actor, recommendation_id)?)
    }
}

fn normalize_email(email: &str) -> HeartRiskResult<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(HeartRiskError::InvalidInput(format!("invalid email: {}", email))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::fit_artifacts;
    use crate::training::fixtures::{cohort, quick_config};

    fn service() -> HeartRisk {
        let artifacts = fit_artifacts(&cohort(60), &quick_config()).unwrap().0;
        HeartRisk::with_parts(
            Database::open_in_memory().unwrap(),
            Arc::new(InferenceContext::new(artifacts)),
        )
    }

    fn dob() -> NaiveDate {
        NaiveDate::from_ymd_opt(1965, 7, 1).unwrap()
    }

    #[test]
    fn test_registration_validation() {
        let svc = service();
        let p = svc.register_patient(" Rui@Mail.com ", "Rui", "Costa", dob()).unwrap();
        assert_eq!(p.email, "rui@mail.com");

        assert!(matches!(
            svc.register_patient("not-an-email", "A", "B", dob()),
            Err(HeartRiskError::InvalidInput(_))
        ));
        assert!(matches!(
            svc.register_doctor("d@clinic.org", "Ana", "Silva", "12345"),
            Err(HeartRiskError::InvalidInput(_))
        ));
        assert!(matches!(
            svc.register_doctor("rui@mail.com", "Ana", "Silva", "0123456789"),
            Err(HeartRiskError::Database(db::DbError::Constraint(_)))
        ));
    }

    #[test]
    fn test_classify_raw_rejects_bad_form() {
        let svc = service();
        let p = svc.register_patient("rui@mail.com", "Rui", "Costa", dob()).unwrap();

        let mut raw = RawAttributes::from(&cohort(1)[0].attributes);
        raw.age = None;
        assert!(matches!(
            svc.classify_raw(&raw, &p.patient_id),
            Err(HeartRiskError::Encode(EncodeError::Schema { .. }))
        ));

        let raw = RawAttributes::from(&cohort(1)[0].attributes);
        let prediction = svc.classify_raw(&raw, &p.patient_id).unwrap();
        assert!(!svc.derive_recommendations(&prediction).is_empty());
    }

    #[test]
    fn test_classify_rejects_out_of_range_record() {
        let svc = service();
        let p = svc.register_patient("rui@mail.com", "Rui", "Costa", dob()).unwrap();

        let mut record = cohort(1)[0].attributes;
        record.fasting_bs = 7;
        assert!(matches!(
            svc.classify(&record, &p.patient_id),
            Err(HeartRiskError::Inference(InferenceError::Encode(EncodeError::Schema { .. })))
        ));

        let mut record = cohort(1)[0].attributes;
        record.age = -40;
        record.cholesterol = -5;
        assert!(svc.classify(&record, &p.patient_id).is_err());
        assert_eq!(svc.db.lock().unwrap().count_predictions().unwrap(), 0);
    }

    #[test]
    fn test_concurrent_classifications() {
        let svc = Arc::new(service());
        let p = svc.register_patient("rui@mail.com", "Rui", "Costa", dob()).unwrap();

        let handles: Vec<_> = cohort(8)
            .into_iter()
            .map(|r| {
                let svc = Arc::clone(&svc);
                let patient_id = p.patient_id.clone();
                std::thread::spawn(move || svc.classify(&r.attributes, &patient_id).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(svc.db.lock().unwrap().count_predictions().unwrap(), 8);
    }

    #[test]
    fn test_open_refuses_missing_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(dir.path().join("store.db"), dir.path().join("nothing-here"));
        assert!(matches!(
            HeartRisk::open(&config),
            Err(HeartRiskError::Artifacts(_))
        ));
        // Store is not created when artifacts fail
        assert!(!dir.path().join("store.db").exists());
    }

    #[test]
    fn test_service_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HeartRisk>();
        assert_send_sync::<InferenceContext>();
    }
}
