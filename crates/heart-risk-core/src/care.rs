//! Role-checked patient and doctor workflows on top of the record store.
//!
//! A patient sees only their own records. A doctor sees, and writes
//! recommendations for, only the patients that selected them.

use serde::Serialize;
use thiserror::Error;

use crate::db::{Database, DbError};
use crate::models::{Doctor, Patient, PredictionRecord, RecommendationRecord};
use crate::recommend::{compose_content, derive_recommendations, Advisory};

/// Care workflow errors.
#[derive(Error, Debug)]
pub enum CareError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Patient {0} has no prediction yet")]
    NoPrediction(String),

    #[error("Recommendation content is empty")]
    EmptyRecommendation,

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

pub type CareResult<T> = Result<T, CareError>;

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Patient(String),
    Doctor(String),
}

/// Everything shown on a patient's page.
#[derive(Debug, Clone, Serialize)]
pub struct PatientOverview {
    pub patient: Patient,
    pub doctor: Option<Doctor>,
    pub latest_prediction: Option<PredictionRecord>,
    /// Newest first
    pub predictions: Vec<PredictionRecord>,
    /// Newest first
    pub recommendations: Vec<RecommendationRecord>,
}

/// Advisories a doctor can pick from for a patient's latest prediction.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationChoices {
    pub prediction: PredictionRecord,
    pub advisories: Vec<Advisory>,
}

fn load_patient(db: &Database, patient_id: &str) -> CareResult<Patient> {
    db.get_patient(patient_id)?
        .ok_or_else(|| CareError::NotFound(format!("patient {}", patient_id)))
}

fn denied(actor: &Actor, action: &str) -> CareError {
    tracing::warn!(?actor, action, "Access denied");
    CareError::AccessDenied(action.to_string())
}

/// Patient may read their own records; their assigned doctor may too.
fn authorize_view(db: &Database, actor: &Actor, patient_id: &str) -> CareResult<Patient> {
    let patient = load_patient(db, patient_id)?;
    let allowed = match actor {
        Actor::Patient(id) => id == patient_id,
        Actor::Doctor(id) => patient.is_assigned_to(id),
    };
    if !allowed {
        return Err(denied(actor, "view patient"));
    }
    Ok(patient)
}

/// Only the assigned doctor may act on a patient's care.
fn authorize_doctor<'a>(
    db: &Database,
    actor: &'a Actor,
    patient_id: &str,
    action: &str,
) -> CareResult<(Patient, &'a str)> {
    let Actor::Doctor(doctor_id) = actor else {
        return Err(denied(actor, action));
    };
    let patient = load_patient(db, patient_id)?;
    if !patient.is_assigned_to(doctor_id) {
        return Err(denied(actor, action));
    }
    Ok((patient, doctor_id))
}

/// Patient page: identity, assigned doctor, predictions and recommendations.
pub fn patient_overview(db: &Database, actor: &Actor, patient_id: &str) -> CareResult<PatientOverview> {
    let patient = authorize_view(db, actor, patient_id)?;
    let doctor = match &patient.doctor_id {
        Some(id) => db.get_doctor(id)?,
        None => None,
    };
    let predictions = db.list_predictions_for_patient(patient_id)?;

    Ok(PatientOverview {
        patient,
        doctor,
        latest_prediction: predictions.first().cloned(),
        predictions,
        recommendations: db.list_recommendations_for_patient(patient_id)?,
    })
}

/// A patient picks (or clears) their doctor.
pub fn select_doctor(db: &Database, actor: &Actor, doctor_id: Option<&str>) -> CareResult<Patient> {
    let Actor::Patient(patient_id) = actor else {
        return Err(denied(actor, "select doctor"));
    };
    if let Some(id) = doctor_id {
        if db.get_doctor(id)?.is_none() {
            return Err(CareError::NotFound(format!("doctor {}", id)));
        }
    }
    if !db.assign_doctor(patient_id, doctor_id)? {
        return Err(CareError::NotFound(format!("patient {}", patient_id)));
    }

    tracing::info!(patient_id, doctor_id, "Patient selected doctor");
    load_patient(db, patient_id)
}

/// Patients that selected the calling doctor.
pub fn doctor_patients(db: &Database, actor: &Actor) -> CareResult<Vec<Patient>> {
    let Actor::Doctor(doctor_id) = actor else {
        return Err(denied(actor, "list patients"));
    };
    if db.get_doctor(doctor_id)?.is_none() {
        return Err(CareError::NotFound(format!("doctor {}", doctor_id)));
    }
    Ok(db.list_patients_for_doctor(doctor_id)?)
}

/// Derived advisories for the patient's latest prediction.
pub fn recommendation_choices(
    db: &Database,
    actor: &Actor,
    patient_id: &str,
) -> CareResult<RecommendationChoices> {
    authorize_doctor(db, actor, patient_id, "view recommendation choices")?;
    let prediction = db
        .latest_prediction_for_patient(patient_id)?
        .ok_or_else(|| CareError::NoPrediction(patient_id.to_string()))?;

    Ok(RecommendationChoices {
        advisories: derive_recommendations(&prediction),
        prediction,
    })
}

/// Store a recommendation composed of selected advisories and free text.
pub fn add_recommendation(
    db: &Database,
    actor: &Actor,
    patient_id: &str,
    selected: &[String],
    custom: &str,
) -> CareResult<RecommendationRecord> {
    let (patient, doctor_id) = authorize_doctor(db, actor, patient_id, "add recommendation")?;
    let content = compose_content(selected, custom);
    if content.is_empty() {
        return Err(CareError::EmptyRecommendation);
    }

    let recommendation = RecommendationRecord::new(patient.patient_id, doctor_id.to_string(), content);
    db.insert_recommendation(&recommendation)?;
    tracing::info!(
        patient_id,
        doctor_id,
        recommendation_id = %recommendation.recommendation_id,
        "Stored recommendation"
    );
    Ok(recommendation)
}

/// Delete a recommendation. Only its author may do so.
pub fn delete_recommendation(db: &Database, actor: &Actor, recommendation_id: &str) -> CareResult<()> {
    let recommendation = db
        .get_recommendation(recommendation_id)?
        .ok_or_else(|| CareError::NotFound(format!("recommendation {}", recommendation_id)))?;

    match actor {
        Actor::Doctor(id) if recommendation.is_authored_by(id) => {}
        _ => return Err(denied(actor, "delete recommendation")),
    }

    db.delete_recommendation(recommendation_id)?;
    Ok(())
}
