//! Patient and doctor identities.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Length of a doctor registry number.
pub const REGISTRY_NUMBER_LEN: usize = 10;

/// A registered patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// Local UUID
    pub patient_id: String,
    /// Login email, unique across all users
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    /// Assigned doctor, if the patient picked one
    pub doctor_id: Option<String>,
    /// Registration timestamp
    pub created_at: DateTime<Utc>,
}

impl Patient {
    /// Create a new patient without an assigned doctor.
    pub fn new(email: String, first_name: String, last_name: String, date_of_birth: NaiveDate) -> Self {
        Self {
            patient_id: uuid::Uuid::new_v4().to_string(),
            email,
            first_name,
            last_name,
            date_of_birth,
            doctor_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Check whether the given doctor is assigned to this patient.
    pub fn is_assigned_to(&self, doctor_id: &str) -> bool {
        self.doctor_id.as_deref() == Some(doctor_id)
    }
}

/// A registered doctor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doctor {
    /// Local UUID
    pub doctor_id: String,
    /// Login email, unique across all users
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Professional registry number, exactly 10 digits
    pub registry_number: String,
    /// Registration timestamp
    pub created_at: DateTime<Utc>,
}

impl Doctor {
    /// Create a new doctor after validating the registry number.
    pub fn new(
        email: String,
        first_name: String,
        last_name: String,
        registry_number: String,
    ) -> Result<Self, String> {
        validate_registry_number(&registry_number)?;
        Ok(Self {
            doctor_id: uuid::Uuid::new_v4().to_string(),
            email,
            first_name,
            last_name,
            registry_number,
            created_at: Utc::now(),
        })
    }

    /// Name as shown to patients choosing a doctor.
    pub fn display_name(&self) -> String {
        format!("Dr. {} {}", self.first_name, self.last_name)
    }
}

/// Registry numbers are exactly 10 ASCII digits.
pub fn validate_registry_number(value: &str) -> Result<(), String> {
    if value.len() == REGISTRY_NUMBER_LEN && value.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err("Doctor registry number must be exactly 10 digits.".to_string())
    }
}
