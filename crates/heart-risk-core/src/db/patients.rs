//! Patient database operations.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

use super::{constraint_error, decode_timestamp, encode_timestamp, Database, DbError, DbResult};
use crate::models::Patient;

const DATE_FORMAT: &str = "%Y-%m-%d";

const SELECT_PATIENT: &str = r#"
    SELECT p.patient_id, u.email, p.first_name, p.last_name,
           p.date_of_birth, p.doctor_id, u.created_at
    FROM patients p
    JOIN users u ON u.user_id = p.patient_id
"#;

impl Database {
    /// Insert a new patient together with its login identity.
    pub fn insert_patient(&self, patient: &Patient) -> DbResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO users (user_id, email, role, created_at) VALUES (?1, ?2, 'patient', ?3)",
            params![patient.patient_id, patient.email, encode_timestamp(&patient.created_at)],
        )
        .map_err(constraint_error)?;
        tx.execute(
            r#"
            INSERT INTO patients (patient_id, first_name, last_name, date_of_birth, doctor_id)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                patient.patient_id,
                patient.first_name,
                patient.last_name,
                patient.date_of_birth.format(DATE_FORMAT).to_string(),
                patient.doctor_id,
            ],
        )
        .map_err(constraint_error)?;
        tx.commit()?;
        Ok(())
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, patient_id: &str) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("{} WHERE p.patient_id = ?", SELECT_PATIENT),
                [patient_id],
                PatientRow::from_row,
            )
            .optional()?
            .map(TryInto::try_into)
            .transpose()
    }

    /// Get a patient by login email.
    pub fn get_patient_by_email(&self, email: &str) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("{} WHERE u.email = ?", SELECT_PATIENT),
                [email],
                PatientRow::from_row,
            )
            .optional()?
            .map(TryInto::try_into)
            .transpose()
    }

    /// Set or clear the patient's doctor.
    ///
    /// Returns `false` if the patient does not exist; an unknown doctor is a
    /// constraint violation.
    pub fn assign_doctor(&self, patient_id: &str, doctor_id: Option<&str>) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute(
                "UPDATE patients SET doctor_id = ?2 WHERE patient_id = ?1",
                params![patient_id, doctor_id],
            )
            .map_err(constraint_error)?;
        Ok(rows_affected > 0)
    }

    /// List the patients assigned to a doctor.
    pub fn list_patients_for_doctor(&self, doctor_id: &str) -> DbResult<Vec<Patient>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE p.doctor_id = ? ORDER BY p.last_name, p.first_name",
            SELECT_PATIENT
        ))?;
        let rows = stmt.query_map([doctor_id], PatientRow::from_row)?;

        let mut patients = Vec::new();
        for row in rows {
            patients.push(row?.try_into()?);
        }
        Ok(patients)
    }

    /// Delete a patient with all of their predictions and recommendations.
    pub fn delete_patient(&self, patient_id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "DELETE FROM users WHERE user_id = ? AND role = 'patient'",
            [patient_id],
        )?;
        Ok(rows_affected > 0)
    }
}

/// Intermediate row struct for database mapping.
struct PatientRow {
    patient_id: String,
    email: String,
    first_name: String,
    last_name: String,
    date_of_birth: String,
    doctor_id: Option<String>,
    created_at: String,
}

impl PatientRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            patient_id: row.get(0)?,
            email: row.get(1)?,
            first_name: row.get(2)?,
            last_name: row.get(3)?,
            date_of_birth: row.get(4)?,
            doctor_id: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

impl TryFrom<PatientRow> for Patient {
    type Error = DbError;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        let date_of_birth = NaiveDate::parse_from_str(&row.date_of_birth, DATE_FORMAT)
            .map_err(|e| DbError::Timestamp(format!("{}: {}", row.date_of_birth, e)))?;

        Ok(Patient {
            patient_id: row.patient_id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            date_of_birth,
            doctor_id: row.doctor_id,
            created_at: decode_timestamp(&row.created_at)?,
        })
    }
}
