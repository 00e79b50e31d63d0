//! Doctor database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{constraint_error, decode_timestamp, encode_timestamp, Database, DbError, DbResult};
use crate::models::Doctor;

const SELECT_DOCTOR: &str = r#"
    SELECT d.doctor_id, u.email, d.first_name, d.last_name, d.registry_number, u.created_at
    FROM doctors d
    JOIN users u ON u.user_id = d.doctor_id
"#;

impl Database {
    /// Insert a new doctor together with its login identity.
    pub fn insert_doctor(&self, doctor: &Doctor) -> DbResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO users (user_id, email, role, created_at) VALUES (?1, ?2, 'doctor', ?3)",
            params![doctor.doctor_id, doctor.email, encode_timestamp(&doctor.created_at)],
        )
        .map_err(constraint_error)?;
        tx.execute(
            r#"
            INSERT INTO doctors (doctor_id, first_name, last_name, registry_number)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                doctor.doctor_id,
                doctor.first_name,
                doctor.last_name,
                doctor.registry_number,
            ],
        )
        .map_err(constraint_error)?;
        tx.commit()?;
        Ok(())
    }

    /// Get a doctor by ID.
    pub fn get_doctor(&self, doctor_id: &str) -> DbResult<Option<Doctor>> {
        self.conn
            .query_row(
                &format!("{} WHERE d.doctor_id = ?", SELECT_DOCTOR),
                [doctor_id],
                DoctorRow::from_row,
            )
            .optional()?
            .map(TryInto::try_into)
            .transpose()
    }

    /// Get a doctor by registry number.
    pub fn get_doctor_by_registry_number(&self, registry_number: &str) -> DbResult<Option<Doctor>> {
        self.conn
            .query_row(
                &format!("{} WHERE d.registry_number = ?", SELECT_DOCTOR),
                [registry_number],
                DoctorRow::from_row,
            )
            .optional()?
            .map(TryInto::try_into)
            .transpose()
    }

    /// List all doctors by last name.
    pub fn list_doctors(&self) -> DbResult<Vec<Doctor>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY d.last_name, d.first_name", SELECT_DOCTOR))?;
        let rows = stmt.query_map([], DoctorRow::from_row)?;

        let mut doctors = Vec::new();
        for row in rows {
            doctors.push(row?.try_into()?);
        }
        Ok(doctors)
    }

    /// Delete a doctor. Assigned patients are unassigned; their recommendations are removed.
    pub fn delete_doctor(&self, doctor_id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "DELETE FROM users WHERE user_id = ? AND role = 'doctor'",
            [doctor_id],
        )?;
        Ok(rows_affected > 0)
    }
}

/// Intermediate row struct for database mapping.
struct DoctorRow {
    doctor_id: String,
    email: String,
    first_name: String,
    last_name: String,
    registry_number: String,
    created_at: String,
}

impl DoctorRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            doctor_id: row.get(0)?,
            email: row.get(1)?,
            first_name: row.get(2)?,
            last_name: row.get(3)?,
            registry_number: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

impl TryFrom<DoctorRow> for Doctor {
    type Error = DbError;

    fn try_from(row: DoctorRow) -> Result<Self, Self::Error> {
        Ok(Doctor {
            doctor_id: row.doctor_id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            registry_number: row.registry_number,
            created_at: decode_timestamp(&row.created_at)?,
        })
    }
}
