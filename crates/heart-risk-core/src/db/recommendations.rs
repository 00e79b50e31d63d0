//! Recommendation database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{constraint_error, decode_timestamp, encode_timestamp, Database, DbError, DbResult};
use crate::models::RecommendationRecord;

const SELECT_RECOMMENDATION: &str = r#"
    SELECT recommendation_id, patient_id, doctor_id, content, created_at
    FROM recommendations
"#;

impl Database {
    /// Insert a recommendation. Patient and doctor must exist.
    pub fn insert_recommendation(&self, recommendation: &RecommendationRecord) -> DbResult<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO recommendations (recommendation_id, patient_id, doctor_id, content, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    recommendation.recommendation_id,
                    recommendation.patient_id,
                    recommendation.doctor_id,
                    recommendation.content,
                    encode_timestamp(&recommendation.created_at),
                ],
            )
            .map_err(constraint_error)?;
        Ok(())
    }

    /// Get a recommendation by ID.
    pub fn get_recommendation(&self, recommendation_id: &str) -> DbResult<Option<RecommendationRecord>> {
        self.conn
            .query_row(
                &format!("{} WHERE recommendation_id = ?", SELECT_RECOMMENDATION),
                [recommendation_id],
                RecommendationRow::from_row,
            )
            .optional()?
            .map(TryInto::try_into)
            .transpose()
    }

    /// All recommendations for a patient, newest first.
    pub fn list_recommendations_for_patient(&self, patient_id: &str) -> DbResult<Vec<RecommendationRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE patient_id = ? ORDER BY created_at DESC, rowid DESC",
            SELECT_RECOMMENDATION
        ))?;
        let rows = stmt.query_map([patient_id], RecommendationRow::from_row)?;

        let mut recommendations = Vec::new();
        for row in rows {
            recommendations.push(row?.try_into()?);
        }
        Ok(recommendations)
    }

    /// Delete a recommendation.
    pub fn delete_recommendation(&self, recommendation_id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "DELETE FROM recommendations WHERE recommendation_id = ?",
            [recommendation_id],
        )?;
        Ok(rows_affected > 0)
    }
}

/// Intermediate row struct for database mapping.
struct RecommendationRow {
    recommendation_id: String,
    patient_id: String,
    doctor_id: String,
    content: String,
    created_at: String,
}

impl RecommendationRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            recommendation_id: row.get(0)?,
            patient_id: row.get(1)?,
            doctor_id: row.get(2)?,
            content: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

impl TryFrom<RecommendationRow> for RecommendationRecord {
    type Error = DbError;

    fn try_from(row: RecommendationRow) -> Result<Self, Self::Error> {
        Ok(RecommendationRecord {
            recommendation_id: row.recommendation_id,
            patient_id: row.patient_id,
            doctor_id: row.doctor_id,
            content: row.content,
            created_at: decode_timestamp(&row.created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Doctor, Patient};
    use chrono::{Duration, NaiveDate};

    fn setup_db() -> (Database, Patient, Doctor) {
        let db = Database::open_in_memory().unwrap();
        let patient = Patient::new(
            "p@mail.com".into(),
            "Rui".into(),
            "Costa".into(),
            NaiveDate::from_ymd_opt(1970, 1, 1).unwrap(),
        );
        let doctor =
            Doctor::new("d@clinic.org".into(), "Ana".into(), "Silva".into(), "0123456789".into()).unwrap();
        db.insert_patient(&patient).unwrap();
        db.insert_doctor(&doctor).unwrap();
        (db, patient, doctor)
    }

    #[test]
    fn test_insert_get_delete() {
        let (db, patient, doctor) = setup_db();
        let rec = RecommendationRecord::new(patient.patient_id, doctor.doctor_id, "Walk daily.".into());
        db.insert_recommendation(&rec).unwrap();

        assert_eq!(db.get_recommendation(&rec.recommendation_id).unwrap().unwrap(), rec);
        assert!(db.delete_recommendation(&rec.recommendation_id).unwrap());
        assert!(db.get_recommendation(&rec.recommendation_id).unwrap().is_none());
        assert!(!db.delete_recommendation(&rec.recommendation_id).unwrap());
    }

    #[test]
    fn test_list_newest_first() {
        let (db, patient, doctor) = setup_db();
        let mut older = RecommendationRecord::new(
            patient.patient_id.clone(),
            doctor.doctor_id.clone(),
            "first".into(),
        );
        older.created_at = older.created_at - Duration::days(2);
        let newer = RecommendationRecord::new(
            patient.patient_id.clone(),
            doctor.doctor_id.clone(),
            "second".into(),
        );
        db.insert_recommendation(&newer).unwrap();
        db.insert_recommendation(&older).unwrap();

        let contents: Vec<String> = db
            .list_recommendations_for_patient(&patient.patient_id)
            .unwrap()
            .into_iter()
            .map(|r| r.content)
            .collect();
        assert_eq!(contents, vec!["second", "first"]);
    }

    #[test]
    fn test_cascade_from_doctor() {
        let (db, patient, doctor) = setup_db();
        let rec = RecommendationRecord::new(patient.patient_id.clone(), doctor.doctor_id.clone(), "x".into());
        db.insert_recommendation(&rec).unwrap();

        db.delete_doctor(&doctor.doctor_id).unwrap();
        assert!(db.list_recommendations_for_patient(&patient.patient_id).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_doctor_rejected() {
        let (db, patient, _) = setup_db();
        let rec = RecommendationRecord::new(patient.patient_id, "ghost".into(), "x".into());
        assert!(matches!(db.insert_recommendation(&rec), Err(DbError::Constraint(_))));
    }
}
