//! Prediction database operations.
//!
//! Predictions are append-only: there is no update statement.

use rusqlite::{params, OptionalExtension, Row};

use super::{constraint_error, decode_timestamp, encode_timestamp, Database, DbError, DbResult};
use crate::models::{AttributeRecord, Category, PredictionRecord, RiskLabel};

const SELECT_PREDICTION: &str = r#"
    SELECT prediction_id, patient_id, age, gender, chest_pain_type, resting_bp,
           cholesterol, fasting_bs, resting_ecg, max_hr, exercise_angina,
           oldpeak, st_slope, risk, predicted_at
    FROM predictions
"#;

impl Database {
    /// Insert a prediction. The patient must exist.
    pub fn insert_prediction(&self, prediction: &PredictionRecord) -> DbResult<()> {
        let a = &prediction.attributes;
        self.conn
            .execute(
                r#"
                INSERT INTO predictions (
                    prediction_id, patient_id, age, gender, chest_pain_type, resting_bp,
                    cholesterol, fasting_bs, resting_ecg, max_hr, exercise_angina,
                    oldpeak, st_slope, risk, predicted_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
                "#,
                params![
                    prediction.prediction_id,
                    prediction.patient_id,
                    a.age,
                    a.gender.label(),
                    a.chest_pain_type.label(),
                    a.resting_bp,
                    a.cholesterol,
                    a.fasting_bs,
                    a.resting_ecg.label(),
                    a.max_hr,
                    a.exercise_angina.label(),
                    a.oldpeak,
                    a.st_slope.label(),
                    prediction.risk.as_str(),
                    encode_timestamp(&prediction.predicted_at),
                ],
            )
            .map_err(constraint_error)?;
        Ok(())
    }

    /// Get a prediction by ID.
    pub fn get_prediction(&self, prediction_id: &str) -> DbResult<Option<PredictionRecord>> {
        self.conn
            .query_row(
                &format!("{} WHERE prediction_id = ?", SELECT_PREDICTION),
                [prediction_id],
                PredictionRow::from_row,
            )
            .optional()?
            .map(TryInto::try_into)
            .transpose()
    }

    /// Most recent prediction for a patient. Same-instant ties go to the later insert.
    pub fn latest_prediction_for_patient(&self, patient_id: &str) -> DbResult<Option<PredictionRecord>> {
        self.conn
            .query_row(
                &format!(
                    "{} WHERE patient_id = ? ORDER BY predicted_at DESC, rowid DESC LIMIT 1",
                    SELECT_PREDICTION
                ),
                [patient_id],
                PredictionRow::from_row,
            )
            .optional()?
            .map(TryInto::try_into)
            .transpose()
    }

    /// All predictions for a patient, newest first.
    pub fn list_predictions_for_patient(&self, patient_id: &str) -> DbResult<Vec<PredictionRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE patient_id = ? ORDER BY predicted_at DESC, rowid DESC",
            SELECT_PREDICTION
        ))?;
        let rows = stmt.query_map([patient_id], PredictionRow::from_row)?;

        let mut predictions = Vec::new();
        for row in rows {
            predictions.push(row?.try_into()?);
        }
        Ok(predictions)
    }

    /// Total number of stored predictions.
    pub fn count_predictions(&self) -> DbResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM predictions", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Intermediate row struct for database mapping.
struct PredictionRow {
    prediction_id: String,
    patient_id: String,
    age: i32,
    gender: String,
    chest_pain_type: String,
    resting_bp: i32,
    cholesterol: i32,
    fasting_bs: u8,
    resting_ecg: String,
    max_hr: i32,
    exercise_angina: String,
    oldpeak: f64,
    st_slope: String,
    risk: String,
    predicted_at: String,
}

impl PredictionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            prediction_id: row.get(0)?,
            patient_id: row.get(1)?,
            age: row.get(2)?,
            gender: row.get(3)?,
            chest_pain_type: row.get(4)?,
            resting_bp: row.get(5)?,
            cholesterol: row.get(6)?,
            fasting_bs: row.get(7)?,
            resting_ecg: row.get(8)?,
            max_hr: row.get(9)?,
            exercise_angina: row.get(10)?,
            oldpeak: row.get(11)?,
            st_slope: row.get(12)?,
            risk: row.get(13)?,
            predicted_at: row.get(14)?,
        })
    }
}

impl TryFrom<PredictionRow> for PredictionRecord {
    type Error = DbError;

    fn try_from(row: PredictionRow) -> Result<Self, Self::Error> {
        let attributes = AttributeRecord {
            age: row.age,
            gender: stored_category(&row.gender)?,
            chest_pain_type: stored_category(&row.chest_pain_type)?,
            resting_bp: row.resting_bp,
            cholesterol: row.cholesterol,
            fasting_bs: row.fasting_bs,
            resting_ecg: stored_category(&row.resting_ecg)?,
            max_hr: row.max_hr,
            exercise_angina: stored_category(&row.exercise_angina)?,
            oldpeak: row.oldpeak,
            st_slope: stored_category(&row.st_slope)?,
        };
        let risk: RiskLabel = row.risk.parse().map_err(DbError::Constraint)?;

        Ok(PredictionRecord {
            prediction_id: row.prediction_id,
            patient_id: row.patient_id,
            attributes,
            risk,
            predicted_at: decode_timestamp(&row.predicted_at)?,
        })
    }
}

fn stored_category<C: Category>(label: &str) -> DbResult<C> {
    C::from_label(label)
        .ok_or_else(|| DbError::Constraint(format!("Unknown {} label: {}", C::FIELD, label)))
}
