//! SQLite schema definition.

/// Complete database schema.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Users (shared login identity; email unique across patients and doctors)
-- ============================================================================

CREATE TABLE IF NOT EXISTS users (
    user_id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    role TEXT NOT NULL CHECK (role IN ('patient', 'doctor')),
    created_at TEXT NOT NULL
);

-- ============================================================================
-- Doctors
-- ============================================================================

CREATE TABLE IF NOT EXISTS doctors (
    doctor_id TEXT PRIMARY KEY REFERENCES users(user_id) ON DELETE CASCADE,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    registry_number TEXT NOT NULL UNIQUE CHECK (length(registry_number) = 10)
);

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    patient_id TEXT PRIMARY KEY REFERENCES users(user_id) ON DELETE CASCADE,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    date_of_birth TEXT NOT NULL,                 -- YYYY-MM-DD
    doctor_id TEXT REFERENCES doctors(doctor_id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_patients_doctor ON patients(doctor_id);

-- ============================================================================
-- Predictions (append-only)
-- ============================================================================

CREATE TABLE IF NOT EXISTS predictions (
    prediction_id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(patient_id) ON DELETE CASCADE,
    age INTEGER NOT NULL,
    gender TEXT NOT NULL,
    chest_pain_type TEXT NOT NULL,
    resting_bp INTEGER NOT NULL,
    cholesterol INTEGER NOT NULL,
    fasting_bs INTEGER NOT NULL CHECK (fasting_bs IN (0, 1)),
    resting_ecg TEXT NOT NULL,
    max_hr INTEGER NOT NULL,
    exercise_angina TEXT NOT NULL,
    oldpeak REAL NOT NULL,
    st_slope TEXT NOT NULL,
    risk TEXT NOT NULL CHECK (risk IN ('have', 'don''t have')),
    predicted_at TEXT NOT NULL                   -- RFC 3339, nanoseconds, UTC
);

CREATE INDEX IF NOT EXISTS idx_predictions_patient ON predictions(patient_id, predicted_at);

-- ============================================================================
-- Recommendations
-- ============================================================================

CREATE TABLE IF NOT EXISTS recommendations (
    recommendation_id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(patient_id) ON DELETE CASCADE,
    doctor_id TEXT NOT NULL REFERENCES doctors(doctor_id) ON DELETE CASCADE,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_recommendations_patient ON recommendations(patient_id, created_at);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn
    }

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = setup();
        assert!(conn.execute_batch(SCHEMA).is_ok());
    }

    #[test]
    fn test_email_unique_across_roles() {
        let conn = setup();
        conn.execute(
            "INSERT INTO users (user_id, email, role, created_at) VALUES ('u1', 'x@y.z', 'patient', 't')",
            [],
        )
        .unwrap();
        let result = conn.execute(
            "INSERT INTO users (user_id, email, role, created_at) VALUES ('u2', 'x@y.z', 'doctor', 't')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_risk_check_constraint() {
        let conn = setup();
        conn.execute(
            "INSERT INTO users (user_id, email, role, created_at) VALUES ('p1', 'p@x.z', 'patient', 't')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO patients (patient_id, first_name, last_name, date_of_birth) VALUES ('p1', 'A', 'B', '1970-01-01')",
            [],
        )
        .unwrap();

        let insert = |risk: &str| {
            conn.execute(
                "INSERT INTO predictions VALUES (?1, 'p1', 50, 'M', 'ASY', 120, 200, 0, 'Normal', 150, 'N', 0.0, 'Up', ?2, 't')",
                [format!("id-{}", risk), risk.to_string()],
            )
        };
        assert!(insert("maybe").is_err());
        assert!(insert("don't have").is_ok());
    }

    #[test]
    fn test_prediction_requires_patient() {
        let conn = setup();
        let result = conn.execute(
            "INSERT INTO predictions VALUES ('x', 'ghost', 50, 'M', 'ASY', 120, 200, 0, 'Normal', 150, 'N', 0.0, 'Up', 'have', 't')",
            [],
        );
        assert!(result.is_err());
    }
}
