//! Historical dataset loading (comma-separated, header row required).

use std::fs;
use std::path::Path;

use heart_risk_core::encoder::EncodeError;
use heart_risk_core::models::RawAttributes;
use heart_risk_core::training::LabeledRecord;
use thiserror::Error;

/// Dataset errors.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dataset is empty")]
    Empty,

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Line {line}: expected {expected} cells, got {got}")]
    CellCount { line: usize, expected: usize, got: usize },

    #[error("Line {line}: {source}")]
    Row {
        line: usize,
        #[source]
        source: EncodeError,
    },

    #[error("Line {line}: unknown label '{value}'")]
    Label { line: usize, value: String },
}

pub type DatasetResult<T> = Result<T, DatasetError>;

/// Accepted header spellings per attribute, compared case-insensitively.
const ATTRIBUTE_COLUMNS: [(&str, &[&str]); 11] = [
    ("age", &["age"]),
    ("gender", &["sex", "gender"]),
    ("chest_pain_type", &["chestpaintype", "chest_pain_type", "cp"]),
    ("resting_bp", &["restingbp", "resting_bp", "trestbps"]),
    ("cholesterol", &["cholesterol", "chol"]),
    ("fasting_bs", &["fastingbs", "fasting_bs", "fbs"]),
    ("resting_ecg", &["restingecg", "resting_ecg", "restecg"]),
    ("max_hr", &["maxhr", "max_hr"]),
    ("exercise_angina", &["exerciseangina", "exercise_angina", "exang"]),
    ("oldpeak", &["oldpeak"]),
    ("st_slope", &["st_slope", "stslope", "slope"]),
];

const LABEL_COLUMNS: &[&str] = &["heartdisease", "heart_disease", "target"];

pub fn load_csv<P: AsRef<Path>>(path: P) -> DatasetResult<Vec<LabeledRecord>> {
    let text = fs::read_to_string(path)?;
    parse_csv(&text)
}

/// Parse dataset text. Blank lines are skipped; line numbers are 1-based.
pub fn parse_csv(text: &str) -> DatasetResult<Vec<LabeledRecord>> {
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty());

    let (_, header) = lines.next().ok_or(DatasetError::Empty)?;
    let header: Vec<String> = split_row(header).iter().map(|h| h.to_lowercase()).collect();
    let find = |names: &[&str]| {
        header
            .iter()
            .position(|h| names.iter().any(|n| *n == h.as_str()))
    };

    let mut attribute_idx = [0usize; 11];
    for (slot, (field, names)) in attribute_idx.iter_mut().zip(ATTRIBUTE_COLUMNS) {
        *slot = find(names).ok_or_else(|| DatasetError::MissingColumn(field.to_string()))?;
    }
    let label_idx = find(LABEL_COLUMNS).ok_or_else(|| DatasetError::MissingColumn("HeartDisease".into()))?;

    let mut records = Vec::new();
    for (i, line) in lines {
        let line_no = i + 1;
        let cells = split_row(line);
        if cells.len() != header.len() {
            return Err(DatasetError::CellCount {
                line: line_no,
                expected: header.len(),
                got: cells.len(),
            });
        }

        let cell = |idx: usize| Some(cells[idx].to_string());
        let raw = RawAttributes {
            age: cell(attribute_idx[0]),
            gender: cell(attribute_idx[1]),
            chest_pain_type: cell(attribute_idx[2]),
            resting_bp: cell(attribute_idx[3]),
            cholesterol: cell(attribute_idx[4]),
            fasting_bs: cell(attribute_idx[5]),
            resting_ecg: cell(attribute_idx[6]),
            max_hr: cell(attribute_idx[7]),
            exercise_angina: cell(attribute_idx[8]),
            oldpeak: cell(attribute_idx[9]),
            st_slope: cell(attribute_idx[10]),
        };
        let attributes = raw
            .parse()
            .map_err(|source| DatasetError::Row { line: line_no, source })?;
        let has_disease = parse_label(cells[label_idx]).ok_or_else(|| DatasetError::Label {
            line: line_no,
            value: cells[label_idx].to_string(),
        })?;

        records.push(LabeledRecord {
            attributes,
            has_disease,
        });
    }

    if records.is_empty() {
        return Err(DatasetError::Empty);
    }
    tracing::info!(rows = records.len(), "Loaded dataset");
    Ok(records)
}

fn split_row(line: &str) -> Vec<&str> {
    line.split(',')
        .map(|c| c.trim().trim_matches('"').trim())
        .collect()
}

fn parse_label(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "have" => Some(true),
        "0" | "don't have" => Some(false),
        _ => None,
    }
}
