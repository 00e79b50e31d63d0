//! Median imputation for unmeasured cholesterol.

use serde::{Deserialize, Serialize};

use crate::models::AttributeRecord;

/// Replaces a cholesterol reading of 0 with the median of the fitting dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CholesterolImputation {
    pub median: f64,
}

impl CholesterolImputation {
    /// Fit on the raw column, zeros included.
    pub fn fit(records: &[AttributeRecord]) -> Self {
        let mut values: Vec<f64> = records.iter().map(|r| r.cholesterol as f64).collect();
        Self {
            median: median(&mut values).unwrap_or(0.0),
        }
    }

    /// Cholesterol value the model should see for this record.
    pub fn apply(&self, cholesterol: i32) -> f64 {
        if cholesterol == 0 {
            self.median
        } else {
            cholesterol as f64
        }
    }
}

/// Median of the values (mean of the two middle values for even counts).
pub(crate) fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
