//! Per-feature standardisation.

use serde::{Deserialize, Serialize};

use super::{EncodeError, EncodeResult};

/// Standardises each feature as `(x - mean) / scale`.
///
/// `scale` is the population standard deviation observed at fit time, or
/// 1.0 for constant features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Build from explicit parameters.
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> EncodeResult<Self> {
        if mean.len() != scale.len() {
            return Err(EncodeError::schema(
                "scaler",
                format!("{} means but {} scales", mean.len(), scale.len()),
            ));
        }
        Ok(Self { mean, scale })
    }

    /// Fit on rows of equal width.
    pub fn fit(rows: &[Vec<f64>]) -> EncodeResult<Self> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|row| row.len() != width) {
            return Err(EncodeError::schema("scaler", "rows have different widths"));
        }

        let n = rows.len() as f64;
        let mut mean = vec![0.0; width];
        let mut scale = vec![1.0; width];
        if rows.is_empty() {
            return Ok(Self { mean, scale });
        }

        for row in rows {
            for (m, x) in mean.iter_mut().zip(row) {
                *m += x;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        for (j, s) in scale.iter_mut().enumerate() {
            let var = rows.iter().map(|row| (row[j] - mean[j]).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            *s = if std > 0.0 { std } else { 1.0 };
        }

        Ok(Self { mean, scale })
    }

    pub fn width(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    /// Standardise one row.
    pub fn transform(&self, row: &[f64]) -> EncodeResult<Vec<f64>> {
        if row.len() != self.width() {
            return Err(EncodeError::schema(
                "features",
                format!("scaler expects {} features, got {}", self.width(), row.len()),
            ));
        }
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| (x - m) / s)
            .collect())
    }
}
