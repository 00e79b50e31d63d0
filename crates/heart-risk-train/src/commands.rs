//! `fit` and `classify` command bodies, kept out of `main` so they can be tested.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use heart_risk_core::models::RawAttributes;
use heart_risk_core::training::{fit_artifacts, TrainingConfig, TrainingReport};
use heart_risk_core::{InferenceContext, RiskLabel};
use serde::Serialize;
use serde_json::Value;

use crate::dataset;

/// Fit every artifact from a CSV dataset and write them to `out`.
pub fn fit(data: &Path, out: &Path, config: &TrainingConfig) -> Result<TrainingReport> {
    let records = dataset::load_csv(data)
        .with_context(|| format!("failed to load dataset {}", data.display()))?;

    let (artifacts, report) = fit_artifacts(&records, config).context("model fitting failed")?;
    artifacts
        .save(out)
        .with_context(|| format!("failed to write artifacts to {}", out.display()))?;
    Ok(report)
}

/// Result of classifying a single record from the command line.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifyOutput {
    pub risk: RiskLabel,
    pub model_accuracy: f64,
}

/// Classify one JSON attribute record against a saved artifact set.
pub fn classify(artifacts: &Path, input: &Path) -> Result<ClassifyOutput> {
    let context = InferenceContext::load(artifacts)
        .with_context(|| format!("failed to load artifacts from {}", artifacts.display()))?;

    let text = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let raw = raw_from_json(serde_json::from_str(&text)?)?;
    let record = raw.parse()?;

    Ok(ClassifyOutput {
        risk: context.predict(&record)?,
        model_accuracy: context.model_accuracy(),
    })
}

/// Accept numbers or strings for every field.
fn raw_from_json(value: Value) -> Result<RawAttributes> {
    let Value::Object(fields) = value else {
        bail!("expected a JSON object of attributes");
    };
    let fields = fields
        .into_iter()
        .map(|(key, v)| {
            let v = match v {
                Value::Number(n) => Value::String(n.to_string()),
                other => other,
            };
            (key, v)
        })
        .collect();
    Ok(serde_json::from_value(Value::Object(fields))?)
}
