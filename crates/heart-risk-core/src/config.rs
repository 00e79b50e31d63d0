//! Runtime configuration from the environment.

use std::path::PathBuf;

pub const DATABASE_ENV: &str = "HEART_RISK_DATABASE";
pub const ARTIFACTS_ENV: &str = "HEART_RISK_ARTIFACTS";

pub const DEFAULT_DATABASE: &str = "heart_risk.db";
pub const DEFAULT_ARTIFACTS: &str = "trained_models";

/// Where the record store and the trained artifacts live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_path: PathBuf,
    pub artifact_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE),
            artifact_dir: PathBuf::from(DEFAULT_ARTIFACTS),
        }
    }
}

impl Config {
    pub fn new(database_path: impl Into<PathBuf>, artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            artifact_dir: artifact_dir.into(),
        }
    }

    /// Read `HEART_RISK_DATABASE` and `HEART_RISK_ARTIFACTS`, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(default))
        };
        Self {
            database_path: get(DATABASE_ENV, DEFAULT_DATABASE),
            artifact_dir: get(ARTIFACTS_ENV, DEFAULT_ARTIFACTS),
        }
    }
}
