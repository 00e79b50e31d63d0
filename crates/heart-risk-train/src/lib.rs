//! Offline model fitting and command-line classification.
//!
//! Loads the historical CSV dataset, fits the encoder and classifier with
//! `heart_risk_core::training`, and writes the artifact set the serving
//! process loads at start-up.

pub mod commands;
pub mod dataset;

pub use commands::*;
pub use dataset::*;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. `level` overrides `RUST_LOG`; the default is `info`.
pub fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
