//! heart-risk CLI
//!
//! Usage:
//!   heart-risk fit --data heart.csv --out trained_models [--trees 200] [--max-depth 15] [--seed 42]
//!   heart-risk classify --artifacts trained_models --input record.json

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use heart_risk_core::config::{ARTIFACTS_ENV, DEFAULT_ARTIFACTS};
use heart_risk_core::forest::ForestConfig;
use heart_risk_core::training::TrainingConfig;
use heart_risk_train::{classify, fit, init_logging};

#[derive(Parser)]
#[command(name = "heart-risk")]
#[command(version)]
#[command(about = "Fit and query the heart-disease risk model", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log filter (overrides RUST_LOG), e.g. "debug" or "heart_risk_core=trace"
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit the encoder and classifier from a labelled CSV dataset
    Fit {
        /// Dataset with a header row and a HeartDisease column
        #[arg(short, long)]
        data: PathBuf,

        /// Directory to write the artifact set into
        #[arg(short, long, env = ARTIFACTS_ENV, default_value = DEFAULT_ARTIFACTS)]
        out: PathBuf,

        /// Number of trees
        #[arg(long, default_value_t = 200)]
        trees: usize,

        /// Maximum tree depth
        #[arg(long, default_value_t = 15)]
        max_depth: usize,

        /// Seed for bootstrapping and the train/test split
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Share of rows held out for evaluation
        #[arg(long, default_value_t = 0.2)]
        test_fraction: f64,
    },

    /// Classify one attribute record (JSON object) without touching a database
    Classify {
        /// Artifact directory produced by `fit`
        #[arg(short, long, env = ARTIFACTS_ENV, default_value = DEFAULT_ARTIFACTS)]
        artifacts: PathBuf,

        /// JSON file with the 11 attributes
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    match cli.command {
        Commands::Fit {
            data,
            out,
            trees,
            max_depth,
            seed,
            test_fraction,
        } => {
            let config = TrainingConfig {
                forest: ForestConfig {
                    n_trees: trees,
                    max_depth,
                    seed,
                    ..ForestConfig::default()
                },
                test_fraction,
                split_seed: seed,
            };
            let report = fit(&data, &out, &config)?;

            println!("Accuracy: {:.2}%", report.accuracy);
            println!("Train rows: {}, test rows: {}", report.n_train, report.n_test);
            println!();
            println!("{}", report.report);
            println!("Artifacts written to {}", out.display());
        }
        Commands::Classify { artifacts, input } => {
            let output = classify(&artifacts, &input)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
