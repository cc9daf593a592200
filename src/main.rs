//! # laminate-advisor CLI
//!
//! Reads one JSON `ResolveRequest` and prints the `RecommendationResult`.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use laminate_advisor::{config, logging, RecommendationEngine};

/// Conventional vs. sustainable laminate recommendations.
///
/// Example request:
/// {"application": "retort", "sustainability": 2, "restrictions": ["avoid_aluminium"]}
#[derive(Parser, Debug)]
#[command(name = "laminate-advisor", version, about)]
struct Cli {
    /// Request JSON file (reads stdin when omitted)
    request: Option<PathBuf>,

    /// Directory with materials.toml / structure_rules.toml / barrier_profiles.toml
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Print single-line JSON
    #[arg(long)]
    compact: bool,
}

fn main() -> Result<()> {
    logging::init();

    let cli = Cli::parse();

    let data = config::load(cli.data_dir.as_deref()).context("failed to load reference data")?;
    let engine = RecommendationEngine::new(data);

    let input = match &cli.request {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("failed to read {:?}", path))?
        }
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read request from stdin")?;
            buf
        }
    };

    let result = engine.resolve_json(&input)?;

    let json = if cli.compact {
        serde_json::to_string(&result)?
    } else {
        serde_json::to_string_pretty(&result)?
    };
    println!("{}", json);

    Ok(())
}
