use anyhow::{Context, Result};
use serde_json::json;

use radqa_core::{agreement, Dataset};

use crate::cli::AgreementArgs;

pub fn run(args: AgreementArgs) -> Result<()> {
    let predictions_a = Dataset::from_file(&args.predictions_a)
        .with_context(|| format!("failed to load {}", args.predictions_a.display()))?;
    let predictions_b = Dataset::from_file(&args.predictions_b)
        .with_context(|| format!("failed to load {}", args.predictions_b.display()))?;
    let reference = Dataset::from_file(&args.reference)
        .with_context(|| format!("failed to load {}", args.reference.display()))?;

    let kappa = agreement(
        &predictions_a.all_errors(),
        &predictions_b.all_errors(),
        &reference.all_errors(),
    )?;

    println!("{}", serde_json::to_string_pretty(&json!({ "kappa": kappa }))?);
    Ok(())
}
