use anyhow::{Context, Result};
use serde_json::json;

use radqa_core::{score, score_by_modality, score_by_type, Dataset};

use crate::cli::ScoreArgs;

pub fn run(args: ScoreArgs) -> Result<()> {
    let predictions = Dataset::from_file(&args.predictions)
        .with_context(|| format!("failed to load {}", args.predictions.display()))?;
    let reference = Dataset::from_file(&args.reference)
        .with_context(|| format!("failed to load {}", args.reference.display()))?;

    let predicted = predictions.all_errors();
    let annotated = reference.all_errors();

    let mut output = json!({
        "overall": score(&predicted, &annotated)?,
    });

    if args.by_type {
        output["by_type"] = serde_json::to_value(score_by_type(&predicted, &annotated)?)?;
    }

    if args.by_modality {
        let by_modality = score_by_modality(
            &predictions.errors_by_report(),
            &reference.errors_by_report(),
            &reference.modalities(),
        )?;
        output["by_modality"] = serde_json::to_value(by_modality)?;
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
