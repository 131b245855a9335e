use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};

use radqa_runtime::{PipelineConfig, PromptLibrary, ReasoningOrchestrator, TextGenerator};

use crate::cli::DetectArgs;

pub fn run(args: DetectArgs) -> Result<()> {
    let report_text = fs::read_to_string(&args.report)
        .with_context(|| format!("failed to read report {}", args.report.display()))?;

    let prompts = match &args.templates {
        Some(path) => PromptLibrary::from_yaml_file(path)
            .with_context(|| format!("failed to load templates from {}", path.display()))?,
        None => PromptLibrary::builtin(),
    };

    let config = PipelineConfig {
        mode: args.mode.into(),
        failure_policy: args.on_failure.into(),
        duplicate_policy: args.duplicates.into(),
        temperature: args.temperature,
        stage_timeout: args.stage_timeout,
    };

    let orchestrator = ReasoningOrchestrator::builder()
        .generator(build_generator(args.model.as_deref())?)
        .prompts(prompts)
        .config(config)
        .build()?;

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(orchestrator.detect_errors(&report_text))?;

    let usage = orchestrator.usage();
    tracing::info!(
        errors = result.error_count,
        generator_calls = usage.totals.calls,
        failures = usage.totals.failures,
        "detection complete"
    );

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

#[cfg(feature = "openai")]
fn build_generator(model: Option<&str>) -> Result<Arc<dyn TextGenerator>> {
    use radqa_runtime::OpenAiGenerator;

    let mut generator = OpenAiGenerator::from_env()?;
    if let Some(model) = model {
        generator = generator.with_model(model);
    }
    Ok(Arc::new(generator))
}

#[cfg(not(feature = "openai"))]
fn build_generator(_model: Option<&str>) -> Result<Arc<dyn TextGenerator>> {
    anyhow::bail!("no generation backend compiled in; rebuild with `--features openai`")
}
