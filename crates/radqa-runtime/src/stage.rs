//! Stage execution: one reasoning pass over a report.

use std::sync::Arc;

use radqa_core::{StageId, StageResult};

use crate::cache::CompletionCache;
use crate::generator::{GenerationError, TextGenerator};
use crate::parser::parse_stage_response;
use crate::prompts::PromptLibrary;

/// Default sampling temperature for stage requests.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Executes single reasoning stages against a generation backend.
///
/// # Isolation Contract
/// A runner holds no per-report state; concurrent `run` calls for
/// different stages of the same report are safe and independent. Failures
/// from the backend propagate unchanged: retry policy belongs to the
/// caller, never here.
pub struct StageRunner {
    generator: Arc<dyn TextGenerator>,
    prompts: Arc<PromptLibrary>,
    temperature: f32,
    cache: Option<CompletionCache>,
}

impl StageRunner {
    pub fn new(generator: Arc<dyn TextGenerator>, prompts: Arc<PromptLibrary>) -> Self {
        Self {
            generator,
            prompts,
            temperature: DEFAULT_TEMPERATURE,
            cache: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_cache(mut self, cache: CompletionCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Run one stage over `report_text`.
    ///
    /// Builds the stage request from the library template, invokes the
    /// generator (or serves the completion from cache), and parses the
    /// response into zero or more error records plus the reasoning trace.
    pub async fn run(
        &self,
        stage: StageId,
        report_text: &str,
    ) -> Result<StageResult, GenerationError> {
        if let Some(cache) = &self.cache {
            if let Some(completion) = cache.get(stage, report_text, self.temperature).await {
                tracing::debug!(stage = %stage, "serving completion from cache");
                return Ok(parse_stage_response(stage, &completion));
            }
        }

        let prompt = self.prompts.render(stage, report_text);
        tracing::debug!(
            stage = %stage,
            backend = self.generator.name(),
            prompt_tokens = self.generator.estimate_tokens(&prompt),
            "dispatching stage request"
        );

        let completion = self.generator.generate(&prompt, self.temperature).await?;

        if let Some(cache) = &self.cache {
            cache
                .insert(stage, report_text, self.temperature, completion.clone())
                .await;
        }

        Ok(parse_stage_response(stage, &completion))
    }
}
