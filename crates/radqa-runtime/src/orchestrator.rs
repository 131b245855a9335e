//! Reasoning orchestrator for multi-stage error detection.
//!
//! The orchestrator drives the stage runner once (standard mode) or six
//! times (structured mode) per report and hands the completed stage
//! results to the deterministic consolidator:
//! - Parallel fan-out of the six independent stages via `join_all`
//! - Per-stage timeout; policy-controlled handling of stage failures
//! - Fan-in through `radqa_core::Consolidator`, which re-imposes the fixed
//!   stage order regardless of completion order

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use radqa_core::{ConsolidatedResult, Consolidator, DuplicatePolicy, StageId, StageResult};

use crate::cache::CompletionCache;
use crate::generator::{GenerationError, TextGenerator};
use crate::prompts::{PromptError, PromptLibrary};
use crate::stage::{StageRunner, DEFAULT_TEMPERATURE};

/// Errors from the detection pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("report text is empty")]
    EmptyReport,

    #[error("no generator configured")]
    NoGenerator,

    #[error("configuration error: {0}")]
    Configuration(#[from] PromptError),

    #[error("stage '{stage}' failed: {source}")]
    StageFailed {
        stage: StageId,
        source: GenerationError,
    },
}

/// Which detection path to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    /// Single generic review pass.
    Standard,

    /// Six specialized reasoning stages.
    #[default]
    Structured,
}

/// What to do when one stage's generation fails.
///
/// Tolerating partial stage failure materially changes recall, so the
/// choice is always explicit configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Abort the whole detection and propagate the failure.
    #[default]
    Abort,

    /// Record an empty stage with a failure marker in its trace slot and
    /// continue with the remaining stages. A stage timeout is handled the
    /// same way.
    ContinueWithEmptyStage,
}

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub mode: DetectionMode,
    pub failure_policy: FailurePolicy,
    pub duplicate_policy: DuplicatePolicy,
    pub temperature: f32,
    pub stage_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: DetectionMode::default(),
            failure_policy: FailurePolicy::default(),
            duplicate_policy: DuplicatePolicy::default(),
            temperature: DEFAULT_TEMPERATURE,
            stage_timeout: Duration::from_secs(60),
        }
    }
}

/// Generator-call counts for one scope (stage or totals).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageUsage {
    pub calls: u32,
    pub failures: u32,
    pub timeouts: u32,
}

/// Accumulated generator usage across an orchestrator's lifetime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineUsage {
    pub totals: StageUsage,
    pub per_stage: BTreeMap<String, StageUsage>,
}

#[derive(Default)]
struct UsageTracker {
    calls: AtomicU32,
    failures: AtomicU32,
    timeouts: AtomicU32,
    per_stage: RwLock<BTreeMap<StageId, StageUsage>>,
}

impl UsageTracker {
    fn record_call(&self, stage: StageId) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.per_stage.write().entry(stage).or_default().calls += 1;
    }

    fn record_failure(&self, stage: StageId) {
        self.failures.fetch_add(1, Ordering::SeqCst);
        self.per_stage.write().entry(stage).or_default().failures += 1;
    }

    fn record_timeout(&self, stage: StageId) {
        self.timeouts.fetch_add(1, Ordering::SeqCst);
        self.per_stage.write().entry(stage).or_default().timeouts += 1;
    }

    fn snapshot(&self) -> PipelineUsage {
        PipelineUsage {
            totals: StageUsage {
                calls: self.calls.load(Ordering::SeqCst),
                failures: self.failures.load(Ordering::SeqCst),
                timeouts: self.timeouts.load(Ordering::SeqCst),
            },
            per_stage: self
                .per_stage
                .read()
                .iter()
                .map(|(stage, usage)| (stage.trace_key().to_string(), *usage))
                .collect(),
        }
    }
}

/// Drives stage execution and consolidation for one configured pipeline.
pub struct ReasoningOrchestrator {
    runner: StageRunner,
    consolidator: Consolidator,
    config: PipelineConfig,
    usage: UsageTracker,
}

impl ReasoningOrchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Generator usage recorded so far.
    pub fn usage(&self) -> PipelineUsage {
        self.usage.snapshot()
    }

    /// Detect errors in `report_text` under the configured mode.
    ///
    /// # Execution Flow
    /// 1. Standard mode: one stage, trivially consolidated
    /// 2. Structured mode: fan-out all six stages concurrently, collect
    ///    completed results into fixed slots indexed by stage ordinal,
    ///    then run the sequential consolidation pass
    pub async fn detect_errors(
        &self,
        report_text: &str,
    ) -> Result<ConsolidatedResult, PipelineError> {
        if report_text.trim().is_empty() {
            return Err(PipelineError::EmptyReport);
        }

        let results = match self.config.mode {
            DetectionMode::Standard => {
                vec![self.run_stage_guarded(StageId::Standard, report_text).await?]
            }
            DetectionMode::Structured => {
                let stage_futures = StageId::STRUCTURED_STAGES
                    .iter()
                    .map(|&stage| self.run_stage_guarded(stage, report_text));
                let completed = future::join_all(stage_futures).await;

                // Slot array indexed by stage ordinal: completion order
                // carries no information past this point.
                let mut slots: [Option<StageResult>; 6] = Default::default();
                for outcome in completed {
                    let result = outcome?;
                    if let Some(index) = result.stage.ordinal() {
                        slots[index] = Some(result);
                    }
                }
                slots.into_iter().flatten().collect()
            }
        };

        Ok(self.consolidator.consolidate(results))
    }

    /// Run one stage under the timeout and failure policy.
    async fn run_stage_guarded(
        &self,
        stage: StageId,
        report_text: &str,
    ) -> Result<StageResult, PipelineError> {
        self.usage.record_call(stage);

        match tokio::time::timeout(
            self.config.stage_timeout,
            self.runner.run(stage, report_text),
        )
        .await
        {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(source)) => {
                self.usage.record_failure(stage);
                tracing::warn!(stage = %stage, error = %source, "stage generation failed");
                self.apply_failure_policy(stage, source)
            }
            Err(_) => {
                self.usage.record_timeout(stage);
                let source = GenerationError::Timeout(self.config.stage_timeout);
                tracing::warn!(
                    stage = %stage,
                    timeout = ?self.config.stage_timeout,
                    "stage timed out"
                );
                self.apply_failure_policy(stage, source)
            }
        }
    }

    fn apply_failure_policy(
        &self,
        stage: StageId,
        source: GenerationError,
    ) -> Result<StageResult, PipelineError> {
        match self.config.failure_policy {
            FailurePolicy::Abort => Err(PipelineError::StageFailed { stage, source }),
            FailurePolicy::ContinueWithEmptyStage => Ok(StageResult::failed(stage, source)),
        }
    }
}

/// Builder for [`ReasoningOrchestrator`].
pub struct OrchestratorBuilder {
    generator: Option<Arc<dyn TextGenerator>>,
    prompts: PromptLibrary,
    config: PipelineConfig,
    cache: Option<CompletionCache>,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            generator: None,
            prompts: PromptLibrary::builtin(),
            config: PipelineConfig::default(),
            cache: None,
        }
    }

    pub fn generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn prompts(mut self, prompts: PromptLibrary) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn cache(mut self, cache: CompletionCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Build the orchestrator.
    ///
    /// The prompt library is validated here: a missing template is a fatal
    /// configuration error at construction time, not a per-call error.
    pub fn build(self) -> Result<ReasoningOrchestrator, PipelineError> {
        let generator = self.generator.ok_or(PipelineError::NoGenerator)?;
        self.prompts.validate()?;

        let mut runner = StageRunner::new(generator, Arc::new(self.prompts))
            .with_temperature(self.config.temperature);
        if let Some(cache) = self.cache {
            runner = runner.with_cache(cache);
        }

        Ok(ReasoningOrchestrator {
            runner,
            consolidator: Consolidator::with_policy(self.config.duplicate_policy),
            config: self.config,
            usage: UsageTracker::default(),
        })
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
