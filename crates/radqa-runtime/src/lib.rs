//! # radqa-runtime
//!
//! LLM-assisted reasoning pipeline for radiology report error detection.
//!
//! This crate drives a text-generation backend through one generic review
//! pass (standard mode) or six specialized reasoning stages (structured
//! mode) and consolidates whatever the stages find into one deduplicated
//! result. Matching and scoring live in `radqa-core` and never touch an
//! LLM.
//!
//! The six structured stages are mutually independent: none reads another
//! stage's output, so the orchestrator dispatches them as concurrent
//! tasks and re-imposes the fixed stage order at consolidation.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use radqa_runtime::{OpenAiGenerator, PipelineConfig, ReasoningOrchestrator};
//!
//! let orchestrator = ReasoningOrchestrator::builder()
//!     .generator(Arc::new(OpenAiGenerator::from_env()?))
//!     .config(PipelineConfig::default())
//!     .build()?;
//!
//! let result = orchestrator.detect_errors(&report_text).await?;
//! println!("{} errors", result.error_count);
//! ```

pub mod cache;
pub mod generator;
pub mod orchestrator;
pub mod parser;
pub mod prompts;
pub mod providers;
pub mod stage;

// Re-export main types at crate root
pub use cache::CompletionCache;
pub use generator::{GenerationError, TextGenerator};
pub use orchestrator::{
    DetectionMode, FailurePolicy, OrchestratorBuilder, PipelineConfig, PipelineError,
    PipelineUsage, ReasoningOrchestrator, StageUsage,
};
pub use parser::parse_stage_response;
pub use prompts::{PromptError, PromptLibrary, SYSTEM_PROMPT};
pub use stage::{StageRunner, DEFAULT_TEMPERATURE};

#[cfg(feature = "openai")]
pub use providers::OpenAiGenerator;
