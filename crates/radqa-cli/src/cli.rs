use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use radqa_core::DuplicatePolicy;
use radqa_runtime::{DetectionMode, FailurePolicy};

#[derive(Parser, Debug)]
#[command(
    name = "radqa",
    version,
    about = "Radiology report error detection and scoring"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the reasoning pipeline over one report
    Detect(DetectArgs),
    /// Score predicted errors against reference annotations
    Score(ScoreArgs),
    /// Inter-model agreement (Cohen's kappa) against one reference set
    Agreement(AgreementArgs),
}

#[derive(Args, Debug, Clone)]
pub struct DetectArgs {
    /// Report text file
    #[arg(long)]
    pub report: PathBuf,

    #[arg(long, value_enum, default_value_t = ModeArg::Structured)]
    pub mode: ModeArg,

    /// What to do when a stage's generation fails
    #[arg(long = "on-failure", value_enum, default_value_t = FailureArg::Abort)]
    pub on_failure: FailureArg,

    /// Tie-break for errors detected by multiple stages
    #[arg(long, value_enum, default_value_t = DuplicateArg::FirstStageWins)]
    pub duplicates: DuplicateArg,

    #[arg(long, default_value_t = 0.7)]
    pub temperature: f32,

    #[arg(long, default_value = "60s", value_parser = humantime::parse_duration)]
    pub stage_timeout: Duration,

    /// Completion model override
    #[arg(long)]
    pub model: Option<String>,

    /// YAML file overriding built-in stage templates
    #[arg(long)]
    pub templates: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ScoreArgs {
    /// Predicted errors dataset (JSON or YAML)
    #[arg(long)]
    pub predictions: PathBuf,

    /// Reference annotations dataset (JSON or YAML)
    #[arg(long)]
    pub reference: PathBuf,

    /// Include the per-error-type breakdown
    #[arg(long, default_value_t = false)]
    pub by_type: bool,

    /// Include the per-modality breakdown (modalities from the reference set)
    #[arg(long, default_value_t = false)]
    pub by_modality: bool,
}

#[derive(Args, Debug, Clone)]
pub struct AgreementArgs {
    #[arg(long)]
    pub predictions_a: PathBuf,

    #[arg(long)]
    pub predictions_b: PathBuf,

    #[arg(long)]
    pub reference: PathBuf,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ModeArg {
    Standard,
    Structured,
}

impl From<ModeArg> for DetectionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Standard => DetectionMode::Standard,
            ModeArg::Structured => DetectionMode::Structured,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum FailureArg {
    Abort,
    Continue,
}

impl From<FailureArg> for FailurePolicy {
    fn from(policy: FailureArg) -> Self {
        match policy {
            FailureArg::Abort => FailurePolicy::Abort,
            FailureArg::Continue => FailurePolicy::ContinueWithEmptyStage,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum DuplicateArg {
    FirstStageWins,
    HighestConfidenceWins,
}

impl From<DuplicateArg> for DuplicatePolicy {
    fn from(policy: DuplicateArg) -> Self {
        match policy {
            DuplicateArg::FirstStageWins => DuplicatePolicy::FirstStageWins,
            DuplicateArg::HighestConfidenceWins => DuplicatePolicy::HighestConfidenceWins,
        }
    }
}
