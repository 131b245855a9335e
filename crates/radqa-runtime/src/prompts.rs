//! Instruction templates for the reasoning stages.
//!
//! One standard template plus six structured stage templates, each with a
//! single `{report}` substitution slot. Stage templates share a response
//! format so stage output parses uniformly.
//!
//! A [`PromptLibrary`] is validated when it is built: a missing template or
//! a template without its `{report}` slot is a fatal configuration error,
//! surfaced at orchestrator construction rather than per call.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use thiserror::Error;

use radqa_core::StageId;

/// Errors in prompt-library configuration.
#[derive(Error, Debug)]
pub enum PromptError {
    #[error("missing template for stage '{0}'")]
    MissingTemplate(&'static str),

    #[error("template for stage '{0}' must contain exactly one {{report}} slot")]
    BadReportSlot(&'static str),

    #[error("failed to read template file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse template file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unknown stage key '{0}' in template file")]
    UnknownStage(String),
}

/// System prompt shared by every stage request.
pub const SYSTEM_PROMPT: &str = "You are a radiology quality assurance specialist tasked with \
detecting errors in radiology reports. Analyze each report exactly as instructed.";

/// Shared response format appended to every stage template.
const RESPONSE_FORMAT: &str = r#"
For each error found, report it as:
Error type: <category>
Location: <where in the report>
Explanation: <brief explanation>
Confidence: <high, medium, or low>

If no errors are found, state that the report is clean for this check."#;

const STANDARD_PROMPT: &str = r#"Please review the following radiology report and identify any errors present.

Report:
{report}
"#;

const ANATOMICAL_VALIDATION_PROMPT: &str = r#"### Step 1: Anatomical Structure Validation
Carefully review the following radiology report and identify any errors related to
anatomical references, laterality (left/right), or spatial relationships.

Report:
{report}

1. Are all anatomical structures correctly named?
2. Is laterality (left/right) consistently and correctly specified?
3. Are spatial relationships anatomically accurate?
4. Are there any contradictory anatomical descriptions?

List all anatomical errors found.
"#;

const MEASUREMENT_CONSISTENCY_PROMPT: &str = r#"### Step 2: Measurement Consistency Checking
Carefully review the following radiology report and identify any errors related to
measurements, units, or numerical values.

Report:
{report}

1. Are all measurements provided with appropriate units?
2. Are measurements consistent throughout the report?
3. Are the measurements within physiologically plausible ranges?
4. Are there any contradictory measurements?

List all measurement errors found.
"#;

const CROSS_SECTIONAL_PROMPT: &str = r#"### Step 3: Cross-sectional Correlation
Carefully review the following radiology report and identify any inconsistencies
between different imaging planes, sequences, or sections of the report.

Report:
{report}

1. Are findings consistent across different imaging planes/sequences?
2. Are there contradictions between descriptions of the same structure in different sections?
3. If multiple imaging techniques are mentioned, are their results compatible?

List all cross-sectional correlation errors found.
"#;

const FINDINGS_IMPRESSION_PROMPT: &str = r#"### Step 4: Findings-Impression Alignment
Carefully review the following radiology report and identify any discrepancies
between the detailed findings section and the summary impression section.

Report:
{report}

1. Are all significant findings from the findings section reflected in the impression?
2. Are there any conclusions in the impression not supported by the findings?
3. Are the impressions logically derived from the findings?

List all findings-impression alignment errors found.
"#;

const CLINICAL_COMPLETENESS_PROMPT: &str = r#"### Step 5: Clinical Completeness Assessment
Carefully review the following radiology report and identify any errors related to
missing clinically important information or follow-up recommendations.

Report:
{report}

1. Based on the findings, are appropriate follow-up recommendations provided?
2. Are there any clinically significant findings that appear to be overlooked?
3. Is the report complete for the stated clinical indication?

List all clinical completeness errors found.
"#;

const TERMINOLOGY_ACCURACY_PROMPT: &str = r#"### Step 6: Radiological Terminology Accuracy
Carefully review the following radiology report and identify any errors related to
radiological terminology, lexicon, or standard reporting language.

Report:
{report}

1. Is standard radiological terminology used appropriately?
2. Are there any instances of incorrect or outdated terms?
3. Are abbreviations used consistently and appropriately?

List all terminology errors found.
"#;

/// All seven stages a library must cover.
const ALL_STAGES: [StageId; 7] = [
    StageId::Standard,
    StageId::AnatomicalValidation,
    StageId::MeasurementConsistency,
    StageId::CrossSectionalCorrelation,
    StageId::FindingsImpressionAlignment,
    StageId::ClinicalCompleteness,
    StageId::TerminologyAccuracy,
];

fn builtin_template(stage: StageId) -> &'static str {
    match stage {
        StageId::Standard => STANDARD_PROMPT,
        StageId::AnatomicalValidation => ANATOMICAL_VALIDATION_PROMPT,
        StageId::MeasurementConsistency => MEASUREMENT_CONSISTENCY_PROMPT,
        StageId::CrossSectionalCorrelation => CROSS_SECTIONAL_PROMPT,
        StageId::FindingsImpressionAlignment => FINDINGS_IMPRESSION_PROMPT,
        StageId::ClinicalCompleteness => CLINICAL_COMPLETENESS_PROMPT,
        StageId::TerminologyAccuracy => TERMINOLOGY_ACCURACY_PROMPT,
    }
}

/// The template store consumed by stage runners.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    templates: BTreeMap<StageId, String>,
}

impl PromptLibrary {
    /// The built-in template set.
    pub fn builtin() -> Self {
        let templates = ALL_STAGES
            .iter()
            .map(|&stage| {
                (
                    stage,
                    format!("{}\n{}", builtin_template(stage), RESPONSE_FORMAT),
                )
            })
            .collect();
        Self { templates }
    }

    /// Built-in templates overlaid with per-stage overrides from a YAML
    /// file mapping stage keys (`standard`, `anatomical_validation`, ...)
    /// to template text.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, PromptError> {
        let contents = fs::read_to_string(path)?;
        let overrides: BTreeMap<String, String> = serde_yaml::from_str(&contents)?;

        let mut library = Self::builtin();
        for (key, template) in overrides {
            let stage = ALL_STAGES
                .iter()
                .copied()
                .find(|s| s.template_key() == key)
                .ok_or(PromptError::UnknownStage(key))?;
            library.templates.insert(stage, template);
        }

        library.validate()?;
        Ok(library)
    }

    /// Replace one stage's template.
    pub fn with_template(mut self, stage: StageId, template: impl Into<String>) -> Self {
        self.templates.insert(stage, template.into());
        self
    }

    /// Check every stage has a template with exactly one `{report}` slot.
    pub fn validate(&self) -> Result<(), PromptError> {
        for stage in ALL_STAGES {
            let template = self
                .templates
                .get(&stage)
                .ok_or(PromptError::MissingTemplate(stage.template_key()))?;
            if template.matches("{report}").count() != 1 {
                return Err(PromptError::BadReportSlot(stage.template_key()));
            }
        }
        Ok(())
    }

    /// The raw template for a stage.
    pub fn template_for(&self, stage: StageId) -> Option<&str> {
        self.templates.get(&stage).map(String::as_str)
    }

    /// Substitute `report_text` into the stage's template.
    ///
    /// Falls back to the built-in template if a stage is absent, which
    /// cannot happen for a library that passed [`validate`](Self::validate).
    pub fn render(&self, stage: StageId, report_text: &str) -> String {
        let template = self
            .template_for(stage)
            .unwrap_or_else(|| builtin_template(stage));
        template.replace("{report}", report_text)
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}
