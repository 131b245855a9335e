//! Canonical error values shared by the detection pipeline and the evaluator.
//!
//! An [`ErrorRecord`] is one detected or reference error, identified by its
//! normalized `(type, location)` pair. Explanation and confidence travel with
//! the record but are not part of its identity.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::normalize::identity_fold;

/// Validation errors for a single record.
///
/// A record missing its type or location is a caller bug, not a runtime
/// condition to recover from.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("error record is missing its type")]
    MissingType,

    #[error("error record is missing its location")]
    MissingLocation,
}

/// Reviewer confidence attached to a detected error.
///
/// Ordered so that `Low < Medium < High`, which makes confidence usable as a
/// tie-break key during consolidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Parse the free-text labels generation backends emit.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "high" => Some(Confidence::High),
            "medium" | "moderate" => Some(Confidence::Medium),
            "low" => Some(Confidence::Low),
            _ => None,
        }
    }

    /// Map a numeric 0-1 score into the three bands.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.7 {
            Confidence::High
        } else if score >= 0.4 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Confidence::Medium
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::High => write!(f, "high"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::Low => write!(f, "low"),
        }
    }
}

/// The conventional error-type vocabulary.
///
/// The vocabulary is open: any string is a valid type. These are the values
/// the six reasoning stages produce and the reference datasets use.
pub const CANONICAL_TYPES: [&str; 7] = [
    "anatomical",
    "measurement",
    "cross-sectional",
    "findings-impression",
    "completeness",
    "terminology",
    "unclassified",
];

/// An open-vocabulary error type tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorType(String);

impl ErrorType {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this type belongs to the conventional vocabulary.
    ///
    /// Checked at ingestion boundaries only; matching and scoring treat the
    /// type as an uninterpreted string.
    pub fn is_canonical(&self) -> bool {
        let folded = identity_fold(&self.0);
        CANONICAL_TYPES.contains(&folded.as_str())
    }

    /// The normalized form used for identity comparison.
    pub fn normalized(&self) -> String {
        identity_fold(&self.0)
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ErrorType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ErrorType {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identifies one reasoning pass over a report.
///
/// `Standard` is the single-pass mode. The six structured stages run in the
/// fixed order given by [`StageId::STRUCTURED_STAGES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Standard,
    AnatomicalValidation,
    MeasurementConsistency,
    CrossSectionalCorrelation,
    FindingsImpressionAlignment,
    ClinicalCompleteness,
    TerminologyAccuracy,
}

impl StageId {
    /// The six structured stages, in execution order.
    pub const STRUCTURED_STAGES: [StageId; 6] = [
        StageId::AnatomicalValidation,
        StageId::MeasurementConsistency,
        StageId::CrossSectionalCorrelation,
        StageId::FindingsImpressionAlignment,
        StageId::ClinicalCompleteness,
        StageId::TerminologyAccuracy,
    ];

    /// Slot index within the structured fan-out; `None` for `Standard`.
    pub fn ordinal(&self) -> Option<usize> {
        Self::STRUCTURED_STAGES.iter().position(|s| s == self)
    }

    /// Key under which this stage's reasoning appears in the trace map.
    pub fn trace_key(&self) -> &'static str {
        match self {
            StageId::Standard => "standard",
            StageId::AnatomicalValidation => "step_1",
            StageId::MeasurementConsistency => "step_2",
            StageId::CrossSectionalCorrelation => "step_3",
            StageId::FindingsImpressionAlignment => "step_4",
            StageId::ClinicalCompleteness => "step_5",
            StageId::TerminologyAccuracy => "step_6",
        }
    }

    /// Key used to look up this stage's instruction template.
    pub fn template_key(&self) -> &'static str {
        match self {
            StageId::Standard => "standard",
            StageId::AnatomicalValidation => "anatomical_validation",
            StageId::MeasurementConsistency => "measurement_consistency",
            StageId::CrossSectionalCorrelation => "cross_sectional",
            StageId::FindingsImpressionAlignment => "findings_impression",
            StageId::ClinicalCompleteness => "clinical_completeness",
            StageId::TerminologyAccuracy => "terminology_accuracy",
        }
    }

    /// The error type this stage characteristically produces.
    ///
    /// Used as a fallback when a parsed record carries no explicit type; the
    /// stage-to-type mapping is conventional, not enforced.
    pub fn default_error_type(&self) -> ErrorType {
        match self {
            StageId::Standard => ErrorType::new("unclassified"),
            StageId::AnatomicalValidation => ErrorType::new("anatomical"),
            StageId::MeasurementConsistency => ErrorType::new("measurement"),
            StageId::CrossSectionalCorrelation => ErrorType::new("cross-sectional"),
            StageId::FindingsImpressionAlignment => ErrorType::new("findings-impression"),
            StageId::ClinicalCompleteness => ErrorType::new("completeness"),
            StageId::TerminologyAccuracy => ErrorType::new("terminology"),
        }
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StageId::Standard => "standard error detection",
            StageId::AnatomicalValidation => "anatomical structure validation",
            StageId::MeasurementConsistency => "measurement consistency checking",
            StageId::CrossSectionalCorrelation => "cross-sectional correlation",
            StageId::FindingsImpressionAlignment => "findings-impression alignment",
            StageId::ClinicalCompleteness => "clinical completeness assessment",
            StageId::TerminologyAccuracy => "terminology accuracy",
        };
        write!(f, "{}", name)
    }
}

/// One detected or reference error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Error category (open vocabulary, see [`CANONICAL_TYPES`]).
    #[serde(rename = "type")]
    pub error_type: ErrorType,

    /// Where in the report the error sits. Structurally opaque; used only
    /// for identity comparison.
    pub location: String,

    /// Human-readable explanation.
    #[serde(default)]
    pub explanation: String,

    /// Reviewer confidence.
    #[serde(default)]
    pub confidence: Confidence,

    /// Stage that produced this record; absent for reference errors and
    /// standard-mode detections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_stage: Option<StageId>,
}

impl ErrorRecord {
    pub fn new(error_type: impl Into<ErrorType>, location: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            location: location.into(),
            explanation: String::new(),
            confidence: Confidence::default(),
            source_stage: None,
        }
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_stage(mut self, stage: StageId) -> Self {
        self.source_stage = Some(stage);
        self
    }

    /// The normalized `(type, location)` identity key.
    ///
    /// Two records with equal identity keys are duplicates of one another,
    /// and a prediction matches a reference error iff their keys are equal.
    pub fn identity(&self) -> (String, String) {
        (self.error_type.normalized(), identity_fold(&self.location))
    }

    /// Reject records that cannot participate in matching.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.error_type.as_str().trim().is_empty() {
            return Err(RecordError::MissingType);
        }
        if self.location.trim().is_empty() {
            return Err(RecordError::MissingLocation);
        }
        Ok(())
    }
}
