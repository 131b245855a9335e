//! # radqa-core
//!
//! Deterministic matching and scoring engine for radiology report error
//! detection.
//!
//! This crate holds everything that does not need a language model: the
//! canonical [`ErrorRecord`] value, consolidation of per-stage error sets,
//! prediction-to-reference matching, and the agreement statistics derived
//! from matches.
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: same input always produces same output
//! 2. **No LLM calls**: detection lives in `radqa-runtime`, not here
//! 3. **One equivalence**: dedup and matching share the same normalized
//!    `(type, location)` identity
//! 4. **Parallel-safe**: every operation is a pure transformation over
//!    immutable inputs
//!
//! ## Example
//!
//! ```rust,ignore
//! use radqa_core::{evaluate, Dataset};
//!
//! let predictions = Dataset::from_json_file("predictions.json")?;
//! let reference = Dataset::from_json_file("reference.json")?;
//! let report = evaluate(&predictions.all_errors(), &reference.all_errors())?;
//! println!("recall {:.3}", report.overall.recall);
//! ```

pub mod consolidate;
pub mod dataset;
pub mod matching;
pub mod metrics;
pub mod normalize;
pub mod record;

// Re-export main types at crate root
pub use consolidate::{
    ConsolidatedResult, Consolidator, DuplicatePolicy, StageResult, FAILED_STAGE_SENTINEL,
};
pub use dataset::{AnnotatedReport, Dataset, DatasetError};
pub use matching::{match_errors, MatchError, MatchResult};
pub use metrics::{agreement, score, score_by_modality, score_by_type, Scores};
pub use record::{Confidence, ErrorRecord, ErrorType, RecordError, StageId, CANONICAL_TYPES};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Overall scores plus the per-type breakdown for one evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub overall: Scores,
    pub by_type: BTreeMap<String, Scores>,
}

/// Score a prediction set against a reference set, with the per-type
/// breakdown computed in the same pass.
///
/// This is the main entry point for offline evaluation; the individual
/// operations in [`metrics`] remain available for callers that need only
/// one of them.
pub fn evaluate(
    predictions: &[ErrorRecord],
    ground_truth: &[ErrorRecord],
) -> Result<EvaluationReport, MatchError> {
    Ok(EvaluationReport {
        overall: score(predictions, ground_truth)?,
        by_type: score_by_type(predictions, ground_truth)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate_reports_overall_and_by_type() {
        let ground_truth = vec![
            ErrorRecord::new("measurement", "right kidney"),
            ErrorRecord::new("anatomical", "left lobe"),
        ];
        let predictions = vec![ErrorRecord::new("measurement", "Right Kidney")];

        let report = evaluate(&predictions, &ground_truth).unwrap();

        assert_eq!(report.overall.recall, 0.5);
        assert_eq!(report.overall.precision, 1.0);
        assert_eq!(report.by_type["measurement"].recall, 1.0);
        assert_eq!(report.by_type["anatomical"].recall, 0.0);
    }

    #[test]
    fn test_evaluate_propagates_precondition_violations() {
        let malformed = vec![ErrorRecord::new("", "liver")];
        let reference = vec![ErrorRecord::new("measurement", "liver")];

        assert!(evaluate(&malformed, &reference).is_err());
    }
}
