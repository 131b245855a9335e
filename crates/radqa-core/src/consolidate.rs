//! Consolidation: merges per-stage error sets into one deduplicated result.
//!
//! Consolidation is the deterministic fan-in of the detection pipeline. The
//! orchestrator collects stage results in whatever order they complete;
//! this module re-imposes the fixed stage order before merging, so the
//! output never depends on completion order.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{ErrorRecord, StageId};

/// Reserved trace prefix marking a stage that failed and was skipped.
///
/// A caller can distinguish "stage found nothing" from "stage failed" only
/// by this marker, so successful traces must never start with it.
pub const FAILED_STAGE_SENTINEL: &str = "[stage-failed]";

/// Output of one reasoning stage: the errors it found plus its raw
/// reasoning text. Transient; discarded after consolidation except for the
/// retained trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: StageId,
    pub errors: Vec<ErrorRecord>,
    pub reasoning: String,
}

impl StageResult {
    pub fn new(stage: StageId, errors: Vec<ErrorRecord>, reasoning: impl Into<String>) -> Self {
        Self {
            stage,
            errors,
            reasoning: reasoning.into(),
        }
    }

    /// An empty result whose trace records the failure cause.
    pub fn failed(stage: StageId, cause: impl std::fmt::Display) -> Self {
        Self {
            stage,
            errors: Vec::new(),
            reasoning: format!("{} {}", FAILED_STAGE_SENTINEL, cause),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.reasoning.starts_with(FAILED_STAGE_SENTINEL)
    }
}

/// How to resolve two records with the same `(type, location)` identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Keep the earlier stage's record, including its explanation and
    /// confidence.
    #[default]
    FirstStageWins,

    /// Keep the first-seen position, but take the payload of the
    /// highest-confidence duplicate. Earlier stage wins ties.
    HighestConfidenceWins,
}

/// Consolidated output of one detection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidatedResult {
    /// Deduplicated errors, ordered by first-seen stage then original order.
    pub errors: Vec<ErrorRecord>,

    /// Stage trace key (`standard`, `step_1`..`step_6`) to reasoning text.
    pub reasoning_trace: BTreeMap<String, String>,

    /// Always equals `errors.len()`.
    pub error_count: usize,

    pub detected_at: DateTime<Utc>,
}

impl ConsolidatedResult {
    /// Trace keys whose stage failed and was skipped.
    pub fn failed_stages(&self) -> Vec<&str> {
        self.reasoning_trace
            .iter()
            .filter(|(_, trace)| trace.starts_with(FAILED_STAGE_SENTINEL))
            .map(|(key, _)| key.as_str())
            .collect()
    }
}

/// Merges stage results under a configured [`DuplicatePolicy`].
#[derive(Debug, Clone, Default)]
pub struct Consolidator {
    policy: DuplicatePolicy,
}

impl Consolidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self { policy }
    }

    /// Merge stage results into a deduplicated [`ConsolidatedResult`].
    ///
    /// Results are first sorted into fixed stage order, so callers may pass
    /// them in completion order. Duplicate identities resolve per the
    /// configured policy; the kept record always occupies the first-seen
    /// position.
    pub fn consolidate(&self, mut results: Vec<StageResult>) -> ConsolidatedResult {
        results.sort_by_key(|r| r.stage);

        let mut errors: Vec<ErrorRecord> = Vec::new();
        let mut seen: HashMap<(String, String), usize> = HashMap::new();
        let mut reasoning_trace = BTreeMap::new();

        for result in results {
            reasoning_trace.insert(result.stage.trace_key().to_string(), result.reasoning);

            for record in result.errors {
                let key = record.identity();
                match seen.get(&key) {
                    None => {
                        seen.insert(key, errors.len());
                        errors.push(record);
                    }
                    Some(&index) => {
                        if self.policy == DuplicatePolicy::HighestConfidenceWins
                            && record.confidence > errors[index].confidence
                        {
                            errors[index] = record;
                        }
                    }
                }
            }
        }

        let error_count = errors.len();
        ConsolidatedResult {
            errors,
            reasoning_trace,
            error_count,
            detected_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Confidence;

    fn record(error_type: &str, location: &str, stage: StageId) -> ErrorRecord {
        ErrorRecord::new(error_type, location).with_stage(stage)
    }

    #[test]
    fn test_dedup_keeps_one_per_identity() {
        let results = vec![
            StageResult::new(
                StageId::AnatomicalValidation,
                vec![record("anatomical", "left kidney", StageId::AnatomicalValidation)],
                "step 1 reasoning",
            ),
            StageResult::new(
                StageId::TerminologyAccuracy,
                vec![
                    record("anatomical", "Left  Kidney", StageId::TerminologyAccuracy),
                    record("terminology", "impression", StageId::TerminologyAccuracy),
                ],
                "step 6 reasoning",
            ),
        ];

        let result = Consolidator::new().consolidate(results);

        assert_eq!(result.error_count, 2);
        assert_eq!(result.errors.len(), 2);
        // First occurrence wins; the kept record comes from step 1.
        assert_eq!(
            result.errors[0].source_stage,
            Some(StageId::AnatomicalValidation)
        );
    }

    #[test]
    fn test_error_count_matches_distinct_identities() {
        let duplicates = vec![
            record("measurement", "right kidney", StageId::MeasurementConsistency),
            record("measurement", "RIGHT KIDNEY", StageId::MeasurementConsistency),
            record("measurement", "right  kidney", StageId::MeasurementConsistency),
        ];
        let result = Consolidator::new().consolidate(vec![StageResult::new(
            StageId::MeasurementConsistency,
            duplicates,
            "r",
        )]);

        assert_eq!(result.error_count, 1);
    }

    #[test]
    fn test_completion_order_does_not_affect_output() {
        let in_order: Vec<StageResult> = StageId::STRUCTURED_STAGES
            .iter()
            .map(|&stage| {
                StageResult::new(
                    stage,
                    vec![record("measurement", "liver", stage)],
                    format!("reasoning for {}", stage.trace_key()),
                )
            })
            .collect();

        let mut scrambled = in_order.clone();
        scrambled.reverse();
        scrambled.swap(1, 4);

        let a = Consolidator::new().consolidate(in_order);
        let b = Consolidator::new().consolidate(scrambled);

        assert_eq!(a.errors, b.errors);
        assert_eq!(a.reasoning_trace, b.reasoning_trace);
        assert_eq!(
            a.reasoning_trace.keys().collect::<Vec<_>>(),
            vec!["step_1", "step_2", "step_3", "step_4", "step_5", "step_6"]
        );
    }

    #[test]
    fn test_first_stage_wins_keeps_early_payload() {
        let results = vec![
            StageResult::new(
                StageId::AnatomicalValidation,
                vec![record("anatomical", "spleen", StageId::AnatomicalValidation)
                    .with_confidence(Confidence::Low)
                    .with_explanation("early")],
                "r1",
            ),
            StageResult::new(
                StageId::ClinicalCompleteness,
                vec![record("anatomical", "spleen", StageId::ClinicalCompleteness)
                    .with_confidence(Confidence::High)
                    .with_explanation("late")],
                "r5",
            ),
        ];

        let result = Consolidator::new().consolidate(results);
        assert_eq!(result.errors[0].explanation, "early");
        assert_eq!(result.errors[0].confidence, Confidence::Low);
    }

    #[test]
    fn test_highest_confidence_wins_replaces_payload_in_place() {
        let results = vec![
            StageResult::new(
                StageId::AnatomicalValidation,
                vec![
                    record("anatomical", "spleen", StageId::AnatomicalValidation)
                        .with_confidence(Confidence::Low)
                        .with_explanation("early"),
                    record("anatomical", "liver", StageId::AnatomicalValidation),
                ],
                "r1",
            ),
            StageResult::new(
                StageId::ClinicalCompleteness,
                vec![record("anatomical", "spleen", StageId::ClinicalCompleteness)
                    .with_confidence(Confidence::High)
                    .with_explanation("late")],
                "r5",
            ),
        ];

        let result =
            Consolidator::with_policy(DuplicatePolicy::HighestConfidenceWins).consolidate(results);

        // Position stays first-seen, payload comes from the stronger record.
        assert_eq!(result.errors[0].explanation, "late");
        assert_eq!(result.errors[0].confidence, Confidence::High);
        assert_eq!(result.errors[1].location, "liver");
    }

    #[test]
    fn test_failed_stage_sentinel() {
        let results = vec![
            StageResult::new(StageId::AnatomicalValidation, vec![], "clean reasoning"),
            StageResult::failed(StageId::MeasurementConsistency, "generation timed out"),
        ];

        let result = Consolidator::new().consolidate(results);

        assert_eq!(result.failed_stages(), vec!["step_2"]);
        let trace = &result.reasoning_trace["step_2"];
        assert!(trace.starts_with(FAILED_STAGE_SENTINEL));
        assert!(trace.contains("generation timed out"));
        assert!(!result.reasoning_trace["step_1"].starts_with(FAILED_STAGE_SENTINEL));
    }

    #[test]
    fn test_standard_mode_pass_through() {
        let result = Consolidator::new().consolidate(vec![StageResult::new(
            StageId::Standard,
            vec![ErrorRecord::new("unclassified", "findings")],
            "single pass reasoning",
        )]);

        assert_eq!(result.error_count, 1);
        assert_eq!(
            result.reasoning_trace.keys().collect::<Vec<_>>(),
            vec!["standard"]
        );
    }
}
