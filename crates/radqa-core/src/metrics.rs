//! Agreement statistics over match results.
//!
//! Every operation here is a pure transformation built on
//! [`match_errors`](crate::matching::match_errors); arbitrarily many
//! evaluations can run concurrently over different report pairs.
//!
//! Precision is conventional: matched predictions over all predictions,
//! using the unmatched-prediction count the match engine tracks. Recall is
//! matched reference errors over all reference errors. Degenerate
//! denominators score 0.0.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::matching::{match_errors, MatchError, MatchResult};
use crate::record::ErrorRecord;

/// Precision, recall, and F1 for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl Scores {
    fn from_match(result: &MatchResult) -> Self {
        let recall = if result.ground_truth_flags.is_empty() {
            0.0
        } else {
            result.matched_count() as f64 / result.ground_truth_flags.len() as f64
        };

        let precision = if result.total_predictions == 0 {
            0.0
        } else {
            result.matched_predictions() as f64 / result.total_predictions as f64
        };

        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self { precision, recall, f1 }
    }
}

/// Score one prediction set against one reference set.
pub fn score(
    predictions: &[ErrorRecord],
    ground_truth: &[ErrorRecord],
) -> Result<Scores, MatchError> {
    let result = match_errors(predictions, ground_truth)?;
    Ok(Scores::from_match(&result))
}

/// Score each error type independently.
///
/// The partition is defined by the set of normalized types present in the
/// reference set; a type with no predictions scores zero recall. Prediction
/// types absent from the references contribute nothing here (they already
/// lower overall precision in [`score`]).
pub fn score_by_type(
    predictions: &[ErrorRecord],
    ground_truth: &[ErrorRecord],
) -> Result<BTreeMap<String, Scores>, MatchError> {
    let types: BTreeSet<String> = ground_truth
        .iter()
        .map(|g| g.error_type.normalized())
        .collect();

    let mut results = BTreeMap::new();
    for error_type in types {
        let type_predictions: Vec<ErrorRecord> = predictions
            .iter()
            .filter(|p| p.error_type.normalized() == error_type)
            .cloned()
            .collect();
        let type_ground_truth: Vec<ErrorRecord> = ground_truth
            .iter()
            .filter(|g| g.error_type.normalized() == error_type)
            .cloned()
            .collect();

        results.insert(error_type, score(&type_predictions, &type_ground_truth)?);
    }

    Ok(results)
}

/// Score reports grouped by imaging modality.
///
/// Report ids are grouped through `modality_by_report`; the per-report
/// error lists inside each group are flattened and scored together.
/// Reports with no modality entry are excluded and warned about.
pub fn score_by_modality(
    predictions_by_report: &BTreeMap<String, Vec<ErrorRecord>>,
    ground_truth_by_report: &BTreeMap<String, Vec<ErrorRecord>>,
    modality_by_report: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, Scores>, MatchError> {
    for report_id in predictions_by_report
        .keys()
        .chain(ground_truth_by_report.keys())
    {
        if !modality_by_report.contains_key(report_id) {
            tracing::warn!(%report_id, "report has no modality entry, excluded from scoring");
        }
    }

    let mut groups: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (report_id, modality) in modality_by_report {
        groups
            .entry(modality.as_str())
            .or_default()
            .push(report_id.as_str());
    }

    let mut results = BTreeMap::new();
    for (modality, report_ids) in groups {
        let flat_predictions: Vec<ErrorRecord> = report_ids
            .iter()
            .filter_map(|id| predictions_by_report.get(*id))
            .flatten()
            .cloned()
            .collect();
        let flat_ground_truth: Vec<ErrorRecord> = report_ids
            .iter()
            .filter_map(|id| ground_truth_by_report.get(*id))
            .flatten()
            .cloned()
            .collect();

        results.insert(
            modality.to_string(),
            score(&flat_predictions, &flat_ground_truth)?,
        );
    }

    Ok(results)
}

/// Inter-model agreement via Cohen's kappa.
///
/// Each model's predictions are matched against the same reference set,
/// producing two binary vectors over the same index space; kappa quantifies
/// whether the models agree on which reference errors are real, independent
/// of whether either is correct.
pub fn agreement(
    predictions_a: &[ErrorRecord],
    predictions_b: &[ErrorRecord],
    ground_truth: &[ErrorRecord],
) -> Result<f64, MatchError> {
    let a = match_errors(predictions_a, ground_truth)?;
    let b = match_errors(predictions_b, ground_truth)?;
    Ok(cohens_kappa(&a.prediction_flags, &b.prediction_flags))
}

/// Cohen's kappa between two equal-length binary vectors.
///
/// When expected agreement is 1.0 (both raters constant) the statistic is
/// undefined; identical vectors score 1.0 and differing vectors 0.0.
fn cohens_kappa(a: &[bool], b: &[bool]) -> f64 {
    let n = a.len();
    if n == 0 {
        return 1.0;
    }

    let observed = a.iter().zip(b).filter(|(x, y)| x == y).count() as f64 / n as f64;

    let a_yes = a.iter().filter(|&&f| f).count() as f64 / n as f64;
    let b_yes = b.iter().filter(|&&f| f).count() as f64 / n as f64;
    let expected = a_yes * b_yes + (1.0 - a_yes) * (1.0 - b_yes);

    if (1.0 - expected).abs() < f64::EPSILON {
        return if observed >= 1.0 { 1.0 } else { 0.0 };
    }

    (observed - expected) / (1.0 - expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(error_type: &str, location: &str) -> ErrorRecord {
        ErrorRecord::new(error_type, location)
    }

    #[test]
    fn test_score_against_self_is_perfect() {
        let set = vec![
            record("anatomical", "left kidney"),
            record("measurement", "liver"),
        ];

        let scores = score(&set, &set).unwrap();
        assert_eq!(scores.precision, 1.0);
        assert_eq!(scores.recall, 1.0);
        assert_eq!(scores.f1, 1.0);
    }

    #[test]
    fn test_empty_predictions_score_zero_recall() {
        let ground_truth = vec![record("measurement", "liver")];
        let scores = score(&[], &ground_truth).unwrap();
        assert_eq!(scores.recall, 0.0);
        assert_eq!(scores.precision, 0.0);
        assert_eq!(scores.f1, 0.0);
    }

    #[test]
    fn test_case_differing_prediction_scores_full_recall() {
        let ground_truth = vec![record("measurement", "right kidney")];
        let predictions = vec![record("measurement", "Right Kidney")];

        let scores = score(&predictions, &ground_truth).unwrap();
        assert_eq!(scores.recall, 1.0);
    }

    #[test]
    fn test_unmatched_predictions_lower_precision() {
        let ground_truth = vec![record("measurement", "liver")];
        let predictions = vec![
            record("measurement", "liver"),
            record("anatomical", "spleen"),
        ];

        let scores = score(&predictions, &ground_truth).unwrap();
        assert_eq!(scores.recall, 1.0);
        assert_eq!(scores.precision, 0.5);
        assert!((scores.f1 - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_by_type_partitions_on_ground_truth_types() {
        let ground_truth = vec![
            record("anatomical", "left kidney"),
            record("measurement", "liver"),
            record("measurement", "aorta"),
        ];
        let predictions = vec![
            record("measurement", "liver"),
            // Type not present in the references: defines no partition.
            record("terminology", "impression"),
        ];

        let by_type = score_by_type(&predictions, &ground_truth).unwrap();

        assert_eq!(
            by_type.keys().collect::<Vec<_>>(),
            vec!["anatomical", "measurement"]
        );
        assert_eq!(by_type["anatomical"].recall, 0.0);
        assert_eq!(by_type["measurement"].recall, 0.5);
        assert_eq!(by_type["measurement"].precision, 1.0);
    }

    #[test]
    fn test_score_by_modality_groups_and_flattens() {
        let mut predictions = BTreeMap::new();
        predictions.insert("r1".to_string(), vec![record("measurement", "liver")]);
        predictions.insert("r2".to_string(), vec![record("anatomical", "spleen")]);

        let mut ground_truth = BTreeMap::new();
        ground_truth.insert("r1".to_string(), vec![record("measurement", "liver")]);
        ground_truth.insert("r2".to_string(), vec![record("anatomical", "left lobe")]);
        ground_truth.insert("r3".to_string(), vec![record("terminology", "impression")]);

        let mut modalities = BTreeMap::new();
        modalities.insert("r1".to_string(), "CT".to_string());
        modalities.insert("r2".to_string(), "MRI".to_string());
        modalities.insert("r3".to_string(), "CT".to_string());

        let by_modality =
            score_by_modality(&predictions, &ground_truth, &modalities).unwrap();

        // CT group flattens r1 and r3: one of two references matched.
        assert_eq!(by_modality["CT"].recall, 0.5);
        assert_eq!(by_modality["MRI"].recall, 0.0);
    }

    #[test]
    fn test_score_by_modality_excludes_unknown_reports() {
        let mut predictions = BTreeMap::new();
        predictions.insert("known".to_string(), vec![record("measurement", "liver")]);
        predictions.insert("unknown".to_string(), vec![record("anatomical", "spleen")]);

        let mut ground_truth = BTreeMap::new();
        ground_truth.insert("known".to_string(), vec![record("measurement", "liver")]);
        ground_truth.insert("unknown".to_string(), vec![record("anatomical", "spleen")]);

        let mut modalities = BTreeMap::new();
        modalities.insert("known".to_string(), "CT".to_string());

        let by_modality =
            score_by_modality(&predictions, &ground_truth, &modalities).unwrap();

        assert_eq!(by_modality.len(), 1);
        assert_eq!(by_modality["CT"].recall, 1.0);
    }

    #[test]
    fn test_agreement_perfect_when_same_subset_matched() {
        let ground_truth = vec![
            record("anatomical", "left kidney"),
            record("measurement", "liver"),
            record("terminology", "impression"),
        ];
        // Both models match exactly the first two references.
        let predictions_a = vec![
            record("anatomical", "left kidney"),
            record("measurement", "liver"),
        ];
        let predictions_b = vec![
            record("measurement", "LIVER"),
            record("anatomical", "Left Kidney"),
        ];

        let kappa = agreement(&predictions_a, &predictions_b, &ground_truth).unwrap();
        assert_eq!(kappa, 1.0);
    }

    #[test]
    fn test_agreement_complete_disagreement_is_negative() {
        let ground_truth = vec![
            record("anatomical", "left kidney"),
            record("measurement", "liver"),
        ];
        let predictions_a = vec![record("anatomical", "left kidney")];
        let predictions_b = vec![record("measurement", "liver")];

        let kappa = agreement(&predictions_a, &predictions_b, &ground_truth).unwrap();
        assert_eq!(kappa, -1.0);
    }

    #[test]
    fn test_kappa_constant_raters() {
        // Both raters flag everything: expected agreement is 1.0, vectors
        // identical, kappa pinned to 1.0.
        assert_eq!(cohens_kappa(&[true, true], &[true, true]), 1.0);
        // Observed agreement at chance level scores 0.0.
        assert_eq!(cohens_kappa(&[true, true], &[true, false]), 0.0);
    }

    #[test]
    fn test_kappa_empty_vectors() {
        assert_eq!(cohens_kappa(&[], &[]), 1.0);
    }
}
