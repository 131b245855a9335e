//! Alignment of predicted errors to reference errors.
//!
//! A prediction matches a reference error iff their normalized
//! `(type, location)` identity keys are equal, the same equivalence used by
//! consolidation dedup. Matching is a pure function: no I/O, and identical
//! inputs always produce identical output.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::{ErrorRecord, RecordError};

/// Matching cannot fail at runtime; an error here signals a caller bug.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("malformed record in {side}: {source}")]
    Precondition {
        /// Which input list held the malformed record.
        side: &'static str,
        source: RecordError,
    },
}

/// Aligned binary vectors for one (predictions, ground truth) pair.
///
/// Both flag vectors are indexed by ground-truth position and have equal
/// length. A reference error matched by several predictions counts once.
/// Predictions that match no reference error are tallied in
/// `unmatched_predictions` so conventional precision stays computable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// One flag per reference error; all true by construction.
    pub ground_truth_flags: Vec<bool>,

    /// True at index `i` iff some prediction matches reference error `i`.
    pub prediction_flags: Vec<bool>,

    /// Predictions whose identity matches no reference error.
    pub unmatched_predictions: usize,

    /// Total number of predictions supplied.
    pub total_predictions: usize,
}

impl MatchResult {
    /// Number of reference errors matched by at least one prediction.
    pub fn matched_count(&self) -> usize {
        self.prediction_flags.iter().filter(|&&f| f).count()
    }

    /// Number of predictions that matched some reference error.
    pub fn matched_predictions(&self) -> usize {
        self.total_predictions - self.unmatched_predictions
    }
}

/// Align `predictions` to `ground_truth`.
///
/// For each reference error the prediction list is scanned in original
/// order and the first identity match wins; scanning stops there. The
/// prediction set is pre-indexed by identity key, which leaves observable
/// behavior identical to the quadratic scan.
pub fn match_errors(
    predictions: &[ErrorRecord],
    ground_truth: &[ErrorRecord],
) -> Result<MatchResult, MatchError> {
    validate_side(predictions, "predictions")?;
    validate_side(ground_truth, "ground truth")?;

    let predicted: HashSet<(String, String)> =
        predictions.iter().map(|p| p.identity()).collect();
    let reference: HashSet<(String, String)> =
        ground_truth.iter().map(|g| g.identity()).collect();

    let prediction_flags: Vec<bool> = ground_truth
        .iter()
        .map(|g| predicted.contains(&g.identity()))
        .collect();

    let unmatched_predictions = predictions
        .iter()
        .filter(|p| !reference.contains(&p.identity()))
        .count();

    Ok(MatchResult {
        ground_truth_flags: vec![true; ground_truth.len()],
        prediction_flags,
        unmatched_predictions,
        total_predictions: predictions.len(),
    })
}

fn validate_side(records: &[ErrorRecord], side: &'static str) -> Result<(), MatchError> {
    for record in records {
        record
            .validate()
            .map_err(|source| MatchError::Precondition { side, source })?;
    }
    Ok(())
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_record() -> impl Strategy<Value = ErrorRecord> {
        let types = prop_oneof![Just("anatomical"), Just("measurement")];
        let locations = prop_oneof![
            Just("right kidney"),
            Just("left lobe"),
            Just("liver"),
            Just("impression"),
        ];
        (types, locations).prop_map(|(t, l)| ErrorRecord::new(t, l))
    }

    proptest! {
        /// Reordering the prediction list never changes which reference
        /// indices get matched.
        #[test]
        fn prediction_order_does_not_change_matches(
            predictions in proptest::collection::vec(arb_record(), 0..12),
            ground_truth in proptest::collection::vec(arb_record(), 1..8),
        ) {
            let baseline = match_errors(&predictions, &ground_truth).unwrap();

            let mut reversed = predictions.clone();
            reversed.reverse();
            let shuffled = match_errors(&reversed, &ground_truth).unwrap();

            prop_assert_eq!(baseline.prediction_flags, shuffled.prediction_flags);
            prop_assert_eq!(baseline.unmatched_predictions, shuffled.unmatched_predictions);
        }
    }
}
