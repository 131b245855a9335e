//! Extraction of error records from stage completions.
//!
//! A completion either carries structured marker groups (one
//! `Error type:` line opening each group, with `Location:`,
//! `Explanation:`, and `Confidence:` lines following) or it is treated as
//! a bare reasoning trace with no records. Marker matching tolerates
//! numbering, bullets, and case noise.

use lazy_static::lazy_static;
use regex::Regex;

use radqa_core::{Confidence, ErrorRecord, StageId, StageResult};

lazy_static! {
    static ref TYPE_LINE: Regex =
        Regex::new(r"(?im)^\s*(?:\d+[.)]\s*)?(?:[-*]\s*)?error\s*type\s*:\s*(.+?)\s*$").unwrap();
    static ref LOCATION_LINE: Regex =
        Regex::new(r"(?im)^\s*(?:[-*]\s*)?location\s*:\s*(.+?)\s*$").unwrap();
    static ref EXPLANATION_LINE: Regex =
        Regex::new(r"(?im)^\s*(?:[-*]\s*)?explanation\s*:\s*(.+?)\s*$").unwrap();
    static ref CONFIDENCE_LINE: Regex =
        Regex::new(r"(?im)^\s*(?:[-*]\s*)?confidence\s*:\s*(.+?)\s*$").unwrap();
}

/// Parse one stage's completion into a [`StageResult`].
///
/// The full completion text is retained as the reasoning trace either way.
/// A marker group without a `Location:` line is dropped: a record with no
/// location cannot participate in deduplication or matching.
pub fn parse_stage_response(stage: StageId, text: &str) -> StageResult {
    let starts: Vec<(usize, String)> = TYPE_LINE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let value = caps.get(1)?.as_str().trim().to_string();
            Some((whole.start(), value))
        })
        .collect();

    if starts.is_empty() {
        return StageResult::new(stage, Vec::new(), text);
    }

    let mut errors = Vec::new();
    for (i, (start, type_value)) in starts.iter().enumerate() {
        let end = starts
            .get(i + 1)
            .map(|(next_start, _)| *next_start)
            .unwrap_or(text.len());
        let block = &text[*start..end];

        let location = match first_capture(&LOCATION_LINE, block) {
            Some(location) => location,
            None => {
                tracing::debug!(stage = %stage, "marker group without location dropped");
                continue;
            }
        };

        let error_type = if type_value.is_empty() {
            stage.default_error_type()
        } else {
            type_value.as_str().into()
        };

        let confidence = first_capture(&CONFIDENCE_LINE, block)
            .and_then(|label| Confidence::parse(&label))
            .unwrap_or_default();

        let mut record = ErrorRecord::new(error_type, location)
            .with_confidence(confidence)
            .with_stage(stage);
        if let Some(explanation) = first_capture(&EXPLANATION_LINE, block) {
            record = record.with_explanation(explanation);
        }

        errors.push(record);
    }

    StageResult::new(stage, errors, text)
}

fn first_capture(pattern: &Regex, block: &str) -> Option<String> {
    pattern
        .captures(block)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_response_extracts_records() {
        let text = "\
The report contains two problems.

1. Error type: measurement
   Location: right kidney
   Explanation: 4.5 m is not a plausible renal length
   Confidence: high

2. Error type: anatomical
   Location: left lobe
   Explanation: laterality contradicts the findings section
   Confidence: medium
";
        let result = parse_stage_response(StageId::MeasurementConsistency, text);

        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.errors[0].error_type.as_str(), "measurement");
        assert_eq!(result.errors[0].location, "right kidney");
        assert_eq!(result.errors[0].confidence, Confidence::High);
        assert_eq!(
            result.errors[0].source_stage,
            Some(StageId::MeasurementConsistency)
        );
        assert_eq!(result.errors[1].confidence, Confidence::Medium);
        assert_eq!(result.reasoning, text);
    }

    #[test]
    fn test_unmarked_response_is_trace_only() {
        let text = "The report is clean for this check. All measurements carry units.";
        let result = parse_stage_response(StageId::MeasurementConsistency, text);

        assert!(result.errors.is_empty());
        assert_eq!(result.reasoning, text);
        assert!(!result.is_failed());
    }

    #[test]
    fn test_marker_case_and_bullets_tolerated() {
        let text = "\
- ERROR TYPE: terminology
  LOCATION: impression
  CONFIDENCE: LOW
";
        let result = parse_stage_response(StageId::TerminologyAccuracy, text);

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].error_type.as_str(), "terminology");
        assert_eq!(result.errors[0].confidence, Confidence::Low);
    }

    #[test]
    fn test_missing_confidence_defaults_to_medium() {
        let text = "Error type: completeness\nLocation: impression\n";
        let result = parse_stage_response(StageId::ClinicalCompleteness, text);
        assert_eq!(result.errors[0].confidence, Confidence::Medium);
    }

    #[test]
    fn test_group_without_location_is_dropped() {
        let text = "\
Error type: completeness
Explanation: no follow-up recommendation

Error type: terminology
Location: impression
";
        let result = parse_stage_response(StageId::ClinicalCompleteness, text);

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].location, "impression");
    }

    #[test]
    fn test_explanation_is_optional() {
        let text = "Error type: anatomical\nLocation: spleen\nConfidence: high\n";
        let result = parse_stage_response(StageId::AnatomicalValidation, text);
        assert!(result.errors[0].explanation.is_empty());
    }
}
