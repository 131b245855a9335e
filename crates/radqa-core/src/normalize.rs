//! Text normalization shared by deduplication, matching, and ingestion.
//!
//! The identity fold here is the single equivalence notion used across the
//! crate: consolidation dedup and prediction-to-reference matching both
//! compare records through [`identity_fold`], so the two algorithms can
//! never drift apart.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();

    /// Number with optional decimals followed by a radiology unit.
    static ref MEASUREMENT: Regex =
        Regex::new(r"(?i)(\d+\.?\d*)\s*(mm|cm|ml|cc|Hz|HU)\b").unwrap();

    /// Common anatomical shorthand and its expansion.
    static ref SHORTHAND: Vec<(Regex, &'static str)> = vec![
        (Regex::new(r"(?i)\brt\b").unwrap(), "right"),
        (Regex::new(r"(?i)\blt\b").unwrap(), "left"),
        (Regex::new(r"(?i)\bant\b").unwrap(), "anterior"),
        (Regex::new(r"(?i)\bpost\b").unwrap(), "posterior"),
        (Regex::new(r"(?i)\bsup\b").unwrap(), "superior"),
        (Regex::new(r"(?i)\binf\b").unwrap(), "inferior"),
        (Regex::new(r"(?i)\bmed\b").unwrap(), "medial"),
        (Regex::new(r"(?i)\blat\b").unwrap(), "lateral"),
    ];

    static ref SECTION_CLINICAL: Regex =
        Regex::new(r"(?im)^\s*(?:CLINICAL|INDICATION|HISTORY)[^:\n]*:").unwrap();
    static ref SECTION_TECHNIQUE: Regex =
        Regex::new(r"(?im)^\s*(?:TECHNIQUE|PROCEDURE)[^:\n]*:").unwrap();
    static ref SECTION_FINDINGS: Regex =
        Regex::new(r"(?im)^\s*(?:FINDINGS|RESULT)[^:\n]*:").unwrap();
    static ref SECTION_IMPRESSION: Regex =
        Regex::new(r"(?im)^\s*(?:IMPRESSION|CONCLUSION|ASSESSMENT)[^:\n]*:").unwrap();
}

/// Fold a string for identity comparison: lowercase, collapse runs of
/// whitespace to single spaces, trim.
pub fn identity_fold(text: &str) -> String {
    WHITESPACE
        .replace_all(text.trim(), " ")
        .to_lowercase()
}

/// Expand common anatomical shorthand ("rt" to "right", "ant" to
/// "anterior") so location strings written tersely still fold together.
pub fn expand_anatomical_shorthand(text: &str) -> String {
    let mut expanded = text.to_string();
    for (pattern, replacement) in SHORTHAND.iter() {
        expanded = pattern.replace_all(&expanded, *replacement).into_owned();
    }
    expanded
}

/// A numeric measurement extracted from report text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub value: f64,
    pub unit: String,
}

/// Extract all measurements with units (mm, cm, ml, cc, Hz, HU) from text.
pub fn extract_measurements(text: &str) -> Vec<Measurement> {
    MEASUREMENT
        .captures_iter(text)
        .filter_map(|caps| {
            let value = caps.get(1)?.as_str().parse::<f64>().ok()?;
            let unit = caps.get(2)?.as_str().to_lowercase();
            Some(Measurement { value, unit })
        })
        .collect()
}

/// The standard sections of a radiology report.
///
/// Sections that do not appear in the text are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSections {
    pub clinical_info: String,
    pub technique: String,
    pub findings: String,
    pub impression: String,
}

/// Split a report into its standard sections by header.
pub fn extract_sections(report: &str) -> ReportSections {
    let headers = [
        &*SECTION_CLINICAL,
        &*SECTION_TECHNIQUE,
        &*SECTION_FINDINGS,
        &*SECTION_IMPRESSION,
    ];

    // Locate every header, then take each section's body as the text up to
    // the next header (any kind) or end of report.
    let mut boundaries: Vec<(usize, usize, usize)> = Vec::new();
    for (idx, header) in headers.iter().enumerate() {
        if let Some(m) = header.find(report) {
            boundaries.push((idx, m.start(), m.end()));
        }
    }
    boundaries.sort_by_key(|&(_, start, _)| start);

    let mut sections = ReportSections::default();
    for (i, &(idx, _, body_start)) in boundaries.iter().enumerate() {
        let body_end = boundaries
            .get(i + 1)
            .map(|&(_, next_start, _)| next_start)
            .unwrap_or(report.len());
        let body = report[body_start..body_end].trim().to_string();
        match idx {
            0 => sections.clinical_info = body,
            1 => sections.technique = body,
            2 => sections.findings = body,
            _ => sections.impression = body,
        }
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_fold() {
        assert_eq!(identity_fold("Right  Kidney"), "right kidney");
        assert_eq!(identity_fold("  left\tlobe \n"), "left lobe");
        assert_eq!(identity_fold("liver"), "liver");
    }

    #[test]
    fn test_expand_shorthand() {
        assert_eq!(
            expand_anatomical_shorthand("rt kidney, ant wall"),
            "right kidney, anterior wall"
        );
        assert_eq!(expand_anatomical_shorthand("lateral"), "lateral");
        // Word-boundary anchored: "part" is untouched
        assert_eq!(expand_anatomical_shorthand("upper part"), "upper part");
    }

    #[test]
    fn test_extract_measurements() {
        let found = extract_measurements("A 4.5 cm lesion with a 12mm satellite, density 40 HU.");
        assert_eq!(
            found,
            vec![
                Measurement { value: 4.5, unit: "cm".to_string() },
                Measurement { value: 12.0, unit: "mm".to_string() },
                Measurement { value: 40.0, unit: "hu".to_string() },
            ]
        );
    }

    #[test]
    fn test_extract_measurements_none() {
        assert!(extract_measurements("No focal lesion.").is_empty());
    }

    #[test]
    fn test_extract_sections() {
        let report = "CLINICAL HISTORY: Flank pain.\n\
                      TECHNIQUE: CT abdomen without contrast.\n\
                      FINDINGS: 4 mm calculus in the right kidney.\n\
                      IMPRESSION: Nephrolithiasis.";
        let sections = extract_sections(report);
        assert_eq!(sections.clinical_info, "Flank pain.");
        assert_eq!(sections.technique, "CT abdomen without contrast.");
        assert_eq!(sections.findings, "4 mm calculus in the right kidney.");
        assert_eq!(sections.impression, "Nephrolithiasis.");
    }

    #[test]
    fn test_extract_sections_missing_headers() {
        let sections = extract_sections("FINDINGS: Unremarkable study.");
        assert_eq!(sections.findings, "Unremarkable study.");
        assert!(sections.clinical_info.is_empty());
        assert!(sections.impression.is_empty());
    }
}
