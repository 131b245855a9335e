//! Reference annotation loading.
//!
//! Datasets of annotated reports are validated here, at the ingestion
//! boundary; the matching and scoring core assumes records are well formed.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::ErrorRecord;

/// Errors that can occur when loading a dataset.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("failed to read dataset file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("dataset validation failed: {0}")]
    Invalid(String),
}

/// One annotated report: its errors plus optional modality and text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatedReport {
    pub id: String,

    /// Imaging modality (e.g. "CT", "MRI"); absent reports are excluded
    /// from per-modality scoring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modality: Option<String>,

    /// Full report text, when the dataset carries it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_text: Option<String>,

    #[serde(default)]
    pub errors: Vec<ErrorRecord>,
}

/// A collection of annotated reports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    pub reports: Vec<AnnotatedReport>,
}

impl Dataset {
    /// Parse a dataset from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, DatasetError> {
        let dataset: Dataset = serde_json::from_str(json)?;
        dataset.validate()?;
        Ok(dataset)
    }

    /// Parse a dataset from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, DatasetError> {
        let dataset: Dataset = serde_yaml::from_str(yaml)?;
        dataset.validate()?;
        Ok(dataset)
    }

    /// Parse a dataset from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parse a dataset from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load by file extension: `.yaml`/`.yml` as YAML, anything else JSON.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_file(path),
            _ => Self::from_json_file(path),
        }
    }

    fn validate(&self) -> Result<(), DatasetError> {
        let mut seen = std::collections::HashSet::new();

        for report in &self.reports {
            if report.id.is_empty() {
                return Err(DatasetError::Invalid("report with empty id".to_string()));
            }
            if !seen.insert(&report.id) {
                return Err(DatasetError::Invalid(format!(
                    "duplicate report id: {}",
                    report.id
                )));
            }

            for record in &report.errors {
                record.validate().map_err(|e| {
                    DatasetError::Invalid(format!("report {}: {}", report.id, e))
                })?;

                // Open vocabulary: unconventional types load, but get flagged.
                if !record.error_type.is_canonical() {
                    tracing::warn!(
                        report_id = %report.id,
                        error_type = %record.error_type,
                        "non-canonical error type in dataset"
                    );
                }
            }
        }

        Ok(())
    }

    /// Per-report error lists, keyed by report id.
    pub fn errors_by_report(&self) -> BTreeMap<String, Vec<ErrorRecord>> {
        self.reports
            .iter()
            .map(|r| (r.id.clone(), r.errors.clone()))
            .collect()
    }

    /// Report id to modality, for the reports that declare one.
    pub fn modalities(&self) -> BTreeMap<String, String> {
        self.reports
            .iter()
            .filter_map(|r| r.modality.clone().map(|m| (r.id.clone(), m)))
            .collect()
    }

    /// All errors across every report, in dataset order.
    pub fn all_errors(&self) -> Vec<ErrorRecord> {
        self.reports.iter().flat_map(|r| r.errors.clone()).collect()
    }
}
