//! Per-file outcomes for standalone card checks.

use std::path::PathBuf;

use rulecard_core::ErrorKind;

use crate::schema::ValidationIssue;

/// Outcome of checking a single rule card file.
#[derive(Debug)]
pub struct LoadResult {
    pub path: PathBuf,
    pub status: LoadStatus,
}

#[derive(Debug)]
pub enum LoadStatus {
    /// Card parsed and passed validation, possibly with advisories.
    Loaded {
        rule_id: String,
        warnings: Vec<ValidationIssue>,
    },
    /// Parse, schema or security failure.
    Failed { kind: ErrorKind, error: String },
}

impl LoadResult {
    pub fn is_ok(&self) -> bool {
        matches!(self.status, LoadStatus::Loaded { .. })
    }
}
