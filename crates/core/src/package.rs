use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::card::ReducedRule;

/// Opaque per-agent policy copied from the manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Policy {
    pub targets: serde_json::Value,
    pub defaults: serde_json::Value,
}

/// The JSON artifact consumed by the runtime agent loader.
///
/// Field order is part of the output contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompiledPackage {
    pub name: String,
    pub description: String,
    pub version: String,
    pub build_date: String,
    pub source_digest: String,
    pub attribution: String,
    pub policy: Policy,
    pub rules: Vec<String>,
    pub rules_detail: Vec<ReducedRule>,
    pub validation_hooks: IndexMap<String, Vec<String>>,
}

impl CompiledPackage {
    /// Pretty JSON with a trailing newline, as written to disk.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }
}
