//! Reading rule cards and manifests from disk.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use rulecard_core::{CompileError, Manifest, Result, RuleCard};

use crate::schema::{self, ValidationIssue};

use super::result::{LoadResult, LoadStatus};
use super::safe_yaml::parse_safe;

/// A validated rule card and where it came from.
#[derive(Debug, Clone)]
pub struct LoadedCard {
    pub path: PathBuf,
    pub card: RuleCard,
    pub warnings: Vec<ValidationIssue>,
}

/// Read, safely parse and validate one rule card.
///
/// The path is expected to come from the resolver. Syntax errors surface as
/// [`CompileError::Parse`], contract violations as [`CompileError::Schema`].
pub fn load_card(path: &Path) -> Result<LoadedCard> {
    let bytes = fs::read(path).map_err(|e| CompileError::io(path, e))?;
    let value = parse_safe(path, &bytes)?;

    let warnings = schema::check_card(&value, path)?;
    for w in &warnings {
        warn!(path = %path.display(), field = %w.path, "{}", w.message);
    }

    // Validation guarantees the shape; anything serde still rejects is a
    // schema problem, not a parse problem.
    let card: RuleCard = serde_yaml::from_value(value).map_err(|e| {
        CompileError::Schema(rulecard_core::SchemaError {
            path: path.to_path_buf(),
            problems: vec![e.to_string()],
        })
    })?;

    debug!(rule_id = %card.id, path = %path.display(), "loaded rule card");
    Ok(LoadedCard {
        path: path.to_path_buf(),
        card,
        warnings,
    })
}

/// Read and structurally validate the agent manifest.
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let bytes = fs::read(path).map_err(|e| CompileError::io(path, e))?;
    let value = parse_safe(path, &bytes)?;
    let manifest: Manifest = serde_yaml::from_value(value)
        .map_err(|e| CompileError::Manifest(format!("{}: {}", path.display(), e)))?;
    manifest.validate()?;
    debug!(path = %path.display(), agents = manifest.agents.len(), "loaded manifest");
    Ok(manifest)
}

/// Check a list of card files independently, without stopping at the first
/// failure.
pub fn check_files(paths: &[PathBuf]) -> Vec<LoadResult> {
    paths
        .iter()
        .map(|path| {
            let status = match load_card(path) {
                Ok(loaded) => LoadStatus::Loaded {
                    rule_id: loaded.card.id,
                    warnings: loaded.warnings,
                },
                Err(e) => LoadStatus::Failed {
                    kind: e.kind(),
                    error: e.to_string(),
                },
            };
            LoadResult {
                path: path.clone(),
                status,
            }
        })
        .collect()
}
