use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::card::DEFAULT_SEVERITY;
use crate::error::{CompileError, Result};

/// What to do with successful packages when another agent failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Write every package that built.
    #[default]
    BestEffort,
    /// Write nothing unless every agent built.
    AllOrNothing,
}

/// Compiler configuration, passed explicitly; never read from the environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompilerConfig {
    /// Trusted root of the rule-card tree.
    #[serde(default = "default_source_root")]
    pub source_root: PathBuf,

    /// Directory packages are written into.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Topic alias -> subdirectory of `source_root`.
    #[serde(default)]
    pub topic_dirs: BTreeMap<String, String>,

    #[serde(default)]
    pub policy: FailurePolicy,

    /// Derive `version` from the VCS revision when the root is a checkout.
    #[serde(default = "default_true")]
    pub use_vcs: bool,

    /// Compile agents on the rayon pool.
    #[serde(default)]
    pub parallel: bool,

    #[serde(default = "default_severity")]
    pub default_severity: String,

    /// Build and check packages without writing them.
    #[serde(default)]
    pub validate_only: bool,
}

fn default_source_root() -> PathBuf {
    PathBuf::from("rule_cards")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_true() -> bool {
    true
}

fn default_severity() -> String {
    DEFAULT_SEVERITY.to_string()
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            source_root: default_source_root(),
            output_dir: default_output_dir(),
            topic_dirs: BTreeMap::new(),
            policy: FailurePolicy::default(),
            use_vcs: default_true(),
            parallel: false,
            default_severity: default_severity(),
            validate_only: false,
        }
    }
}

impl CompilerConfig {
    pub fn new(source_root: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        debug!(path = %path.display(), "loading config");
        let content = std::fs::read_to_string(path).map_err(|e| CompileError::io(path, e))?;
        toml::from_str(&content)
            .map_err(|e| CompileError::Config(format!("{}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = CompilerConfig::default();
        assert_eq!(cfg.policy, FailurePolicy::BestEffort);
        assert!(cfg.use_vcs);
        assert!(!cfg.parallel);
        assert_eq!(cfg.default_severity, "medium");
    }

    #[test]
    fn parses_partial_toml() {
        let cfg: CompilerConfig = toml::from_str(
            r#"
source_root = "cards"
policy = "all-or-nothing"
use_vcs = false

[topic_dirs]
jwt = "auth/jwt"
"#,
        )
        .unwrap();
        assert_eq!(cfg.source_root, PathBuf::from("cards"));
        assert_eq!(cfg.output_dir, PathBuf::from("dist"));
        assert_eq!(cfg.policy, FailurePolicy::AllOrNothing);
        assert!(!cfg.use_vcs);
        assert_eq!(cfg.topic_dirs["jwt"], "auth/jwt");
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::TempDir::new().unwrap();
        let cfg = CompilerConfig::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(cfg, CompilerConfig::default());
    }

    #[test]
    fn malformed_file_is_config_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "policy = [").unwrap();
        let err = CompilerConfig::load(&path).unwrap_err();
        assert!(matches!(err, CompileError::Config(_)));
    }
}
