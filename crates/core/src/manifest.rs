//! Agent manifest: which rule-card topics make up each compiled package.

use std::collections::{BTreeMap, HashSet};
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CompileError, Result};

/// Attribution stamped into packages whose manifest does not provide one.
pub const DEFAULT_ATTRIBUTION: &str =
    "Rule cards derived from OWASP and ASVS guidance, licensed CC BY-SA 4.0";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    pub agents: Vec<AgentDefinition>,
    #[serde(default)]
    pub attribution: Option<String>,
    /// Topic alias -> subdirectory of the source root, merged over the
    /// configured map.
    #[serde(default)]
    pub topic_dirs: BTreeMap<String, String>,
}

/// One manifest entry, compiled into one package.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub topics: Vec<String>,
    #[serde(default = "default_scope_selectors")]
    pub scope_selectors: Vec<String>,
    #[serde(default = "empty_array")]
    pub targets: serde_json::Value,
    #[serde(default = "empty_object")]
    pub defaults: serde_json::Value,
    #[serde(default)]
    pub output_file: Option<String>,
}

fn default_scope_selectors() -> Vec<String> {
    vec!["*".to_string()]
}

fn empty_array() -> serde_json::Value {
    serde_json::Value::Array(Vec::new())
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl AgentDefinition {
    /// File name of the package, `<name>.json` unless set explicitly.
    pub fn output_file(&self) -> String {
        self.output_file
            .clone()
            .unwrap_or_else(|| format!("{}.json", self.name))
    }
}

impl Manifest {
    pub fn attribution(&self) -> &str {
        self.attribution.as_deref().unwrap_or(DEFAULT_ATTRIBUTION)
    }

    pub fn agent(&self, name: &str) -> Option<&AgentDefinition> {
        self.agents.iter().find(|a| a.name == name)
    }

    /// Structural checks that must hold before any agent is compiled.
    ///
    /// Path safety of topics and output files is checked later, per agent.
    pub fn validate(&self) -> Result<()> {
        if self.agents.is_empty() {
            return Err(CompileError::Manifest("no agents defined".to_string()));
        }

        let mut names = HashSet::new();
        let mut outputs = HashSet::new();
        for (i, agent) in self.agents.iter().enumerate() {
            if agent.name.trim().is_empty() {
                return Err(CompileError::Manifest(format!("agents[{i}].name is empty")));
            }
            if !names.insert(agent.name.as_str()) {
                return Err(CompileError::Manifest(format!(
                    "duplicate agent name '{}'",
                    agent.name
                )));
            }
            if agent.topics.is_empty() {
                return Err(CompileError::Manifest(format!(
                    "agent '{}' has no topics",
                    agent.name
                )));
            }
            let output = agent.output_file();
            if !outputs.insert(normalize_output(&output)) {
                return Err(CompileError::Manifest(format!(
                    "output file '{}' is used by more than one agent",
                    output
                )));
            }
        }
        Ok(())
    }
}

/// Lexical form used to compare output files: `.` parts and repeated
/// separators do not make two names distinct.
fn normalize_output(output: &str) -> PathBuf {
    Path::new(output)
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
