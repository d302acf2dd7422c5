//! Per-agent outcomes accumulated over one compile run.

use std::path::PathBuf;

use serde::Serialize;

use rulecard_core::{CompileError, ErrorKind};

/// Why one agent's package was not produced.
///
/// Serialized inside an [`AgentOutcome`], which already carries the agent.
#[derive(Debug, Clone, Serialize)]
pub struct AgentFailure {
    #[serde(skip_serializing)]
    pub agent: String,
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    pub message: String,
}

impl AgentFailure {
    pub fn from_error(agent: &str, err: &CompileError) -> Self {
        Self {
            agent: agent.to_string(),
            kind: err.kind(),
            file: err.file().map(|p| p.to_path_buf()),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AgentStatus {
    /// Package written to `path`.
    Written { path: PathBuf, rules: usize },
    /// Package built in validate-only mode; nothing written.
    Validated { rules: usize },
    /// Package built but withheld because another agent failed under
    /// the all-or-nothing policy.
    Withheld { rules: usize },
    Failed(AgentFailure),
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentOutcome {
    pub agent: String,
    #[serde(flatten)]
    pub status: AgentStatus,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CompileReport {
    pub outcomes: Vec<AgentOutcome>,
}

impl CompileReport {
    /// True when no agent failed.
    pub fn success(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn failures(&self) -> impl Iterator<Item = &AgentFailure> {
        self.outcomes.iter().filter_map(|o| match &o.status {
            AgentStatus::Failed(f) => Some(f),
            _ => None,
        })
    }

    pub fn written(&self) -> impl Iterator<Item = &PathBuf> {
        self.outcomes.iter().filter_map(|o| match &o.status {
            AgentStatus::Written { path, .. } => Some(path),
            _ => None,
        })
    }

    pub fn outcome(&self, agent: &str) -> Option<&AgentOutcome> {
        self.outcomes.iter().find(|o| o.agent == agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_reflects_any_failure() {
        let mut report = CompileReport::default();
        report.outcomes.push(AgentOutcome {
            agent: "a".into(),
            status: AgentStatus::Validated { rules: 2 },
        });
        assert!(report.success());

        let err = CompileError::Manifest("boom".into());
        report.outcomes.push(AgentOutcome {
            agent: "b".into(),
            status: AgentStatus::Failed(AgentFailure::from_error("b", &err)),
        });
        assert!(!report.success());
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.written().count(), 0);
    }

    #[test]
    fn outcome_serializes_flat() {
        let outcome = AgentOutcome {
            agent: "web".into(),
            status: AgentStatus::Written {
                path: PathBuf::from("dist/web.json"),
                rules: 3,
            },
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"agent": "web", "status": "written", "path": "dist/web.json", "rules": 3})
        );
    }

    #[test]
    fn failed_outcome_names_agent_once() {
        let err = CompileError::Manifest("x".into());
        let outcome = AgentOutcome {
            agent: "web".into(),
            status: AgentStatus::Failed(AgentFailure::from_error("web", &err)),
        };
        let text = serde_json::to_string(&outcome).unwrap();
        assert_eq!(text.matches("\"agent\"").count(), 1, "{text}");
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&text).unwrap(),
            serde_json::json!({
                "agent": "web",
                "status": "failed",
                "kind": "compiler",
                "message": "invalid manifest: x"
            })
        );
    }
}
