//! Compiler driver: manifest in, one JSON package per agent out.
//!
//! Agents are independent. A failure while building one agent is recorded in
//! the [`CompileReport`] and does not stop the others; only an unreadable
//! manifest or source root aborts the whole run. Packages are assembled fully
//! in memory before anything is written.

mod package;
mod report;

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{error, info, warn};

use rulecard_core::{
    AgentDefinition, CompileError, CompiledPackage, CompilerConfig, FailurePolicy, Manifest,
    Result,
};

use crate::digest::BuildStamp;
use crate::loader;
use crate::resolver::{ensure_within, validate_selector, Resolver};

pub use self::package::{build_package, BuildContext};
pub use self::report::{AgentFailure, AgentOutcome, AgentStatus, CompileReport};

pub struct Compiler {
    config: CompilerConfig,
    stamp: Option<BuildStamp>,
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self {
            config,
            stamp: None,
        }
    }

    /// Use a fixed build stamp instead of reading the clock and VCS.
    pub fn with_stamp(mut self, stamp: BuildStamp) -> Self {
        self.stamp = Some(stamp);
        self
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Read and validate a manifest. Errors here are fatal to the run.
    pub fn load_manifest(&self, path: &Path) -> Result<Manifest> {
        loader::load_manifest(path)
    }

    /// Shared state for every agent in `manifest`.
    pub fn context(&self, manifest: &Manifest) -> Result<BuildContext> {
        let mut topic_dirs = self.config.topic_dirs.clone();
        topic_dirs.extend(manifest.topic_dirs.clone());
        let resolver = Resolver::new(&self.config.source_root, topic_dirs)?;
        let stamp = self
            .stamp
            .clone()
            .unwrap_or_else(|| BuildStamp::capture(resolver.root(), self.config.use_vcs));
        Ok(BuildContext {
            resolver,
            stamp,
            attribution: manifest.attribution().to_string(),
            default_severity: self.config.default_severity.clone(),
        })
    }

    /// Compile the selected agents (all when `only` is empty).
    ///
    /// Returns `Err` only for run-level problems: unknown agent names or a
    /// missing source root. Per-agent problems are in the report.
    pub fn run(&self, manifest: &Manifest, only: &[String]) -> Result<CompileReport> {
        let agents = select_agents(manifest, only)?;
        let ctx = self.context(manifest)?;

        info!(
            agents = agents.len(),
            root = %ctx.resolver.root().display(),
            version = %ctx.stamp.version(),
            "compiling"
        );

        let built: Vec<Result<CompiledPackage>> = if self.config.parallel {
            agents.par_iter().map(|a| build_package(a, &ctx)).collect()
        } else {
            agents.iter().map(|a| build_package(a, &ctx)).collect()
        };

        let any_failed = built.iter().any(|b| b.is_err());
        let withhold = any_failed && self.config.policy == FailurePolicy::AllOrNothing;
        if withhold {
            warn!("at least one agent failed; all-or-nothing policy withholds every package");
        }

        let mut report = CompileReport::default();
        for (agent, result) in agents.iter().zip(built) {
            let status = match result {
                Err(e) => failed(agent, &e),
                Ok(pkg) if self.config.validate_only => AgentStatus::Validated {
                    rules: pkg.rules.len(),
                },
                Ok(pkg) if withhold => AgentStatus::Withheld {
                    rules: pkg.rules.len(),
                },
                Ok(pkg) => match self.write_package(agent, &pkg) {
                    Ok(path) => AgentStatus::Written {
                        path,
                        rules: pkg.rules.len(),
                    },
                    Err(e) => failed(agent, &e),
                },
            };
            report.outcomes.push(AgentOutcome {
                agent: agent.name.clone(),
                status,
            });
        }
        Ok(report)
    }

    /// Serialize `package` to `output_dir/<output_file>`.
    ///
    /// The output file name gets the same checks as a topic selector and the
    /// final location must stay inside the output root. The file is written
    /// to a temporary name first and renamed into place.
    pub fn write_package(&self, agent: &AgentDefinition, package: &CompiledPackage) -> Result<PathBuf> {
        let file_name = agent.output_file();
        validate_selector(&file_name)?;

        let out_root = &self.config.output_dir;
        fs::create_dir_all(out_root).map_err(|e| CompileError::io(out_root, e))?;
        let out_root = out_root
            .canonicalize()
            .map_err(|e| CompileError::io(out_root, e))?;

        let final_path = out_root.join(&file_name);
        let parent = final_path.parent().ok_or_else(|| CompileError::Output {
            path: final_path.clone(),
            reason: "no parent directory".to_string(),
        })?;
        fs::create_dir_all(parent).map_err(|e| CompileError::io(parent, e))?;
        let parent = parent.canonicalize().map_err(|e| CompileError::io(parent, e))?;
        ensure_within(&out_root, &parent, &file_name)?;

        let name = final_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| CompileError::Output {
                path: final_path.clone(),
                reason: "output file name is not valid UTF-8".to_string(),
            })?;
        let final_path = parent.join(name);
        if final_path.is_dir() {
            return Err(CompileError::Output {
                path: final_path,
                reason: "is a directory".to_string(),
            });
        }
        let tmp_path = parent.join(format!(".{name}.tmp"));

        let json = package.to_json_pretty()?;
        fs::write(&tmp_path, json).map_err(|e| CompileError::io(&tmp_path, e))?;
        fs::rename(&tmp_path, &final_path).map_err(|e| CompileError::io(&final_path, e))?;

        info!(agent = %agent.name, path = %final_path.display(), "wrote package");
        Ok(final_path)
    }
}

fn failed(agent: &AgentDefinition, err: &CompileError) -> AgentStatus {
    error!(agent = %agent.name, kind = %err.kind(), error = %err, "agent failed");
    AgentStatus::Failed(AgentFailure::from_error(&agent.name, err))
}

fn select_agents<'a>(manifest: &'a Manifest, only: &[String]) -> Result<Vec<&'a AgentDefinition>> {
    if only.is_empty() {
        return Ok(manifest.agents.iter().collect());
    }
    for name in only {
        if manifest.agent(name).is_none() {
            return Err(CompileError::Manifest(format!("unknown agent '{name}'")));
        }
    }
    Ok(manifest
        .agents
        .iter()
        .filter(|a| only.contains(&a.name))
        .collect())
}

#[cfg(test)]
mod tests {
    use rulecard_core::Policy;
    use tempfile::TempDir;

    use super::*;

    fn agent(output_file: &str) -> AgentDefinition {
        AgentDefinition {
            name: "t".into(),
            description: String::new(),
            topics: vec!["docker".into()],
            scope_selectors: vec!["*".into()],
            targets: serde_json::json!([]),
            defaults: serde_json::json!({}),
            output_file: Some(output_file.into()),
        }
    }

    fn package() -> CompiledPackage {
        CompiledPackage {
            name: "t".into(),
            description: String::new(),
            version: "2026.01.01".into(),
            build_date: "2026-01-01T00:00:00Z".into(),
            source_digest: "sha256:00".into(),
            attribution: "x".into(),
            policy: Policy {
                targets: serde_json::json!([]),
                defaults: serde_json::json!({}),
            },
            rules: vec![],
            rules_detail: vec![],
            validation_hooks: Default::default(),
        }
    }

    fn compiler(out: &Path) -> Compiler {
        Compiler::new(CompilerConfig::new("unused", out))
    }

    #[test]
    fn writes_into_output_root() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("dist");
        let path = compiler(&out).write_package(&agent("t.json"), &package()).unwrap();
        assert!(path.ends_with("t.json"));
        assert!(path.exists());
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.ends_with('\n'));
        let back: CompiledPackage = serde_json::from_str(&text).unwrap();
        assert_eq!(back, package());
        assert!(!out.join(".t.json.tmp").exists());
    }

    #[test]
    fn nested_output_file_is_allowed() {
        let dir = TempDir::new().unwrap();
        let path = compiler(dir.path())
            .write_package(&agent("team/t.json"), &package())
            .unwrap();
        assert!(path.ends_with("team/t.json"));
    }

    #[test]
    fn rejects_escaping_output_file() {
        let dir = TempDir::new().unwrap();
        for bad in ["../t.json", "/tmp/t.json", "t.json; rm -rf /"] {
            let err = compiler(dir.path())
                .write_package(&agent(bad), &package())
                .unwrap_err();
            assert!(matches!(err, CompileError::Security(_)), "{bad}: {err}");
        }
    }

    #[test]
    fn select_agents_rejects_unknown_names() {
        let manifest = Manifest {
            agents: vec![agent("t.json")],
            attribution: None,
            topic_dirs: Default::default(),
        };
        assert_eq!(select_agents(&manifest, &[]).unwrap().len(), 1);
        assert_eq!(select_agents(&manifest, &["t".to_string()]).unwrap().len(), 1);
        assert!(select_agents(&manifest, &["nope".to_string()]).is_err());
    }
}
