//! Machine-parseable diagnostics written to stderr.

use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

use rulecard_compiler::driver::{AgentFailure, AgentStatus, CompileReport};
use rulecard_compiler::loader::{LoadResult, LoadStatus};
use rulecard_core::ErrorKind;

use crate::cli::ReportFormat;

/// One diagnostic line: who failed, how, where.
#[derive(Debug, Serialize)]
pub struct Diagnostic<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<&'a str>,
    pub kind: ErrorKind,
    pub file: Option<&'a Path>,
    pub message: &'a str,
}

impl<'a> From<&'a AgentFailure> for Diagnostic<'a> {
    fn from(f: &'a AgentFailure) -> Self {
        Self {
            agent: Some(f.agent.as_str()),
            kind: f.kind,
            file: f.file.as_deref(),
            message: &f.message,
        }
    }
}

impl Diagnostic<'_> {
    pub fn render(&self, format: ReportFormat) -> String {
        match format {
            ReportFormat::Json => {
                serde_json::to_string(self).unwrap_or_else(|_| self.render(ReportFormat::Text))
            }
            ReportFormat::Text => {
                let file = self
                    .file
                    .map(|p| format!("{:?}", p.display().to_string()))
                    .unwrap_or_else(|| "-".to_string());
                let mut line = String::new();
                if let Some(agent) = self.agent {
                    line.push_str(&format!("agent={agent} "));
                }
                line.push_str(&format!("kind={} file={} message={:?}", self.kind, file, self.message));
                line
            }
        }
    }
}

/// Print failures to stderr and written paths to stdout, then a summary.
pub fn print_compile_report(report: &CompileReport, format: ReportFormat) -> io::Result<()> {
    let stderr = io::stderr();
    let mut err = stderr.lock();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for outcome in &report.outcomes {
        match &outcome.status {
            AgentStatus::Failed(f) => writeln!(err, "{}", Diagnostic::from(f).render(format))?,
            AgentStatus::Written { path, .. } => writeln!(out, "{}", path.display())?,
            _ => {}
        }
    }

    let failed = report.failures().count();
    let total = report.outcomes.len();
    writeln!(
        err,
        "{} of {} agent(s) built, {} failed",
        total - failed,
        total,
        failed
    )
}

/// Print per-file failures of a `check` run; returns the failure count.
pub fn print_check_results(results: &[LoadResult], format: ReportFormat) -> io::Result<usize> {
    let stderr = io::stderr();
    let mut err = stderr.lock();
    let mut failed = 0;
    for r in results {
        if let LoadStatus::Failed { kind, error } = &r.status {
            failed += 1;
            let diag = Diagnostic {
                agent: None,
                kind: *kind,
                file: Some(r.path.as_path()),
                message: error,
            };
            writeln!(err, "{}", diag.render(format))?;
        }
    }
    writeln!(err, "{} of {} card(s) valid", results.len() - failed, results.len())?;
    Ok(failed)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn failure() -> AgentFailure {
        AgentFailure {
            agent: "web".into(),
            kind: ErrorKind::Schema,
            file: Some(PathBuf::from("rule_cards/jwt/JWT-001.yml")),
            message: "schema error: \"id\" missing".into(),
        }
    }

    #[test]
    fn text_line_is_key_value() {
        let f = failure();
        let line = Diagnostic::from(&f).render(ReportFormat::Text);
        assert_eq!(
            line,
            r#"agent=web kind=schema file="rule_cards/jwt/JWT-001.yml" message="schema error: \"id\" missing""#
        );
    }

    #[test]
    fn json_line_round_trips() {
        let f = failure();
        let line = Diagnostic::from(&f).render(ReportFormat::Json);
        let v: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(v["agent"], "web");
        assert_eq!(v["kind"], "schema");
        assert_eq!(v["file"], "rule_cards/jwt/JWT-001.yml");
    }

    #[test]
    fn file_with_spaces_stays_one_field() {
        let d = Diagnostic {
            agent: None,
            kind: ErrorKind::Schema,
            file: Some(Path::new("rule_cards/my cards/A 1.yml")),
            message: "bad",
        };
        assert_eq!(
            d.render(ReportFormat::Text),
            r#"kind=schema file="rule_cards/my cards/A 1.yml" message="bad""#
        );
    }

    #[test]
    fn missing_file_renders_dash() {
        let d = Diagnostic {
            agent: Some("infra"),
            kind: ErrorKind::Compiler,
            file: None,
            message: "boom",
        };
        assert_eq!(
            d.render(ReportFormat::Text),
            r#"agent=infra kind=compiler file=- message="boom""#
        );
    }
}
