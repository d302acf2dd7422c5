use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

/// Compile security rule cards into per-agent JSON packages.
#[derive(Parser, Debug)]
#[command(name = "rulecard", version, about)]
pub struct CliArgs {
    /// Path to a TOML config file (default: ./rulecard.toml if present)
    #[arg(long, global = true, env = "RULECARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Raise log verbosity (-v info, -vv debug); RUST_LOG wins when set
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build one package per agent in the manifest
    Compile(CompileArgs),
    /// Validate individual rule card files
    Check(CheckArgs),
}

#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Agent manifest (YAML)
    #[arg(long, env = "RULECARD_MANIFEST")]
    pub manifest: PathBuf,

    /// Root of the rule card tree (overrides config)
    #[arg(long, env = "RULECARD_SOURCE_ROOT")]
    pub source_root: Option<PathBuf>,

    /// Directory packages are written to (overrides config)
    #[arg(long, env = "RULECARD_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Build and check every package without writing anything
    #[arg(long)]
    pub validate_only: bool,

    /// Only compile the named agent (repeatable)
    #[arg(long = "agent", value_name = "NAME")]
    pub agents: Vec<String>,

    /// Write nothing unless every agent builds
    #[arg(long)]
    pub all_or_nothing: bool,

    /// Compile agents in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Do not derive the version from the git revision
    #[arg(long)]
    pub no_vcs: bool,

    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub report: ReportFormat,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Rule card files to validate
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub report: ReportFormat,
}

/// Format of the per-failure diagnostic lines on stderr.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportFormat {
    /// `agent=<name> kind=<kind> file=<path> message="<text>"`
    Text,
    /// One JSON object per line
    Json,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn parses_compile_flags() {
        let args = CliArgs::try_parse_from([
            "rulecard",
            "compile",
            "--manifest",
            "agents.yml",
            "--source-root",
            "rule_cards",
            "--agent",
            "web",
            "--agent",
            "infra",
            "--validate-only",
            "--report",
            "json",
        ])
        .unwrap();
        match args.command {
            Command::Compile(c) => {
                assert_eq!(c.manifest, PathBuf::from("agents.yml"));
                assert_eq!(c.source_root, Some(PathBuf::from("rule_cards")));
                assert_eq!(c.agents, vec!["web", "infra"]);
                assert!(c.validate_only);
                assert!(!c.all_or_nothing);
                assert_eq!(c.report, ReportFormat::Json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn check_requires_files() {
        assert!(CliArgs::try_parse_from(["rulecard", "check"]).is_err());
    }
}
