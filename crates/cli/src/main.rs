mod cli;
mod report;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use rulecard_compiler::driver::Compiler;
use rulecard_compiler::loader::check_files;
use rulecard_core::{CompilerConfig, FailurePolicy};

use crate::cli::{CheckArgs, CliArgs, Command, CompileArgs};

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG_FILE: &str = "rulecard.toml";

/// Any agent or card failed.
const EXIT_FAILED: u8 = 1;
/// The run could not start (config, manifest, source root).
const EXIT_FATAL: u8 = 2;

fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_tracing(args.verbose);

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: CliArgs) -> Result<ExitCode> {
    let config = load_config(args.config.as_deref())?;
    match args.command {
        Command::Compile(c) => compile(config, c),
        Command::Check(c) => check(c),
    }
}

fn load_config(path: Option<&Path>) -> Result<CompilerConfig> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    debug!(path = %path.display(), "loading config");
    CompilerConfig::load(&path).with_context(|| format!("failed to load config: {}", path.display()))
}

/// Flags win over the config file.
fn apply_overrides(mut config: CompilerConfig, args: &CompileArgs) -> CompilerConfig {
    if let Some(ref root) = args.source_root {
        config.source_root = root.clone();
    }
    if let Some(ref out) = args.output_dir {
        config.output_dir = out.clone();
    }
    if args.all_or_nothing {
        config.policy = FailurePolicy::AllOrNothing;
    }
    if args.parallel {
        config.parallel = true;
    }
    if args.no_vcs {
        config.use_vcs = false;
    }
    if args.validate_only {
        config.validate_only = true;
    }
    config
}

fn compile(config: CompilerConfig, args: CompileArgs) -> Result<ExitCode> {
    let config = apply_overrides(config, &args);
    let compiler = Compiler::new(config);

    let manifest = compiler
        .load_manifest(&args.manifest)
        .with_context(|| format!("failed to load manifest: {}", args.manifest.display()))?;
    let report = compiler
        .run(&manifest, &args.agents)
        .context("compile run aborted")?;

    report::print_compile_report(&report, args.report).context("failed to write report")?;
    Ok(if report.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_FAILED)
    })
}

fn check(args: CheckArgs) -> Result<ExitCode> {
    let results = check_files(&args.files);
    let failed = report::print_check_results(&results, args.report).context("failed to write report")?;
    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_FAILED)
    })
}
