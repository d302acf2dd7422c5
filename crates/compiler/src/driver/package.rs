//! Per-agent pipeline: resolve, load, filter, dedup, reduce, aggregate, digest.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use rulecard_core::{
    AgentDefinition, CompileError, CompiledPackage, Policy, ReducedRule, Result,
};

use crate::digest::{source_digest, BuildStamp};
use crate::hooks::aggregate_hooks;
use crate::loader::{load_card, LoadedCard};
use crate::resolver::Resolver;
use crate::scope::scope_matches;

/// Everything an agent build needs that is shared across the run.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub resolver: Resolver,
    pub stamp: BuildStamp,
    pub attribution: String,
    pub default_severity: String,
}

/// Build one agent's package in memory. Nothing is written.
pub fn build_package(agent: &AgentDefinition, ctx: &BuildContext) -> Result<CompiledPackage> {
    let files = ctx.resolver.resolve_all(&agent.topics)?;
    debug!(agent = %agent.name, files = files.len(), "resolved topics");

    let loaded = files
        .iter()
        .map(|path| load_card(path))
        .collect::<Result<Vec<LoadedCard>>>()?;
    let total = loaded.len();

    let kept: Vec<LoadedCard> = loaded
        .into_iter()
        .filter(|l| scope_matches(&l.card.scope, &agent.scope_selectors))
        .collect();

    check_duplicate_ids(&kept)?;

    let rules_detail: Vec<ReducedRule> = kept
        .iter()
        .map(|l| l.card.reduce(&ctx.default_severity))
        .collect();
    let validation_hooks = aggregate_hooks(&rules_detail);
    let source_digest = source_digest(ctx.resolver.root(), &files)?;

    info!(
        agent = %agent.name,
        loaded = total,
        kept = rules_detail.len(),
        tools = validation_hooks.len(),
        digest = %source_digest,
        "built package"
    );

    Ok(CompiledPackage {
        name: agent.name.clone(),
        description: agent.description.clone(),
        version: ctx.stamp.version(),
        build_date: ctx.stamp.build_date_string(),
        source_digest,
        attribution: ctx.attribution.clone(),
        policy: Policy {
            targets: agent.targets.clone(),
            defaults: agent.defaults.clone(),
        },
        rules: rules_detail.iter().map(|r| r.id.clone()).collect(),
        rules_detail,
        validation_hooks,
    })
}

/// Fails on the first id shared by two kept cards, naming both files.
fn check_duplicate_ids(cards: &[LoadedCard]) -> Result<()> {
    let mut seen: HashMap<&str, &Path> = HashMap::with_capacity(cards.len());
    for loaded in cards {
        if let Some(first) = seen.insert(loaded.card.id.as_str(), loaded.path.as_path()) {
            return Err(CompileError::DuplicateId {
                id: loaded.card.id.clone(),
                first: first.to_path_buf(),
                second: loaded.path.clone(),
            });
        }
    }
    Ok(())
}
