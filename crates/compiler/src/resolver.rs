//! Topic selector resolution inside the trusted rule-card root.
//!
//! Every file that reaches the loader comes through [`Resolver::resolve`].
//! Selectors are checked lexically before any filesystem access, then the
//! joined path and every discovered file are canonicalized and re-checked
//! against the canonical root so symlinks cannot lead out of the tree.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use rulecard_core::{CompileError, Result, SecurityError, SecurityViolation};

/// Substrings that have no business in a topic name.
const METACHARACTERS: &[&str] = &[";", "|", "`", "$(", "&&", "\n", "\r", "\0"];

/// Lexical safety check for a selector or relative output path.
///
/// Rejects empty input, absolute paths, `..` components and shell
/// metacharacters. Performs no I/O.
pub fn validate_selector(selector: &str) -> std::result::Result<(), SecurityError> {
    let violation = |reason| Err(SecurityError::new(selector, reason));

    if selector.trim().is_empty() {
        return violation(SecurityViolation::Empty);
    }
    if let Some(&m) = METACHARACTERS.iter().find(|m| selector.contains(**m)) {
        return violation(SecurityViolation::Metacharacter(m));
    }
    if selector.starts_with('/') || selector.starts_with('\\') || has_drive_prefix(selector) {
        return violation(SecurityViolation::Absolute);
    }
    if selector.split(['/', '\\']).any(|part| part == "..") {
        return violation(SecurityViolation::Traversal);
    }

    let path = Path::new(selector);
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => return violation(SecurityViolation::Traversal),
            Component::RootDir | Component::Prefix(_) => {
                return violation(SecurityViolation::Absolute)
            }
        }
    }
    Ok(())
}

fn has_drive_prefix(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Check that `candidate` (already canonical) stays under `root` (canonical).
pub fn ensure_within(
    root: &Path,
    candidate: &Path,
    selector: &str,
) -> std::result::Result<(), SecurityError> {
    if candidate.starts_with(root) {
        Ok(())
    } else {
        Err(SecurityError::new(selector, SecurityViolation::OutsideRoot))
    }
}

/// Expands topic selectors into sorted lists of `*.yml` files.
#[derive(Debug, Clone)]
pub struct Resolver {
    root: PathBuf,
    topic_dirs: BTreeMap<String, String>,
}

impl Resolver {
    /// Canonicalizes the root up front; a missing root is an I/O error.
    pub fn new(root: &Path, topic_dirs: BTreeMap<String, String>) -> Result<Self> {
        let root = root.canonicalize().map_err(|e| CompileError::io(root, e))?;
        Ok(Self { root, topic_dirs })
    }

    /// Canonical trusted root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Subdirectory a topic maps to, `topic` itself when unmapped.
    fn topic_subdir<'a>(&'a self, topic: &'a str) -> &'a str {
        self.topic_dirs.get(topic).map(String::as_str).unwrap_or(topic)
    }

    /// All `*.yml` files under `root/<topic dir>/`, recursively, sorted.
    pub fn resolve(&self, topic: &str) -> Result<Vec<PathBuf>> {
        validate_selector(topic)?;
        let subdir = self.topic_subdir(topic);
        if subdir != topic {
            validate_selector(subdir)?;
        }

        let joined = self.root.join(subdir);
        if !joined.exists() {
            return Err(CompileError::MissingTopic {
                topic: topic.to_string(),
                path: joined,
            });
        }
        let dir = joined.canonicalize().map_err(|e| CompileError::io(&joined, e))?;
        ensure_within(&self.root, &dir, topic)?;
        if !dir.is_dir() {
            return Err(CompileError::MissingTopic {
                topic: topic.to_string(),
                path: dir,
            });
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(&dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));
        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&dir).to_path_buf();
                CompileError::io(path, e.into())
            })?;
            let path = entry.path();
            if !is_rule_file(path) {
                continue;
            }
            if entry.path_is_symlink() {
                // Only follow symlinked files that land back inside the root.
                let target = path.canonicalize().map_err(|e| CompileError::io(path, e))?;
                ensure_within(&self.root, &target, topic)?;
                if !target.is_file() {
                    continue;
                }
            } else if !entry.file_type().is_file() {
                continue;
            }
            files.push(path.to_path_buf());
        }

        files.sort();
        if files.is_empty() {
            warn!(topic = %topic, path = %dir.display(), "topic contains no rule cards");
        }
        debug!(topic = %topic, count = files.len(), "resolved topic");
        Ok(files)
    }

    /// Union of several topics, sorted and de-duplicated.
    pub fn resolve_all<S: AsRef<str>>(&self, topics: &[S]) -> Result<Vec<PathBuf>> {
        // Check every selector before touching the filesystem for any of them.
        for topic in topics {
            validate_selector(topic.as_ref())?;
        }
        let mut all = BTreeSet::new();
        for topic in topics {
            all.extend(self.resolve(topic.as_ref())?);
        }
        Ok(all.into_iter().collect())
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().map(|n| n.starts_with('.')).unwrap_or(false)
}

fn is_rule_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("yml")
}
