//! Source digest and build stamp generation.
//!
//! The digest covers the exact file set contributing to a package: for each
//! file in sorted order, its root-relative path, a NUL, its byte length and
//! its bytes are streamed through SHA-256. Changing a byte, adding, removing or
//! renaming a file changes the digest; the order files were discovered in does
//! not.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, SubsecRound, Utc};
use sha2::{Digest, Sha256};
use tracing::debug;

use rulecard_core::{CompileError, Result};

pub const DIGEST_PREFIX: &str = "sha256:";

/// Compute `sha256:<hex>` over `files`, which must live under `root`.
pub fn source_digest(root: &Path, files: &[PathBuf]) -> Result<String> {
    let mut sorted: Vec<&PathBuf> = files.iter().collect();
    sorted.sort();
    sorted.dedup();

    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    for path in sorted {
        let rel = path.strip_prefix(root).unwrap_or(path);
        let rel = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let mut file = File::open(path).map_err(|e| CompileError::io(path, e))?;
        let len = file
            .metadata()
            .map_err(|e| CompileError::io(path, e))?
            .len();

        hasher.update(rel.as_bytes());
        hasher.update([0u8]);
        hasher.update(len.to_le_bytes());
        loop {
            let n = file.read(&mut buf).map_err(|e| CompileError::io(path, e))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
    }
    Ok(format!("{DIGEST_PREFIX}{:x}", hasher.finalize()))
}

/// When a build happened and, if known, at which VCS revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStamp {
    pub build_date: DateTime<Utc>,
    pub revision: Option<String>,
}

impl BuildStamp {
    /// Stamp for the current moment, truncated to whole seconds.
    ///
    /// With `use_vcs`, asks git for the short revision of `root`; any failure
    /// falls back to the date-only scheme.
    pub fn capture(root: &Path, use_vcs: bool) -> Self {
        let revision = if use_vcs { git_short_revision(root) } else { None };
        Self {
            build_date: Utc::now().trunc_subsecs(0),
            revision,
        }
    }

    /// Frozen stamp, for reproducible builds and tests.
    pub fn fixed(build_date: DateTime<Utc>, revision: Option<String>) -> Self {
        Self {
            build_date: build_date.trunc_subsecs(0),
            revision,
        }
    }

    /// ISO-8601, second precision, trailing `Z`.
    pub fn build_date_string(&self) -> String {
        self.build_date.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }

    /// `YYYY.MM.DD`, or `YYYY.MM.DD.HHMMSS+g<rev>` inside a checkout.
    pub fn version(&self) -> String {
        match self.revision {
            Some(ref rev) => format!("{}+g{}", self.build_date.format("%Y.%m.%d.%H%M%S"), rev),
            None => self.build_date.format("%Y.%m.%d").to_string(),
        }
    }
}

fn git_short_revision(root: &Path) -> Option<String> {
    let output = match Command::new("git")
        .arg("-C")
        .arg(root)
        .args(["rev-parse", "--short", "HEAD"])
        .output()
    {
        Ok(o) => o,
        Err(e) => {
            debug!(error = %e, "git unavailable, using date-only version");
            return None;
        }
    };
    if !output.status.success() {
        debug!(path = %root.display(), "not a git checkout, using date-only version");
        return None;
    }
    let rev = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if rev.is_empty() || !rev.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(rev)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::TimeZone;
    use tempfile::TempDir;

    use super::*;

    fn setup() -> (TempDir, Vec<PathBuf>) {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.yml");
        let b = dir.path().join("b.yml");
        fs::write(&a, "id: A\n").unwrap();
        fs::write(&b, "id: B\n").unwrap();
        (dir, vec![a, b])
    }

    #[test]
    fn digest_format() {
        let (dir, files) = setup();
        let d = source_digest(dir.path(), &files).unwrap();
        assert!(d.starts_with("sha256:"));
        assert_eq!(d.len(), DIGEST_PREFIX.len() + 64);
    }

    #[test]
    fn digest_is_order_independent() {
        let (dir, files) = setup();
        let reversed: Vec<PathBuf> = files.iter().rev().cloned().collect();
        assert_eq!(
            source_digest(dir.path(), &files).unwrap(),
            source_digest(dir.path(), &reversed).unwrap()
        );
    }

    #[test]
    fn digest_changes_on_single_byte() {
        let (dir, files) = setup();
        let before = source_digest(dir.path(), &files).unwrap();
        fs::write(&files[1], "id: C\n").unwrap();
        assert_ne!(before, source_digest(dir.path(), &files).unwrap());
    }

    #[test]
    fn digest_changes_on_membership() {
        let (dir, files) = setup();
        let both = source_digest(dir.path(), &files).unwrap();
        let one = source_digest(dir.path(), &files[..1]).unwrap();
        assert_ne!(both, one);

        // An empty extra file still counts.
        let empty = dir.path().join("c.yml");
        fs::write(&empty, "").unwrap();
        let mut three = files.clone();
        three.push(empty);
        assert_ne!(both, source_digest(dir.path(), &three).unwrap());
    }

    #[test]
    fn digest_is_not_filenames_alone() {
        let (dir, files) = setup();
        let before = source_digest(dir.path(), &files).unwrap();
        fs::write(&files[0], "id: A\nextra: 1\n").unwrap();
        assert_ne!(before, source_digest(dir.path(), &files).unwrap());
    }

    #[test]
    fn digest_independent_of_root_location() {
        let (dir1, files1) = setup();
        let (dir2, files2) = setup();
        assert_eq!(
            source_digest(dir1.path(), &files1).unwrap(),
            source_digest(dir2.path(), &files2).unwrap()
        );
    }

    #[test]
    fn digest_of_missing_file_errors() {
        let dir = TempDir::new().unwrap();
        let err = source_digest(dir.path(), &[dir.path().join("gone.yml")]).unwrap_err();
        assert!(matches!(err, CompileError::Io { .. }));
    }

    #[test]
    fn stamp_formats() {
        let at = Utc.with_ymd_and_hms(2026, 3, 7, 9, 5, 1).unwrap();
        let plain = BuildStamp::fixed(at, None);
        assert_eq!(plain.build_date_string(), "2026-03-07T09:05:01Z");
        assert_eq!(plain.version(), "2026.03.07");

        let vcs = BuildStamp::fixed(at, Some("a1b2c3d".into()));
        assert_eq!(vcs.version(), "2026.03.07.090501+ga1b2c3d");
    }

    #[test]
    fn capture_outside_checkout_falls_back() {
        let dir = TempDir::new().unwrap();
        let stamp = BuildStamp::capture(dir.path(), true);
        // Either git is missing or the temp dir is not a checkout.
        assert!(stamp.revision.is_none());
        assert_eq!(stamp.build_date.timestamp_subsec_nanos(), 0);
    }
}
