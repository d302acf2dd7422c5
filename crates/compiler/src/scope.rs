//! Scope selection: does a rule apply to an agent?

/// Selector that matches every scope.
pub const WILDCARD: &str = "*";

/// True when any selector is `*` or a prefix of `scope`.
///
/// Matching is exact and case-sensitive; nothing is trimmed or lowered.
pub fn scope_matches<S: AsRef<str>>(scope: &str, selectors: &[S]) -> bool {
    selectors.iter().any(|s| {
        let s = s.as_ref();
        s == WILDCARD || scope.starts_with(s)
    })
}
