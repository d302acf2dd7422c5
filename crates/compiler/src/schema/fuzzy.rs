//! Levenshtein-based suggestions for misspelled rule card keys.

/// Pick the unknown key in `candidates` that most plausibly is a typo of the
/// required key `wanted`.
///
/// Comparison is case-insensitive. A candidate qualifies only when its edit
/// distance is at most half the length of the longer of the two names; on a
/// tie the earliest candidate wins.
pub(crate) fn closest_key<'a>(wanted: &str, candidates: &[&'a str]) -> Option<&'a str> {
    let wanted_lower = wanted.to_lowercase();
    candidates
        .iter()
        .map(|&c| (c, levenshtein(&wanted_lower, &c.to_lowercase())))
        .min_by_key(|&(_, dist)| dist)
        .filter(|&(c, dist)| dist <= wanted.len().max(c.len()) / 2)
        .map(|(c, _)| c)
}

/// Levenshtein edit distance between two strings.
pub(crate) fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let n = b.len();

    let mut prev = (0..=n).collect::<Vec<_>>();
    let mut curr = vec![0; n + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}
