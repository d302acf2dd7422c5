//! Rule card types: the authored YAML shape and the reduced runtime shape.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// Severity used when a card does not declare one.
pub const DEFAULT_SEVERITY: &str = "medium";

/// Severities the runtime knows how to rank.
pub const KNOWN_SEVERITIES: &[&str] = &["low", "medium", "high", "critical"];

/// Top-level keys every rule card must carry.
pub const REQUIRED_KEYS: &[&str] = &[
    "id",
    "title",
    "scope",
    "requirement",
    "do",
    "dont",
    "detect",
    "verify",
    "refs",
    "license",
];

/// One authored rule card, as read from `<topic>/<ID>.yml`.
///
/// Unknown top-level keys land in `extra` untouched. The compiler never reads
/// them and [`RuleCard::reduce`] drops them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleCard {
    pub id: String,
    pub title: String,
    pub scope: String,
    pub requirement: String,
    #[serde(rename = "do")]
    pub do_: Vec<String>,
    pub dont: Vec<String>,
    #[serde(deserialize_with = "string_list_map")]
    pub detect: IndexMap<String, Vec<String>>,
    pub verify: Verify,
    #[serde(deserialize_with = "string_list_map")]
    pub refs: IndexMap<String, Vec<String>>,
    pub license: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml::Value>,
}

/// The `verify` block: a `tests` list plus any tool-specific keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Verify {
    pub tests: Vec<String>,
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

/// The subset of a rule card shipped to the runtime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReducedRule {
    pub id: String,
    pub title: String,
    pub severity: String,
    pub scope: String,
    pub requirement: String,
    #[serde(rename = "do")]
    pub do_: Vec<String>,
    pub dont: Vec<String>,
    pub detect: IndexMap<String, Vec<String>>,
    pub verify: Verify,
    pub refs: IndexMap<String, Vec<String>>,
}

impl RuleCard {
    /// Strip authoring metadata, filling in `default_severity` when absent.
    pub fn reduce(&self, default_severity: &str) -> ReducedRule {
        ReducedRule {
            id: self.id.clone(),
            title: self.title.clone(),
            severity: self
                .severity
                .clone()
                .unwrap_or_else(|| default_severity.to_string()),
            scope: self.scope.clone(),
            requirement: self.requirement.clone(),
            do_: self.do_.clone(),
            dont: self.dont.clone(),
            detect: self.detect.clone(),
            verify: self.verify.clone(),
            refs: self.refs.clone(),
        }
    }
}

/// Scalar accepted inside string lists (`cwe: [79]` is as good as `["79"]`).
#[derive(Deserialize)]
#[serde(untagged)]
enum ScalarItem {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl ScalarItem {
    fn into_string(self) -> String {
        match self {
            ScalarItem::Text(s) => s,
            ScalarItem::Int(i) => i.to_string(),
            ScalarItem::Float(f) => f.to_string(),
            ScalarItem::Bool(b) => b.to_string(),
        }
    }
}

fn string_list_map<'de, D>(deserializer: D) -> Result<IndexMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = IndexMap::<String, Vec<ScalarItem>>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(k, items)| (k, items.into_iter().map(ScalarItem::into_string).collect()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARD_YAML: &str = r#"
id: JWT-001
title: Validate JWT signatures
scope: web-application-auth
requirement: Reject tokens whose signature does not verify.
do:
  - Verify the signature with a pinned algorithm
dont:
  - Accept alg=none
detect:
  semgrep: [jwt-none-alg, jwt-unverified]
  codeql: [js/jwt-missing-verification]
verify:
  tests: [rejects unsigned token]
  fixtures: tests/jwt
refs:
  cwe: [347]
  asvs: ["V3.5.3"]
license: CC-BY-SA-4.0
source_file: ingest/owasp/jwt.md
"#;

    #[test]
    fn deserializes_with_extras_and_numeric_refs() {
        let card: RuleCard = serde_yaml::from_str(CARD_YAML).unwrap();
        assert_eq!(card.id, "JWT-001");
        assert_eq!(card.do_.len(), 1);
        assert_eq!(card.refs["cwe"], vec!["347"]);
        assert_eq!(
            card.detect.keys().collect::<Vec<_>>(),
            vec!["semgrep", "codeql"]
        );
        assert_eq!(card.verify.tests, vec!["rejects unsigned token"]);
        assert_eq!(card.verify.extra["fixtures"], serde_json::json!("tests/jwt"));
        assert!(card.extra.contains_key("source_file"));
        assert!(card.severity.is_none());
    }

    #[test]
    fn reduce_defaults_severity_and_drops_extras() {
        let card: RuleCard = serde_yaml::from_str(CARD_YAML).unwrap();
        let reduced = card.reduce(DEFAULT_SEVERITY);
        assert_eq!(reduced.severity, "medium");

        let json = serde_json::to_value(&reduced).unwrap();
        assert!(json.get("source_file").is_none());
        assert!(json.get("license").is_none());
        assert_eq!(json["do"][0], "Verify the signature with a pinned algorithm");
    }

    #[test]
    fn reduce_keeps_declared_severity() {
        let yaml = format!("{CARD_YAML}severity: critical\n");
        let card: RuleCard = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(card.reduce(DEFAULT_SEVERITY).severity, "critical");
    }

    #[test]
    fn reduced_rule_key_order() {
        let card: RuleCard = serde_yaml::from_str(CARD_YAML).unwrap();
        let json = serde_json::to_string(&card.reduce(DEFAULT_SEVERITY)).unwrap();
        let order = [
            "\"id\"", "\"title\"", "\"severity\"", "\"scope\"", "\"requirement\"", "\"do\"",
            "\"dont\"", "\"detect\"", "\"verify\"", "\"refs\"",
        ];
        let positions: Vec<usize> = order.iter().map(|k| json.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }
}
