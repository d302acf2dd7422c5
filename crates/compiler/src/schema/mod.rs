//! Rule card schema validation with structured errors and suggestions.
//!
//! Runs on the raw (tag-stripped) YAML value before typed deserialization so
//! every problem in a card is reported at once, not just the first serde hit.
//! Errors block the card; warnings are advisory and only logged.

mod fuzzy;


use std::path::Path;

use serde::Serialize;
use serde_yaml::{Mapping, Value};

use rulecard_core::{SchemaError, KNOWN_SEVERITIES, REQUIRED_KEYS};

/// Keys the compiler understands beyond the required set.
const OPTIONAL_KEYS: &[&str] = &["severity"];

const STRING_KEYS: &[&str] = &["id", "title", "scope", "requirement", "license"];

// ── Result types ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationResult {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

/// One finding, located by a dotted field path such as `detect.semgrep[1]`.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)?;
        } else {
            write!(f, "{}: {}", self.path, self.message)?;
        }
        if let Some(ref s) = self.suggestion {
            write!(f, " ({s})")?;
        }
        Ok(())
    }
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationIssue {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        });
    }

    fn error_with_suggestion(
        &mut self,
        path: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) {
        self.errors.push(ValidationIssue {
            path: path.into(),
            message: message.into(),
            suggestion: Some(suggestion.into()),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationIssue {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        });
    }

    /// Collapse into the loader's contract: warnings on success, one
    /// [`SchemaError`] listing every error otherwise.
    pub fn into_result(self, path: &Path) -> Result<Vec<ValidationIssue>, SchemaError> {
        if self.errors.is_empty() {
            Ok(self.warnings)
        } else {
            Err(SchemaError {
                path: path.to_path_buf(),
                problems: self.errors.iter().map(ToString::to_string).collect(),
            })
        }
    }
}

// ── Public API ──────────────────────────────────────────────────────

/// Check a parsed rule card against the required-field contract.
///
/// `path` is only used for the file-stem/id advisory; nothing is read.
pub fn validate_card(doc: &Value, path: &Path) -> ValidationResult {
    let mut result = ValidationResult::default();

    let Some(map) = doc.as_mapping() else {
        result.error("", format!("rule card must be a mapping, got {}", type_name(doc)));
        return result;
    };

    check_required_keys(map, &mut result);

    for key in STRING_KEYS {
        if let Some(v) = map.get(*key) {
            check_non_empty_string(v, key, &mut result);
        }
    }
    for key in ["do", "dont"] {
        if let Some(v) = map.get(key) {
            check_string_sequence(v, key, &mut result);
        }
    }
    if let Some(v) = map.get("detect") {
        check_list_mapping(v, "detect", &mut result);
        if v.as_mapping().is_some_and(Mapping::is_empty) {
            result.warn("detect", "no detection hooks declared");
        }
    }
    if let Some(v) = map.get("refs") {
        check_list_mapping(v, "refs", &mut result);
    }
    if let Some(v) = map.get("verify") {
        check_verify(v, &mut result);
    }
    if let Some(v) = map.get("severity") {
        match v.as_str() {
            Some(s) if !KNOWN_SEVERITIES.contains(&s) => result.warn(
                "severity",
                format!("unknown severity '{s}', expected one of {}", KNOWN_SEVERITIES.join(", ")),
            ),
            Some(_) => {}
            None => result.error("severity", format!("must be a string, got {}", type_name(v))),
        }
    }

    if let (Some(id), Some(stem)) = (
        map.get("id").and_then(Value::as_str),
        path.file_stem().and_then(|s| s.to_str()),
    ) {
        if id != stem {
            result.warn("id", format!("id '{id}' does not match file name '{stem}'"));
        }
    }

    result
}

/// Validate and collapse in one step.
pub fn check_card(doc: &Value, path: &Path) -> Result<Vec<ValidationIssue>, SchemaError> {
    validate_card(doc, path).into_result(path)
}

// ── Checks ──────────────────────────────────────────────────────────

fn check_required_keys(map: &Mapping, result: &mut ValidationResult) {
    let unknown: Vec<&str> = map
        .keys()
        .filter_map(Value::as_str)
        .filter(|k| !REQUIRED_KEYS.contains(k) && !OPTIONAL_KEYS.contains(k))
        .collect();

    for key in REQUIRED_KEYS {
        if map.contains_key(*key) {
            continue;
        }
        match fuzzy::closest_key(key, &unknown) {
            Some(found) => result.error_with_suggestion(
                *key,
                "missing required field",
                format!("found '{found}', did you mean '{key}'?"),
            ),
            None => result.error(*key, "missing required field"),
        }
    }
}

fn check_non_empty_string(v: &Value, path: &str, result: &mut ValidationResult) {
    match v.as_str() {
        Some(s) if s.trim().is_empty() => result.error(path, "must not be empty"),
        Some(_) => {}
        None => result.error(path, format!("must be a string, got {}", type_name(v))),
    }
}

fn check_string_sequence(v: &Value, path: &str, result: &mut ValidationResult) {
    let Some(items) = v.as_sequence() else {
        result.error(path, format!("must be a sequence, got {}", type_name(v)));
        return;
    };
    for (i, item) in items.iter().enumerate() {
        if !item.is_string() {
            result.error(
                format!("{path}[{i}]"),
                format!("must be a string, got {}", type_name(item)),
            );
        }
    }
}

/// `detect` and `refs`: mapping of name -> sequence of scalars.
fn check_list_mapping(v: &Value, path: &str, result: &mut ValidationResult) {
    let Some(map) = v.as_mapping() else {
        result.error(path, format!("must be a mapping, got {}", type_name(v)));
        return;
    };
    for (key, value) in map {
        let Some(name) = key.as_str() else {
            result.error(path, format!("keys must be strings, got {}", type_name(key)));
            continue;
        };
        let field = format!("{path}.{name}");
        let Some(items) = value.as_sequence() else {
            result.error(field, format!("must be a sequence, got {}", type_name(value)));
            continue;
        };
        for (i, item) in items.iter().enumerate() {
            if !is_scalar(item) {
                result.error(
                    format!("{field}[{i}]"),
                    format!("must be a scalar, got {}", type_name(item)),
                );
            }
        }
    }
}

fn check_verify(v: &Value, result: &mut ValidationResult) {
    let Some(map) = v.as_mapping() else {
        result.error("verify", format!("must be a mapping, got {}", type_name(v)));
        return;
    };
    match map.get("tests") {
        Some(tests) => check_string_sequence(tests, "verify.tests", result),
        None => result.error("verify.tests", "missing required field"),
    }
}

fn is_scalar(v: &Value) -> bool {
    matches!(v, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}
