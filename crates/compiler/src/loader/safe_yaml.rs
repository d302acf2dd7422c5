use std::path::Path;

use serde_yaml::{Mapping, Value};
use tracing::warn;

use rulecard_core::{CompileError, Result};

/// Parse YAML into the plain value model and strip every tag.
///
/// Parser errors are wrapped with the offending path.
pub fn parse_safe(path: &Path, bytes: &[u8]) -> Result<Value> {
    let raw: Value = serde_yaml::from_slice(bytes).map_err(|source| CompileError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let mut stripped = 0usize;
    let value = strip_tags(raw, &mut stripped);
    if stripped > 0 {
        warn!(path = %path.display(), tags = stripped, "ignored YAML tags");
    }
    Ok(value)
}

/// Replace each tagged node with its untagged content, recursively.
///
/// `count` is incremented once per tag removed.
pub fn strip_tags(value: Value, count: &mut usize) -> Value {
    match value {
        Value::Tagged(tagged) => {
            *count += 1;
            strip_tags(tagged.value, count)
        }
        Value::Sequence(items) => {
            Value::Sequence(items.into_iter().map(|v| strip_tags(v, count)).collect())
        }
        Value::Mapping(map) => {
            let mut out = Mapping::with_capacity(map.len());
            for (k, v) in map {
                out.insert(strip_tags(k, count), strip_tags(v, count));
            }
            Value::Mapping(out)
        }
        other => other,
    }
}
