//! Known-registry of previously issued nonces, hashes and coupons.
//!
//! Loaded from a JSON side file. An object contributes its keys; an array
//! contributes its string elements. Membership is the only query.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct KnownRegistry {
    entries: HashSet<String>,
}

impl KnownRegistry {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read registry {}", path.display()))?;
        let registry = Self::from_json_str(&content)
            .with_context(|| format!("Failed to parse registry {}", path.display()))?;
        tracing::debug!(path = %path.display(), entries = registry.len(), "Loaded known registry");
        Ok(registry)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let entries: HashSet<String> = match value {
            Value::Object(map) => map.into_iter().map(|(k, _)| k).collect(),
            Value::Array(items) => items
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
            other => {
                return Err(anyhow!(
                    "Registry must be a JSON object or array, got {}",
                    json_kind(&other)
                ))
            }
        };
        Ok(Self { entries })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for KnownRegistry {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(Into::into).collect(),
        }
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
