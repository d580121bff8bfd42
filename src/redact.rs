//! Masking of sensitive values before settings are displayed.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

/// Keys containing any of these (case-insensitive) have their value masked.
const SENSITIVE_KEYWORDS: &[&str] = &[
    "password",
    "passphrase",
    "secret",
    "token",
    "apikey",
    "access_key",
    "secret_key",
    "private_key",
    "credential",
];

pub const MASK: &str = "****";

/// A settings document as a tree of named nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SettingsTree {
    Scalar(Value),
    Map(BTreeMap<String, SettingsTree>),
}

impl SettingsTree {
    pub fn map() -> Self {
        Self::Map(BTreeMap::new())
    }

    /// Adds `child` under `key`. Does nothing on a scalar.
    pub fn insert(&mut self, key: impl Into<String>, child: SettingsTree) {
        if let Self::Map(entries) = self {
            entries.insert(key.into(), child);
        }
    }

    /// Returns a copy where every value under a sensitive key is [`MASK`].
    /// A sensitive key hides its whole subtree.
    pub fn redacted(&self) -> Self {
        match self {
            Self::Scalar(value) => Self::Scalar(value.clone()),
            Self::Map(entries) => Self::Map(
                entries
                    .iter()
                    .map(|(key, child)| {
                        let child = if is_sensitive(key) {
                            Self::Scalar(Value::String(MASK.to_string()))
                        } else {
                            child.redacted()
                        };
                        (key.clone(), child)
                    })
                    .collect(),
            ),
        }
    }
}

impl From<Value> for SettingsTree {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self::Map(
                fields
                    .into_iter()
                    .map(|(key, child)| (key, Self::from(child)))
                    .collect(),
            ),
            other => Self::Scalar(other),
        }
    }
}

pub fn is_sensitive(key: &str) -> bool {
    let key = key.to_lowercase();
    SENSITIVE_KEYWORDS.iter().any(|keyword| key.contains(keyword))
}
